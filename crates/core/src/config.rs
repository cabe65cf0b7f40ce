//! Runtime configuration, enumerated in full: everything an operator can
//! tune is a field here, nothing is a hidden constant.

use crate::hooks::{default_hooks, EventHooks};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Seconds of heartbeat silence before a client is implicitly disconnected.
pub const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_secs(60);
/// Seconds a `/receive` blocks before returning an empty body.
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_secs(20);
/// Seconds between liveness sweeps of every active domain's subscribers.
pub const DEFAULT_CHECK_PERIOD: Duration = Duration::from_secs(60);
pub const DEFAULT_COMET_PREFIX: &str = "/comet";
pub const DEFAULT_STORE_PREFIX: &str = "/dictionary";

#[derive(Clone)]
pub struct Config {
    pub client_timeout: Duration,
    pub receive_timeout: Duration,
    pub check_period: Duration,
    pub db_path: PathBuf,
    pub comet_prefix: String,
    pub store_prefix: String,
    pub hooks: Arc<dyn EventHooks>,
}

impl Config {
    /// `db_path` is the one required setting; everything else takes the
    /// documented default.
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            client_timeout: DEFAULT_CLIENT_TIMEOUT,
            receive_timeout: DEFAULT_RECEIVE_TIMEOUT,
            check_period: DEFAULT_CHECK_PERIOD,
            db_path: db_path.into(),
            comet_prefix: DEFAULT_COMET_PREFIX.to_owned(),
            store_prefix: DEFAULT_STORE_PREFIX.to_owned(),
            hooks: default_hooks(),
        }
    }

    pub fn with_client_timeout(mut self, d: Duration) -> Self {
        self.client_timeout = d;
        self
    }

    pub fn with_receive_timeout(mut self, d: Duration) -> Self {
        self.receive_timeout = d;
        self
    }

    pub fn with_check_period(mut self, d: Duration) -> Self {
        self.check_period = d;
        self
    }

    pub fn with_comet_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.comet_prefix = prefix.into();
        self
    }

    pub fn with_store_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.store_prefix = prefix.into();
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn EventHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// The configuration invariant from §3: a receive must time out strictly
    /// before the watchdog would otherwise disconnect it, or every receive
    /// would race the watchdog instead of returning an orderly empty reply.
    pub fn validate(&self) -> Result<(), String> {
        if self.receive_timeout >= self.client_timeout {
            return Err(format!(
                "receive_timeout ({:?}) must be strictly less than client_timeout ({:?})",
                self.receive_timeout, self.client_timeout
            ));
        }
        Ok(())
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("client_timeout", &self.client_timeout)
            .field("receive_timeout", &self.receive_timeout)
            .field("check_period", &self.check_period)
            .field("db_path", &self.db_path)
            .field("comet_prefix", &self.comet_prefix)
            .field("store_prefix", &self.store_prefix)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_receive_timeout_not_strictly_less_than_client_timeout() {
        let cfg = Config::new("/tmp/x")
            .with_client_timeout(Duration::from_secs(10))
            .with_receive_timeout(Duration::from_secs(10));
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn accepts_the_documented_defaults() {
        let cfg = Config::new("/tmp/x");
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.comet_prefix, "/comet");
        assert_eq!(cfg.store_prefix, "/dictionary");
    }
}
