//! Push Core (component B): connect / disconnect / receive / flush, with a
//! single-receiver-per-client guarantee and a bounded receive timeout.

use crate::client::record::InboxItem;
use crate::client::{ClientId, ClientRegistry};
use crate::error::{CoreError, Result};
use crate::hooks::EventHooks;
use std::sync::Arc;
use std::time::Duration;

pub struct PushCore {
    registry: Arc<ClientRegistry>,
    receive_timeout: Duration,
}

impl PushCore {
    pub fn new(client_timeout: Duration, receive_timeout: Duration, hooks: Arc<dyn EventHooks>) -> Self {
        Self {
            registry: ClientRegistry::new(client_timeout, hooks),
            receive_timeout,
        }
    }

    pub fn registry(&self) -> &Arc<ClientRegistry> {
        &self.registry
    }

    pub fn connect(&self, id: ClientId) {
        self.registry.connect(id);
    }

    pub fn disconnect(&self, id: &ClientId) {
        self.registry.disconnect(id);
    }

    pub fn present(&self, id: &ClientId) -> bool {
        self.registry.present(id)
    }

    /// Non-blocking. Appends `payload` to `id`'s inbox; multiple producers
    /// may call this concurrently for the same id, and payloads are
    /// delivered first-come-first-served.
    pub fn queue(&self, id: &ClientId, payload: String) -> Result<()> {
        let record = self.registry.get(id).ok_or_else(|| CoreError::UnknownClient(id.clone()))?;
        record.queue(payload);
        Ok(())
    }

    /// Updates the heartbeat, then, under the client's receive mutex, waits
    /// for either the next payload or the receive timeout. Concurrent
    /// `receive` calls for the same id are serialized by that mutex, so an
    /// overlapped caller may block a long time and then observe a
    /// disconnect rather than a payload.
    pub async fn receive(&self, id: &ClientId) -> Result<Option<String>> {
        let record = self.registry.get(id).ok_or_else(|| CoreError::UnknownClient(id.clone()))?;
        let _guard = record.receive_mutex.lock().await;
        record.touch_heartbeat();

        // A native timed primitive stands in for the reference
        // implementation's timer-plus-sentinel scheme; the external
        // semantics (empty reply on timeout, no further state mutation) are
        // identical, and a `flush`/`disconnect`-pushed sentinel still races
        // the timeout exactly as it would with a manual timer.
        match tokio::time::timeout(self.receive_timeout, record.pop()).await {
            Ok(InboxItem::Payload(payload)) => Ok(Some(payload)),
            Ok(InboxItem::Wake) | Err(_) => Ok(None),
        }
    }

    /// Enqueues a wake sentinel so any in-flight `receive` returns
    /// immediately; subsequent receives proceed normally.
    pub fn flush(&self, id: &ClientId) -> Result<()> {
        let record = self.registry.get(id).ok_or_else(|| CoreError::UnknownClient(id.clone()))?;
        record.wake();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::TracingHooks;
    use std::time::Duration;

    fn push() -> PushCore {
        PushCore::new(Duration::from_secs(60), Duration::from_millis(200), Arc::new(TracingHooks))
    }

    #[tokio::test]
    async fn queue_against_unknown_client_fails() {
        let p = push();
        let err = p.queue(&"ghost".into(), "hi".into()).unwrap_err();
        assert!(matches!(err, CoreError::UnknownClient(_)));
    }

    #[tokio::test]
    async fn receive_returns_a_queued_payload() {
        let p = push();
        p.connect("a".into());
        p.queue(&"a".into(), "hello".into()).unwrap();
        let msg = p.receive(&"a".into()).await.unwrap();
        assert_eq!(msg, Some("hello".to_string()));
    }

    #[tokio::test]
    async fn receive_times_out_to_none_without_disconnecting() {
        let p = push();
        p.connect("a".into());
        let msg = p.receive(&"a".into()).await.unwrap();
        assert_eq!(msg, None);
        assert!(p.present(&"a".into()));
    }

    /// `start_paused` + `advance` replaces a fixed real-time `sleep` before the
    /// competing action: `advance` drains every runnable task (driving the
    /// spawned receiver up to its blocking await) before moving the clock,
    /// so the ordering below holds regardless of scheduler load.
    #[tokio::test(start_paused = true)]
    async fn flush_wakes_an_in_flight_receive_promptly() {
        let p = Arc::new(push());
        p.connect("a".into());
        let p2 = p.clone();
        let receiver = tokio::spawn(async move { p2.receive(&"a".into()).await.unwrap() });
        tokio::time::advance(Duration::from_millis(20)).await;
        p.flush(&"a".into()).unwrap();
        let result = tokio::time::timeout(Duration::from_millis(100), receiver).await;
        assert_eq!(result.unwrap().unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_wakes_an_in_flight_receive() {
        let p = Arc::new(push());
        p.connect("a".into());
        let p2 = p.clone();
        let receiver = tokio::spawn(async move { p2.receive(&"a".into()).await });
        tokio::time::advance(Duration::from_millis(20)).await;
        p.disconnect(&"a".into());
        let result = tokio::time::timeout(Duration::from_millis(100), receiver).await;
        assert_eq!(result.unwrap().unwrap().unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_receives_for_one_client_are_serialized() {
        let p = Arc::new(push());
        p.connect("a".into());
        let p1 = p.clone();
        let p2 = p.clone();
        let r1 = tokio::spawn(async move { p1.receive(&"a".into()).await });
        tokio::time::advance(Duration::from_millis(10)).await;
        let r2 = tokio::spawn(async move { p2.receive(&"a".into()).await });
        // drain r2 up to its mutex-blocked wait before the first receiver releases it.
        tokio::time::advance(Duration::from_millis(1)).await;
        p.queue(&"a".into(), "first".into()).unwrap();
        let first = r1.await.unwrap().unwrap();
        assert_eq!(first, Some("first".to_string()));
        // second receive was queued behind the first and now runs its own timeout.
        tokio::time::advance(Duration::from_millis(200)).await;
        let second = r2.await.unwrap().unwrap();
        assert_eq!(second, None);
    }
}
