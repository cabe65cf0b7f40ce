use serde::{Deserialize, Serialize};

/// The three mutating operations a client (or the server itself) may apply
/// to a key within a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    Create,
    Update,
    Delete,
}

impl Command {
    pub fn as_str(self) -> &'static str {
        match self {
            Command::Create => "create",
            Command::Update => "update",
            Command::Delete => "delete",
        }
    }
}

/// A single wire message, as submitted by a client to `/dictionary/messages`
/// or synthesized internally for replay and broadcast.
///
/// `value`, `version` and `previous_version` are all opaque strings; the
/// server never interprets their contents, only tests them for presence and
/// equality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub command: Command,
    pub domain: String,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_version: Option<String>,
}

impl Message {
    pub fn create(domain: impl Into<String>, key: impl Into<String>, value: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            command: Command::Create,
            domain: domain.into(),
            key: key.into(),
            value: Some(value.into()),
            version: Some(version.into()),
            previous_version: None,
        }
    }

    pub fn update(
        domain: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
        version: impl Into<String>,
        previous_version: impl Into<String>,
    ) -> Self {
        Self {
            command: Command::Update,
            domain: domain.into(),
            key: key.into(),
            value: Some(value.into()),
            version: Some(version.into()),
            previous_version: Some(previous_version.into()),
        }
    }

    pub fn delete(domain: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            command: Command::Delete,
            domain: domain.into(),
            key: key.into(),
            value: None,
            version: None,
            previous_version: None,
        }
    }

    /// Encode a batch as the single JSON array string that crosses the wire
    /// in a push payload or a `/dictionary/messages` body.
    pub fn encode_batch(batch: &[Message]) -> String {
        // A `Vec<Message>` always serializes; the only failure mode is an
        // adapter bug, which we'd rather panic on than silently drop data.
        serde_json::to_string(batch).expect("Message batch is always serializable")
    }

    /// Parse a `/dictionary/messages` body into a batch.
    ///
    /// The body as a whole must be a JSON array (anything else is a
    /// request-level failure); individual elements that are missing a
    /// required field or name an unknown command are reported as `Err` in
    /// place, rather than failing the whole parse, so that the caller can
    /// report each via `on_error` and keep going with the rest of the
    /// batch.
    pub fn parse_batch(json: &str) -> Result<Vec<Result<Message, MessageParseError>>, MessageParseError> {
        let value: serde_json::Value = serde_json::from_str(json).map_err(|e| MessageParseError::NotJson(e.to_string()))?;
        let elements = value.as_array().ok_or(MessageParseError::NotAnArray)?;
        Ok(elements
            .iter()
            .enumerate()
            .map(|(index, element)| {
                let command = element.get("command").and_then(|v| v.as_str());
                let domain = element.get("domain").and_then(|v| v.as_str());
                let key = element.get("key").and_then(|v| v.as_str());
                let (Some(command), Some(domain), Some(key)) = (command, domain, key) else {
                    return Err(MessageParseError::MissingField { index });
                };
                let command = match command {
                    "create" => Command::Create,
                    "update" => Command::Update,
                    "delete" => Command::Delete,
                    other => return Err(MessageParseError::UnknownCommand { index, command: other.to_string() }),
                };
                let str_field = |name: &str| element.get(name).and_then(|v| v.as_str()).map(str::to_owned);
                Ok(Message {
                    command,
                    domain: domain.to_owned(),
                    key: key.to_owned(),
                    value: str_field("value"),
                    version: str_field("version"),
                    previous_version: str_field("previous_version"),
                })
            })
            .collect())
    }
}

/// Why an inbound batch, or one element of it, failed to parse.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MessageParseError {
    #[error("request body is not valid JSON: {0}")]
    NotJson(String),
    #[error("request body is not a JSON array")]
    NotAnArray,
    #[error("message {index} is missing command, domain, or key")]
    MissingField { index: usize },
    #[error("message {index} has unknown command `{command}`")]
    UnknownCommand { index: usize, command: String },
}
