use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("admin api key must have the form <id>:<secret>")]
    MissingSeparator,
    #[error("admin api key contains more than one ':' separator")]
    TooManySeparators,
    #[error("admin api key id is empty")]
    EmptyKeyId,
    #[error("admin api key secret is empty")]
    EmptySecret,
    #[error("admin api key secret is not valid hex")]
    InvalidHex,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {message}")]
    Invalid { name: &'static str, message: String },
}

/// Errors raised by a single remote call.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// 401/403 from the remote: the credential was rejected.
    #[error("authentication failed: {0}")]
    Auth(String),
    /// Unreachable host, transport failure, 5xx or an unreadable body.
    #[error("connection failed: {0}")]
    Connection(String),
    /// Any other non-success status.
    #[error("unexpected response: HTTP {status}")]
    Api { status: u16 },
}

impl ClientError {
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            401 | 403 => ClientError::Auth(format!("HTTP {}: {}", status, truncate(body))),
            500..=599 => ClientError::Connection(format!("HTTP {}", status)),
            _ => ClientError::Api { status },
        }
    }

    pub fn malformed(err: impl std::fmt::Display) -> Self {
        ClientError::Connection(format!("malformed response: {}", err))
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, ClientError::Auth(_))
    }
}

fn truncate(body: &str) -> &str {
    match body.char_indices().nth(200) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

/// Outcome of a failed refresh cycle, as seen by consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum CycleError {
    /// Credentials must be re-entered; the coordinator stops polling.
    #[error("authentication failed: {0}")]
    AuthFailed(String),
    /// Retried on the next scheduled tick.
    #[error("update failed: {0}")]
    Transient(String),
}

impl From<ClientError> for CycleError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Auth(_) => CycleError::AuthFailed(err.to_string()),
            other => CycleError::Transient(other.to_string()),
        }
    }
}

impl CycleError {
    pub fn is_auth(&self) -> bool {
        matches!(self, CycleError::AuthFailed(_))
    }
}
