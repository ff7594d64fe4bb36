use thiserror::Error;

/// The engine's closed error taxonomy: every failure surfaced to a caller
/// is one of these three families, each carrying a stable tag plus a
/// human message. No exception or stack-trace detail crosses this
/// boundary.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Caller-supplied arguments violate a documented contract
    /// (negative timestamp, `rankTo < rankFrom`, `contestId <= 0`, a `T`
    /// that doesn't land on a configured snapshot interval).
    #[error("{0}")]
    Input(String),

    /// Expected data is missing (unknown contest, no submissions, no
    /// prior snapshot where the chosen algorithm required one).
    #[error("{0}")]
    Data(String),

    /// The underlying store failed. Never retried by the engine.
    #[error("{0}")]
    Storage(String),
}

impl EngineError {
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }

    pub fn data(msg: impl Into<String>) -> Self {
        Self::Data(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Stable short tag, suitable for machine-readable reporting; the
    /// message itself may vary freely.
    pub fn tag(&self) -> &'static str {
        match self {
            EngineError::Input(_) => "input_error",
            EngineError::Data(_) => "data_error",
            EngineError::Storage(_) => "storage_error",
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::storage(format!("serialization error: {e}"))
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::storage(format!("io error: {e}"))
    }
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
