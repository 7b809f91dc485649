/// Errors that can occur while coordinating a render pass.
///
/// None of these escape `RenderCoordinator::run`; they are logged there.
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    /// The bus actor refused a subscription or is not running
    #[error("failed to subscribe to '{topic}': {reason}")]
    Subscribe { topic: String, reason: String },
    /// The bus actor refused a published event or is not running
    #[error("failed to publish '{topic}': {reason}")]
    Publish { topic: String, reason: String },
    /// The bus stopped while the coordinator was waiting on it
    #[error("event bus closed while waiting for {0}")]
    BusClosed(&'static str),
    /// An outgoing payload could not be serialized
    #[error("failed to encode event payload: {0}")]
    Encode(#[from] serde_json::Error),
    /// An incoming payload did not match its topic's shape
    #[error("failed to decode '{topic}' payload: {source}")]
    Decode {
        topic: String,
        source: serde_json::Error,
    },
}
