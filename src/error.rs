//! Error types for the estimator.

use crate::host::NodeId;

/// Message shown when a save is attempted without a frame selected.
pub const NO_FRAME_SELECTED: &str = "Error, Must have frame selected";

#[derive(Debug, thiserror::Error)]
pub enum EstimatorError {
    /// Save was requested while no frame is selected.
    #[error("{}", NO_FRAME_SELECTED)]
    NoFrameSelected,

    /// Stored estimate text on a node does not decode.
    #[error("Stored estimate on \"{name}\" ({id}) is corrupt: {source}")]
    CorruptEstimate {
        id: NodeId,
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Export failed: {0}")]
    Export(String),

    #[error("message codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("channel closed: {0}")]
    ChannelClosed(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),
}

impl From<csv::Error> for EstimatorError {
    fn from(err: csv::Error) -> Self {
        Self::Export(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EstimatorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_frame_message_is_the_user_facing_text() {
        assert_eq!(EstimatorError::NoFrameSelected.to_string(), NO_FRAME_SELECTED);
    }
}
