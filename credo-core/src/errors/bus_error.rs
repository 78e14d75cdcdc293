/// Message-bus adapter errors.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("channel {channel} is closed")]
    ChannelClosed { channel: String },

    #[error("failed to encode envelope: {reason}")]
    Encode { reason: String },

    #[error("failed to decode envelope: {reason}")]
    Decode { reason: String },
}
