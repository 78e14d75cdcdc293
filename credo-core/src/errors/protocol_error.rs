/// Protocol-layer errors.
///
/// `ValueOutOfRange` is the enforcement point for the bounded-trust
/// invariant: an out-of-range write is rejected before any mutation, never
/// silently clamped.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("{what} out of range: {value}")]
    ValueOutOfRange { what: &'static str, value: f64 },

    #[error("unknown peer: {peer}")]
    UnknownPeer { peer: String },

    #[error("trust record for {peer} is operator-fixed")]
    FixedTrust { peer: String },
}
