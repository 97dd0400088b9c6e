mod inbound;
mod outbound;

pub use inbound::InboundEntry;
pub use outbound::OutboundEntry;

/// Result of offering one item to the payload buffer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PackOutcome {
    /// One complete record was appended
    Written,
    /// Nothing to send
    Empty,
    /// The record did not fit; the buffer is as it was and the item waits
    /// for the next cycle
    Deferred,
}

/// Result of reading one record from a payload
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnpackOutcome {
    /// Decoded, re-timestamped and written into the local channel
    Written,
    /// Decoded but its time could not be translated; dropped
    Discarded,
    /// Not addressed to a known entry of ours; its bytes were skipped
    Skipped,
}
