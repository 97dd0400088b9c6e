use thiserror::Error;

use crate::types::TimeTick;

/// Why a remote time value could not be mapped onto the local time base.
/// Every variant means the record carrying the value must be discarded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslateError {
    /// No sample has been seen from this peer yet
    #[error("Clock translator has not received a timing sample yet")]
    NotSeeded,

    /// No breakpoint covers the remote tick
    #[error("No breakpoint covers remote tick {tick}")]
    Uncovered { tick: TimeTick },

    /// Start and end fell under breakpoints that do not produce a forward span
    #[error("Remote span {start}..{end} does not translate to a forward local span")]
    Inconsistent { start: TimeTick, end: TimeTick },

    /// The translated value does not fit the local tick type
    #[error("Remote tick {tick} translates outside the local tick range")]
    OutOfRange { tick: TimeTick },
}
