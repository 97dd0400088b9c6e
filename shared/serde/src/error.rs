use thiserror::Error;

/// The error returned when a value cannot be read from a [`crate::ByteReader`],
/// either because the buffer ends before the value does or because the bytes
/// do not form a valid value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Failed to deserialize value from byte buffer")]
pub struct SerdeErr;
