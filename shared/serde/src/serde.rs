use crate::{byte_reader::ByteReader, byte_writer::ByteWrite, error::SerdeErr};

/// A type that can be written into and read back out of a byte buffer
pub trait Serde: Sized + Clone + PartialEq {
    /// Serialize into the given writer
    fn ser(&self, writer: &mut dyn ByteWrite);

    /// Deserialize from the given reader
    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr>;

    /// Number of bytes `ser` will write
    fn byte_length(&self) -> u32;
}

/// Implemented by types whose encoded length never depends on the value
pub trait ConstByteLength {
    fn const_byte_length() -> u32;
}
