//! # Chanrep Serde
//! Bounded byte-store codec. Writers never grow past their capacity: a write
//! that does not fit marks the writer as overflowed, and the caller rolls the
//! writer back to a [`WriteMark`] taken before the item.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod byte_reader;
mod byte_writer;
mod constants;
mod error;
mod impls;
mod serde;

pub use byte_reader::ByteReader;
pub use byte_writer::{ByteWrite, ByteWriter, WriteMark};
pub use constants::MTU_SIZE_BYTES;
pub use error::SerdeErr;
pub use serde::{ConstByteLength, Serde};
