//! The configuration protocol: the messages both roles exchange to agree on
//! which channels and entries are replicated, their framing, and the schema
//! check that guards every imported entry.

mod message;
mod outbox;
mod schema;
mod stream;

pub use message::{
    AddChannel, AddEntry, ConfigError, ConfigMessage, Decoded, RemoveEntry, CONFIG_HEADER_BYTES,
};
pub use outbox::{ConfigOutbox, OutgoingConfig, Recipient};
pub use schema::{verify_schema, SchemaError};
pub use stream::ConfigStream;
