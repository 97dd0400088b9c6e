use thiserror::Error;

use crate::data_class::{DataClassRegistry, SchemaLink};

/// The two builds disagree about a data class. Writing a record of that class
/// would put a wrongly shaped value into a live channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("Data class `{class}` is not known to this build")]
    UnknownClass { class: String },

    #[error("Data class `{class}` has {remote} ancestry links remotely but {local} locally")]
    LengthMismatch {
        class: String,
        local: usize,
        remote: usize,
    },

    #[error("Data class `{class}`: ancestry link {index} is `{remote}` remotely but `{local}` locally")]
    NameMismatch {
        class: String,
        index: usize,
        local: String,
        remote: String,
    },

    #[error("Data class `{class}`: `{link}` has fingerprint {remote:#010x} remotely but {local:#010x} locally")]
    FingerprintMismatch {
        class: String,
        link: String,
        local: u32,
        remote: u32,
    },
}

/// Compare a received ancestry chain with the local one for the same class,
/// link by link: same names in the same order, same fingerprints, same length
pub fn verify_schema(
    registry: &DataClassRegistry,
    class: &str,
    remote: &[SchemaLink],
) -> Result<(), SchemaError> {
    let local = registry
        .ancestry(class)
        .ok_or_else(|| SchemaError::UnknownClass {
            class: class.to_string(),
        })?;

    for (index, (local_link, remote_link)) in local.iter().zip(remote).enumerate() {
        if local_link.name != remote_link.name {
            return Err(SchemaError::NameMismatch {
                class: class.to_string(),
                index,
                local: local_link.name.clone(),
                remote: remote_link.name.clone(),
            });
        }
        if local_link.fingerprint != remote_link.fingerprint {
            return Err(SchemaError::FingerprintMismatch {
                class: class.to_string(),
                link: local_link.name.clone(),
                local: local_link.fingerprint,
                remote: remote_link.fingerprint,
            });
        }
    }

    if local.len() != remote.len() {
        return Err(SchemaError::LengthMismatch {
            class: class.to_string(),
            local: local.len(),
            remote: remote.len(),
        });
    }
    Ok(())
}
