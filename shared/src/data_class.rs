use std::collections::HashMap;

use chanrep_serde::{ByteReader, ByteWrite, Serde, SerdeErr};
use thiserror::Error;

/// One link of a data class ancestry chain: a class name and the fingerprint
/// of its binary layout in the build that sent it
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SchemaLink {
    pub name: String,
    pub fingerprint: u32,
}

impl SchemaLink {
    pub fn new(name: &str, fingerprint: u32) -> Self {
        Self {
            name: name.to_string(),
            fingerprint,
        }
    }
}

impl Serde for SchemaLink {
    fn ser(&self, writer: &mut dyn ByteWrite) {
        self.name.ser(writer);
        self.fingerprint.ser(writer);
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            name: String::de(reader)?,
            fingerprint: u32::de(reader)?,
        })
    }

    fn byte_length(&self) -> u32 {
        self.name.byte_length() + 4
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataClassError {
    #[error("Data class `{name}` is already registered")]
    AlreadyRegistered { name: String },

    #[error("Parent class `{parent}` of `{name}` is not registered. Register parents before children")]
    UnknownParent { name: String, parent: String },
}

struct DataClassRecord {
    fingerprint: u32,
    parent: Option<String>,
}

/// The data classes known to this build, with their fingerprints and
/// inheritance. Constructed once and held by the replication context.
#[derive(Default)]
pub struct DataClassRegistry {
    classes: HashMap<String, DataClassRecord>,
}

impl DataClassRegistry {
    pub fn new() -> Self {
        Self {
            classes: HashMap::new(),
        }
    }

    pub fn register(
        &mut self,
        name: &str,
        fingerprint: u32,
        parent: Option<&str>,
    ) -> Result<(), DataClassError> {
        if self.classes.contains_key(name) {
            return Err(DataClassError::AlreadyRegistered {
                name: name.to_string(),
            });
        }
        if let Some(parent) = parent {
            if !self.classes.contains_key(parent) {
                return Err(DataClassError::UnknownParent {
                    name: name.to_string(),
                    parent: parent.to_string(),
                });
            }
        }
        self.classes.insert(
            name.to_string(),
            DataClassRecord {
                fingerprint,
                parent: parent.map(str::to_string),
            },
        );
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn fingerprint(&self, name: &str) -> Option<u32> {
        self.classes.get(name).map(|record| record.fingerprint)
    }

    /// The chain from `name` up to its root class, or `None` if `name` is
    /// unknown here
    pub fn ancestry(&self, name: &str) -> Option<Vec<SchemaLink>> {
        let mut output = Vec::new();
        let mut current = Some(name);
        while let Some(class_name) = current {
            let record = self.classes.get(class_name)?;
            output.push(SchemaLink::new(class_name, record.fingerprint));
            current = record.parent.as_deref();
        }
        Some(output)
    }
}
