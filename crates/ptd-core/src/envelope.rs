//! # Envelope
//!
//! Every PTD record travels as an [`Envelope`]: an identifier, an entity
//! type tag, an entity-specific payload (`spec`) and [`Meta`]. The payload
//! type is a parameter; open payloads use `serde_json::Value`, whose object
//! keys are sorted at canonicalization time like every other map.
//!
//! Signature handling lives entirely in [`Meta`] and the [`Signable`]
//! implementation below, so payload types never see it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entity::EntityType;
use crate::error::PtdError;
use crate::identity::{parse_id, IdGenerator, PtdId};
use crate::signature::{Signable, Signature};
use crate::temporal::Timestamp;

/// A typed PTD document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T = Value> {
    /// `ptd:<type>:<raw-id>`.
    pub id: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub spec: T,
    pub meta: Meta,
}

/// Document metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    /// Schema version, e.g. `ptd.v1.tournament@1.0.0`.
    pub schema: String,
    /// Revision counter, bumped on every update.
    pub version: u64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    /// Source system tag, e.g. `icc:prod-us-west`.
    pub source: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Vendor extensions. A `BTreeMap` keeps serialization order fixed.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extensions: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<Signature>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Provenance>,
}

impl Meta {
    /// Fresh metadata at revision 1 with the default schema for `entity_type`.
    pub fn new(entity_type: EntityType, source: impl Into<String>) -> Self {
        let now = Timestamp::now();
        Self {
            schema: entity_type.default_schema(),
            version: 1,
            created_at: now,
            updated_at: now,
            source: source.into(),
            tags: Vec::new(),
            extensions: BTreeMap::new(),
            signature: None,
            provenance: None,
        }
    }
}

/// Lineage of a record: where it came from and what was done to it.
/// Covered by the signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub original_source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imported_from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imported_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transformations: Vec<Transform>,
}

/// One transformation applied to a record after it left its source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transform {
    #[serde(rename = "type")]
    pub transform_type: String,
    pub description: String,
    pub applied_at: Timestamp,
    pub applied_by: String,
}

impl<T> Envelope<T> {
    /// Wrap `spec` under an existing identifier.
    pub fn new(id: PtdId, spec: T, source: impl Into<String>) -> Self {
        let entity_type = id.entity_type();
        Self {
            id: id.to_string(),
            entity_type,
            spec,
            meta: Meta::new(entity_type, source),
        }
    }

    /// Wrap `spec` under a freshly generated identifier.
    pub fn create(
        generator: &IdGenerator,
        entity_type: EntityType,
        spec: T,
        source: impl Into<String>,
    ) -> Self {
        Self::new(generator.generate(entity_type), spec, source)
    }

    /// Record an update: bump the revision and the update time.
    ///
    /// Any attached signature no longer matches and is dropped.
    pub fn touch(&mut self) {
        self.meta.version += 1;
        self.meta.updated_at = Timestamp::now();
        self.meta.signature = None;
    }

    /// Structural checks on identifier, type and schema.
    ///
    /// Payload fields are not inspected.
    pub fn validate(&self) -> Result<(), PtdError> {
        if self.id.is_empty() {
            return Err(PtdError::InvalidId("identifier is empty".to_string()));
        }
        let parts = parse_id(&self.id)?;
        let id_type: EntityType = parts.entity_type.parse()?;
        if id_type != self.entity_type {
            return Err(PtdError::InvalidType(format!(
                "identifier type {id_type} does not match envelope type {}",
                self.entity_type
            )));
        }
        if self.meta.schema.is_empty() {
            return Err(PtdError::MissingSchema);
        }
        let schema = SchemaVersion::parse(&self.meta.schema)?;
        if schema.entity_type != self.entity_type {
            return Err(PtdError::InvalidSchema(format!(
                "schema {} is for {}, envelope is {}",
                self.meta.schema, schema.entity_type, self.entity_type
            )));
        }
        Ok(())
    }
}

impl<T: Serialize> Signable for Envelope<T> {
    fn signature(&self) -> Option<&Signature> {
        self.meta.signature.as_ref()
    }

    fn set_signature(&mut self, signature: Signature) {
        self.meta.signature = Some(signature);
    }

    fn strip_unsigned(value: &mut Value) {
        if let Some(meta) = value.get_mut("meta").and_then(Value::as_object_mut) {
            meta.remove("signature");
        }
    }
}

/// Parsed form of a schema string `ptd.v<N>.<type>@<major>.<minor>.<patch>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaVersion {
    pub format: u32,
    pub entity_type: EntityType,
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl SchemaVersion {
    pub fn parse(s: &str) -> Result<Self, PtdError> {
        let invalid = || PtdError::InvalidSchema(s.to_string());

        let (name, semver) = s.split_once('@').ok_or_else(invalid)?;
        let mut name_parts = name.split('.');
        let (Some("ptd"), Some(format), Some(ty), None) = (
            name_parts.next(),
            name_parts.next(),
            name_parts.next(),
            name_parts.next(),
        ) else {
            return Err(invalid());
        };
        let format = format
            .strip_prefix('v')
            .and_then(|n| n.parse::<u32>().ok())
            .ok_or_else(invalid)?;
        let entity_type = ty.parse::<EntityType>().map_err(|_| invalid())?;

        let nums: Vec<u32> = semver
            .split('.')
            .map(|p| p.parse::<u32>())
            .collect::<Result<_, _>>()
            .map_err(|_| invalid())?;
        let &[major, minor, patch] = nums.as_slice() else {
            return Err(invalid());
        };

        Ok(Self {
            format,
            entity_type,
            major,
            minor,
            patch,
        })
    }
}

impl std::fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ptd.v{}.{}@{}.{}.{}",
            self.format, self.entity_type, self.major, self.minor, self.patch
        )
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn signature_content_never_changes_signing_input(
            key_a in "[a-z0-9-]{1,20}",
            key_b in "[a-z0-9-]{1,20}",
            sig_a in "[A-Za-z0-9+/]{0,88}",
            sig_b in "[A-Za-z0-9+/]{0,88}",
            secs in 0i64..4_000_000_000,
        ) {
            let env = Envelope::create(
                &IdGenerator::new(),
                EntityType::Match,
                serde_json::json!({"court": 3, "best_of": 5}),
                "prop",
            );
            let at = Timestamp::from_epoch_secs(secs).unwrap();
            let mut a = env.clone();
            a.set_signature(Signature {
                algorithm: "ed25519".into(),
                public_key_id: key_a,
                signature: sig_a,
                signed_at: at,
                signed_by: "a".into(),
            });
            let mut b = env.clone();
            b.set_signature(Signature {
                algorithm: "other".into(),
                public_key_id: key_b,
                signature: sig_b,
                signed_at: at,
                signed_by: "b".into(),
            });
            let base = env.signing_input().unwrap();
            prop_assert_eq!(&a.signing_input().unwrap(), &base);
            prop_assert_eq!(&b.signing_input().unwrap(), &base);
        }
    }
}
