//! # Identifiers
//!
//! Every PTD entity is named `ptd:<entity-type>:<raw-id>`, where the raw id
//! is a 26-character Crockford base32 token: a 48-bit millisecond timestamp
//! followed by 80 bits of randomness (the ULID layout).
//!
//! ## Invariants
//!
//! - Raw ids from one [`IdGenerator`] are strictly increasing in call order,
//!   including calls inside the same millisecond. The generator increments
//!   the previous entropy instead of drawing fresh randomness in that case.
//! - Raw ids are case-insensitive. Generated identifiers carry the lowercase
//!   form; [`IdGenerator::generate_raw`] returns the uppercase form.
//! - All generator state sits behind one short-lived lock per instance.

use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use ulid::Ulid;

use crate::entity::EntityType;
use crate::error::PtdError;

/// Fixed namespace prefix of every identifier.
pub const NAMESPACE: &str = "ptd";

/// Length of a raw id in characters.
pub const RAW_ID_LEN: usize = 26;

const CROCKFORD: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";
const RANDOM_MASK: u128 = (1u128 << 80) - 1;

/// The 128-bit token underlying every identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RawId(Ulid);

impl RawId {
    /// Parse a raw id, accepting either letter case.
    pub fn parse(s: &str) -> Result<Self, PtdError> {
        if !is_valid_raw(s) {
            return Err(PtdError::InvalidId(format!("malformed raw id: {s:?}")));
        }
        Ulid::from_string(&s.to_ascii_uppercase())
            .map(Self)
            .map_err(|e| PtdError::InvalidId(format!("malformed raw id {s:?}: {e}")))
    }

    /// Milliseconds since the Unix epoch embedded in the id.
    pub fn timestamp_ms(&self) -> u64 {
        self.0.timestamp_ms()
    }

    /// Uppercase canonical Crockford form.
    pub fn to_upper(&self) -> String {
        self.0.to_string()
    }

    /// Lowercase form used inside namespaced identifiers.
    pub fn to_lower(&self) -> String {
        self.0.to_string().to_ascii_lowercase()
    }
}

impl std::fmt::Display for RawId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_upper())
    }
}

/// Check that `s` is a well-formed raw id: 26 characters from the Crockford
/// alphabet (either case) whose leading character keeps the value in 128 bits.
pub fn is_valid_raw(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.len() != RAW_ID_LEN {
        return false;
    }
    if !bytes
        .iter()
        .all(|b| CROCKFORD.contains(&b.to_ascii_uppercase()))
    {
        return false;
    }
    bytes[0] <= b'7'
}

/// The three components of an identifier, borrowed from the source string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdParts<'a> {
    /// Always [`NAMESPACE`].
    pub namespace: &'a str,
    /// Entity type segment, not yet checked against [`EntityType`].
    pub entity_type: &'a str,
    /// Raw id segment, not yet checked against the raw-id format.
    pub raw: &'a str,
}

/// Split an identifier into its components.
///
/// Only the shape is checked here: exactly three colon-delimited, non-empty
/// parts with the `ptd` namespace. Imported identifiers may carry a foreign
/// raw segment, so the raw part is not required to be a generated token.
pub fn parse_id(id: &str) -> Result<IdParts<'_>, PtdError> {
    let mut parts = id.split(':');
    let (Some(namespace), Some(entity_type), Some(raw), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(PtdError::InvalidId(format!(
            "expected format ptd:<type>:<id>, got {id:?}"
        )));
    };
    if namespace != NAMESPACE {
        return Err(PtdError::InvalidId(format!(
            "identifier must start with \"{NAMESPACE}:\", got {id:?}"
        )));
    }
    if entity_type.is_empty() || raw.is_empty() {
        return Err(PtdError::InvalidId(format!("empty identifier segment in {id:?}")));
    }
    Ok(IdParts {
        namespace,
        entity_type,
        raw,
    })
}

/// Returns true if `id` has the `ptd:<type>:<id>` shape.
pub fn is_valid_id(id: &str) -> bool {
    parse_id(id).is_ok()
}

/// A fully typed identifier: known entity type and generated raw id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PtdId {
    entity_type: EntityType,
    raw: RawId,
}

impl PtdId {
    /// Assemble an identifier from its parts.
    pub fn new(entity_type: EntityType, raw: RawId) -> Self {
        Self { entity_type, raw }
    }

    /// Parse a strict identifier. The type must be a known [`EntityType`]
    /// and the raw part a valid raw id.
    pub fn parse(id: &str) -> Result<Self, PtdError> {
        let parts = parse_id(id)?;
        let entity_type = parts.entity_type.parse::<EntityType>()?;
        let raw = RawId::parse(parts.raw)?;
        Ok(Self { entity_type, raw })
    }

    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    pub fn raw(&self) -> RawId {
        self.raw
    }
}

impl std::fmt::Display for PtdId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{NAMESPACE}:{}:{}", self.entity_type, self.raw.to_lower())
    }
}

impl std::str::FromStr for PtdId {
    type Err = PtdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for PtdId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PtdId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Default)]
struct GeneratorState {
    last_ms: u64,
    last_random: u128,
}

/// Monotonic raw-id generator.
///
/// Construct one per component that needs identifiers and pass it in, or
/// use [`IdGenerator::global()`] for a process-wide instance.
#[derive(Debug, Default)]
pub struct IdGenerator {
    state: Mutex<GeneratorState>,
}

static GLOBAL: OnceLock<IdGenerator> = OnceLock::new();

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide generator, constructed on first use.
    pub fn global() -> &'static IdGenerator {
        GLOBAL.get_or_init(IdGenerator::new)
    }

    /// Generate a namespaced identifier for `entity_type`.
    pub fn generate(&self, entity_type: EntityType) -> PtdId {
        PtdId::new(entity_type, self.next_raw())
    }

    /// Generate a bare raw id in uppercase form.
    pub fn generate_raw(&self) -> String {
        self.next_raw().to_upper()
    }

    /// Generate the next raw id.
    pub fn next_raw(&self) -> RawId {
        self.next_at(now_ms())
    }

    fn next_at(&self, now_ms: u64) -> RawId {
        let mut state = self.state.lock();
        let (ms, random) = if now_ms > state.last_ms {
            (now_ms, fresh_random())
        } else {
            // Same tick or clock stepped back: stay on the last tick and
            // increment. On overflow move to the next tick.
            match state.last_random.checked_add(1) {
                Some(next) if next <= RANDOM_MASK => (state.last_ms, next),
                _ => (state.last_ms + 1, fresh_random()),
            }
        };
        state.last_ms = ms;
        state.last_random = random;
        RawId(Ulid::from_parts(ms, random))
    }
}

/// Generate an identifier with the process-wide generator.
pub fn generate_id(entity_type: EntityType) -> String {
    IdGenerator::global().generate(entity_type).to_string()
}

/// Generate an uppercase raw id with the process-wide generator.
pub fn generate_raw() -> String {
    IdGenerator::global().generate_raw()
}

fn fresh_random() -> u128 {
    // Top bit clear leaves headroom for same-tick increments.
    rand::thread_rng().gen::<u128>() & (RANDOM_MASK >> 1)
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
