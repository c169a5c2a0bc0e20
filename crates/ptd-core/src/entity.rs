//! # Entity Types
//!
//! Defines the `EntityType` tag carried by every identifier and envelope.
//! This is the one definition used across the workspace; every `match` on
//! it is exhaustive, so adding a kind forces each consumer to handle it.
//!
//! The wire form is the lowercase name (`"tournament"`, `"match"`, ...),
//! shared by identifiers (`ptd:<type>:<raw-id>`), schema strings
//! (`ptd.v1.<type>@1.0.0`), and archive layout (`<type>/<type>s.ndjson`).

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::PtdError;

/// All entity kinds that can be wrapped in an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    /// A tournament: the top-level competition record.
    Tournament,
    /// An event within a tournament (e.g. men's singles).
    Event,
    /// A single match between two entries.
    Match,
    /// A participant entry in an event.
    Entry,
    /// An individual player.
    Player,
    /// A round of an event.
    Round,
    /// A bracket or draw.
    Bracket,
    /// A competition venue.
    Venue,
    /// A tournament organizer.
    Organizer,
    /// A match official.
    Official,
}

impl EntityType {
    /// Returns all entity types in declaration order.
    pub fn all() -> &'static [EntityType] {
        &[
            Self::Tournament,
            Self::Event,
            Self::Match,
            Self::Entry,
            Self::Player,
            Self::Round,
            Self::Bracket,
            Self::Venue,
            Self::Organizer,
            Self::Official,
        ]
    }

    /// Returns the lowercase wire name of this entity type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tournament => "tournament",
            Self::Event => "event",
            Self::Match => "match",
            Self::Entry => "entry",
            Self::Player => "player",
            Self::Round => "round",
            Self::Bracket => "bracket",
            Self::Venue => "venue",
            Self::Organizer => "organizer",
            Self::Official => "official",
        }
    }

    /// Default schema identifier for version 1.0.0 of this entity type.
    pub fn default_schema(&self) -> String {
        format!("ptd.v1.{}@1.0.0", self.as_str())
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = PtdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tournament" => Ok(Self::Tournament),
            "event" => Ok(Self::Event),
            "match" => Ok(Self::Match),
            "entry" => Ok(Self::Entry),
            "player" => Ok(Self::Player),
            "round" => Ok(Self::Round),
            "bracket" => Ok(Self::Bracket),
            "venue" => Ok(Self::Venue),
            "organizer" => Ok(Self::Organizer),
            "official" => Ok(Self::Official),
            "" => Err(PtdError::InvalidType("entity type is empty".to_string())),
            other => Err(PtdError::InvalidType(format!("unknown entity type: {other:?}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_str_roundtrip() {
        for ty in EntityType::all() {
            let parsed: EntityType = ty.as_str().parse().unwrap();
            assert_eq!(*ty, parsed);
        }
    }

    #[test]
    fn test_from_str_invalid() {
        assert!(matches!("".parse::<EntityType>(), Err(PtdError::InvalidType(_))));
        assert!(matches!("Tournament".parse::<EntityType>(), Err(PtdError::InvalidType(_))));
        assert!(matches!("league".parse::<EntityType>(), Err(PtdError::InvalidType(_))));
    }

    #[test]
    fn test_serde_format_matches_as_str() {
        for ty in EntityType::all() {
            let json = serde_json::to_string(ty).unwrap();
            assert_eq!(json, format!("\"{}\"", ty.as_str()));
        }
    }

    #[test]
    fn test_default_schema() {
        assert_eq!(EntityType::Match.default_schema(), "ptd.v1.match@1.0.0");
    }
}
