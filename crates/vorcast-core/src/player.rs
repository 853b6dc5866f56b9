// Player identity and the closed position set.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Store-assigned player identifier. Unique for the lifetime of a store
/// (ids restart at 1 after a full clear).
pub type PlayerId = u32;

/// Football positions a player can be projected at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Position {
    #[serde(rename = "QB")]
    Quarterback,
    #[serde(rename = "RB")]
    RunningBack,
    #[serde(rename = "WR")]
    WideReceiver,
    #[serde(rename = "TE")]
    TightEnd,
    #[serde(rename = "K")]
    Kicker,
    #[serde(rename = "DST")]
    Defense,
}

/// Every position in display order.
pub const ALL_POSITIONS: &[Position] = &[
    Position::Quarterback,
    Position::RunningBack,
    Position::WideReceiver,
    Position::TightEnd,
    Position::Kicker,
    Position::Defense,
];

/// Positions eligible for the FLEX slot unless the league says otherwise.
pub const DEFAULT_FLEX_ELIGIBLE: &[Position] = &[
    Position::RunningBack,
    Position::WideReceiver,
    Position::TightEnd,
];

impl Position {
    /// Parse a position string into a Position enum.
    ///
    /// Accepts the usual abbreviations case-insensitively, plus the
    /// defense spellings used by the various projection vendors
    /// ("DEF", "D/ST", "D") and "PK" for kickers. "FLEX" is a roster
    /// slot, not a position, and is rejected here.
    pub fn from_str_pos(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "QB" => Some(Position::Quarterback),
            "RB" => Some(Position::RunningBack),
            "WR" => Some(Position::WideReceiver),
            "TE" => Some(Position::TightEnd),
            "K" | "PK" => Some(Position::Kicker),
            "DST" | "DEF" | "D/ST" | "D" => Some(Position::Defense),
            _ => None,
        }
    }

    /// Return the display string for this position.
    pub fn display_str(&self) -> &'static str {
        match self {
            Position::Quarterback => "QB",
            Position::RunningBack => "RB",
            Position::WideReceiver => "WR",
            Position::TightEnd => "TE",
            Position::Kicker => "K",
            Position::Defense => "DST",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}

/// A roster slot type: either a concrete position or the FLEX slot.
///
/// Serialized as its display string so it can key JSON maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RosterSlot {
    Position(Position),
    Flex,
}

impl RosterSlot {
    /// Parse a roster config key ("QB", "FLEX", ...). Bench and IR keys
    /// return `None` since they never hold starters.
    pub fn from_key(key: &str) -> Option<Self> {
        let upper = key.trim().to_uppercase();
        if upper == "FLEX" || upper == "W/R/T" {
            return Some(RosterSlot::Flex);
        }
        Position::from_str_pos(&upper).map(RosterSlot::Position)
    }

    pub fn display_str(&self) -> &'static str {
        match self {
            RosterSlot::Position(pos) => pos.display_str(),
            RosterSlot::Flex => "FLEX",
        }
    }
}

impl fmt::Display for RosterSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}

impl Serialize for RosterSlot {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.display_str())
    }
}

impl<'de> Deserialize<'de> for RosterSlot {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let key = String::deserialize(deserializer)?;
        RosterSlot::from_key(&key)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown roster slot `{key}`")))
    }
}

impl From<Position> for RosterSlot {
    fn from(pos: Position) -> Self {
        RosterSlot::Position(pos)
    }
}

/// A player known to the projection store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub position: Position,
    pub team: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_str_pos_accepts_aliases() {
        assert_eq!(Position::from_str_pos("qb"), Some(Position::Quarterback));
        assert_eq!(Position::from_str_pos(" WR "), Some(Position::WideReceiver));
        assert_eq!(Position::from_str_pos("DEF"), Some(Position::Defense));
        assert_eq!(Position::from_str_pos("D/ST"), Some(Position::Defense));
        assert_eq!(Position::from_str_pos("PK"), Some(Position::Kicker));
    }

    #[test]
    fn flex_is_not_a_player_position() {
        assert_eq!(Position::from_str_pos("FLEX"), None);
        assert_eq!(RosterSlot::from_key("FLEX"), Some(RosterSlot::Flex));
        assert_eq!(RosterSlot::from_key("flex"), Some(RosterSlot::Flex));
    }

    #[test]
    fn bench_keys_are_not_roster_slots() {
        assert_eq!(RosterSlot::from_key("BN"), None);
        assert_eq!(RosterSlot::from_key("IR"), None);
    }

    #[test]
    fn display_round_trips_through_parse() {
        for &pos in ALL_POSITIONS {
            assert_eq!(Position::from_str_pos(pos.display_str()), Some(pos));
        }
        assert_eq!(RosterSlot::Flex.to_string(), "FLEX");
        assert_eq!(RosterSlot::from(Position::TightEnd).to_string(), "TE");
    }

    #[test]
    fn position_serializes_as_abbreviation() {
        let json = serde_json::to_string(&Position::Defense).unwrap();
        assert_eq!(json, "\"DST\"");
        let slot = serde_json::to_string(&RosterSlot::Flex).unwrap();
        assert_eq!(slot, "\"FLEX\"");
    }
}
