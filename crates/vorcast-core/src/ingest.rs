// Ingestion boundary: normalized projection records and a CSV loader for
// files that already use the canonical column names.

use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

use crate::player::Position;
use crate::scoring::{FieldGoalsByDistance, ScoringError, StatProjection};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// One player's projection as handed to the store. The position is still
/// raw text here; the store normalises it under its `UnknownPositionPolicy`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub name: String,
    pub position: String,
    #[serde(default)]
    pub team: String,
    #[serde(default)]
    pub projection: StatProjection,
}

/// What to do with a record whose position is not one of QB/RB/WR/TE/K/DST.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnknownPositionPolicy {
    /// Skip the record and report it.
    #[default]
    Reject,
    /// Store the player at the given position.
    Default(Position),
}

impl UnknownPositionPolicy {
    /// Parse a config value: `"reject"` or a position abbreviation.
    pub fn from_config_str(s: &str) -> Option<Self> {
        if s.trim().eq_ignore_ascii_case("reject") {
            return Some(UnknownPositionPolicy::Reject);
        }
        Position::from_str_pos(s).map(UnknownPositionPolicy::Default)
    }

    /// Resolve a raw position string.
    pub fn resolve(&self, raw: &str) -> Option<Position> {
        Position::from_str_pos(raw).or(match self {
            UnknownPositionPolicy::Reject => None,
            UnknownPositionPolicy::Default(pos) => Some(*pos),
        })
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Why a single record was not stored. Never aborts a batch.
#[derive(Debug, Error)]
pub enum IngestionError {
    #[error("record {index}: player name is empty")]
    EmptyName { index: usize },

    #[error("record {index} ({name}): unknown position `{position}`")]
    UnknownPosition {
        index: usize,
        name: String,
        position: String,
    },

    #[error("record {index} ({name}): {source}")]
    MalformedStats {
        index: usize,
        name: String,
        source: ScoringError,
    },
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },
}

// ---------------------------------------------------------------------------
// Raw CSV row (private)
// ---------------------------------------------------------------------------

/// Canonical-header projection row. Empty cells and missing columns are
/// absent stats; extra columns are ignored.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(alias = "player")]
    name: String,
    #[serde(alias = "pos")]
    position: String,
    #[serde(default)]
    team: String,
    passing_yards: Option<f64>,
    passing_tds: Option<f64>,
    interceptions: Option<f64>,
    rushing_yards: Option<f64>,
    rushing_tds: Option<f64>,
    receptions: Option<f64>,
    receiving_yards: Option<f64>,
    receiving_tds: Option<f64>,
    field_goals: Option<f64>,
    extra_points: Option<f64>,
    def_touchdowns: Option<f64>,
    def_interceptions: Option<f64>,
    def_fumbles: Option<f64>,
    def_sacks: Option<f64>,
    def_safeties: Option<f64>,
    points_allowed: Option<f64>,
    fg_0_19: Option<f64>,
    fg_20_29: Option<f64>,
    fg_30_39: Option<f64>,
    fg_40_49: Option<f64>,
    fg_50_plus: Option<f64>,
    #[serde(alias = "fpts")]
    fantasy_points: Option<f64>,
}

impl CsvRow {
    fn into_record(self) -> NormalizedRecord {
        let split = [self.fg_0_19, self.fg_20_29, self.fg_30_39, self.fg_40_49, self.fg_50_plus];
        let field_goals_by_distance = if split.iter().any(Option::is_some) {
            Some(FieldGoalsByDistance {
                under_20: self.fg_0_19.unwrap_or(0.0),
                from_20_to_29: self.fg_20_29.unwrap_or(0.0),
                from_30_to_39: self.fg_30_39.unwrap_or(0.0),
                from_40_to_49: self.fg_40_49.unwrap_or(0.0),
                fifty_plus: self.fg_50_plus.unwrap_or(0.0),
            })
        } else {
            None
        };

        NormalizedRecord {
            name: self.name.trim().to_string(),
            position: self.position.trim().to_string(),
            team: self.team.trim().to_string(),
            projection: StatProjection {
                passing_yards: self.passing_yards,
                passing_tds: self.passing_tds,
                interceptions: self.interceptions,
                rushing_yards: self.rushing_yards,
                rushing_tds: self.rushing_tds,
                receptions: self.receptions,
                receiving_yards: self.receiving_yards,
                receiving_tds: self.receiving_tds,
                field_goals: self.field_goals,
                extra_points: self.extra_points,
                def_touchdowns: self.def_touchdowns,
                def_interceptions: self.def_interceptions,
                def_fumbles: self.def_fumbles,
                def_sacks: self.def_sacks,
                def_safeties: self.def_safeties,
                points_allowed: self.points_allowed,
                field_goals_by_distance,
                source_points: self.fantasy_points,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Loaders
// ---------------------------------------------------------------------------

/// Read records from canonical-header CSV. Rows that fail to parse are
/// skipped with a warning; validation of names, positions and values is
/// left to the store.
pub fn load_records_from_reader<R: Read>(rdr: R) -> Result<Vec<NormalizedRecord>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(rdr);
    let mut records = Vec::new();
    for result in reader.deserialize::<CsvRow>() {
        match result {
            Ok(row) => records.push(row.into_record()),
            Err(e) => {
                warn!("skipping malformed projection row: {}", e);
            }
        }
    }
    Ok(records)
}

/// Load records from a CSV file.
pub fn load_records(path: &Path) -> Result<Vec<NormalizedRecord>, LoadError> {
    let file = std::fs::File::open(path).map_err(|e| LoadError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    load_records_from_reader(file).map_err(|e| LoadError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
