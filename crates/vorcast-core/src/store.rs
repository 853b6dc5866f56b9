// In-memory projection store.
//
// Holds every known player and their current projection. Writers (ingest,
// clear) take the write lock for a whole batch; readers copy out what they
// need under the read lock, so a ranking never sees a half-applied batch.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::ingest::{IngestionError, NormalizedRecord, UnknownPositionPolicy};
use crate::player::{Player, PlayerId, Position};
use crate::scoring::{check_projection, StatProjection};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// A player together with their current projection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerProjection {
    pub player: Player,
    pub projection: StatProjection,
}

impl PlayerProjection {
    fn source_points(&self) -> f64 {
        self.projection.source_points.unwrap_or(0.0)
    }
}

/// Outcome of one ingestion batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReport {
    pub source: String,
    pub records_processed: usize,
    pub players_created: usize,
    pub players_updated: usize,
    pub projections_written: usize,
    /// One human-readable line per rejected record.
    pub errors: Vec<String>,
    pub dataset_version: u64,
}

/// A named upstream that has supplied projections.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectionSource {
    pub name: String,
    pub last_updated: DateTime<Utc>,
    /// Records accepted from the most recent batch.
    pub records: usize,
}

/// Filter for `get_projections`. Empty fields match everything.
#[derive(Debug, Clone, Default)]
pub struct ProjectionFilter {
    pub position: Option<Position>,
    /// Team abbreviation, compared case-insensitively.
    pub team: Option<String>,
    pub limit: Option<usize>,
}

/// Consistent copy of the store contents, in player-id order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreSnapshot {
    pub dataset_version: u64,
    pub entries: Vec<PlayerProjection>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreStatistics {
    pub total_players: usize,
    pub total_projections: usize,
    pub position_breakdown: BTreeMap<Position, usize>,
    pub sources: usize,
    pub last_updated: Option<DateTime<Utc>>,
    pub dataset_version: u64,
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct StoreInner {
    players: BTreeMap<PlayerId, Player>,
    projections: BTreeMap<PlayerId, StatProjection>,
    /// (lowercased name, position) -> id
    identity: HashMap<(String, Position), PlayerId>,
    sources: BTreeMap<String, ProjectionSource>,
    next_id: PlayerId,
    version: u64,
}

impl StoreInner {
    fn new(version: u64) -> Self {
        StoreInner {
            players: BTreeMap::new(),
            projections: BTreeMap::new(),
            identity: HashMap::new(),
            sources: BTreeMap::new(),
            next_id: 1,
            version,
        }
    }

    fn entry(&self, id: PlayerId) -> Option<PlayerProjection> {
        let player = self.players.get(&id)?;
        let projection = self.projections.get(&id)?;
        Some(PlayerProjection {
            player: player.clone(),
            projection: projection.clone(),
        })
    }

    fn entries(&self) -> impl Iterator<Item = PlayerProjection> + '_ {
        self.players.keys().filter_map(|&id| self.entry(id))
    }
}

/// Thread-safe in-memory store of players and projections.
#[derive(Debug)]
pub struct ProjectionStore {
    inner: RwLock<StoreInner>,
    unknown_position: UnknownPositionPolicy,
}

impl Default for ProjectionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectionStore {
    pub fn new() -> Self {
        Self::with_policy(UnknownPositionPolicy::default())
    }

    pub fn with_policy(unknown_position: UnknownPositionPolicy) -> Self {
        ProjectionStore {
            inner: RwLock::new(StoreInner::new(0)),
            unknown_position,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreInner> {
        self.inner.read().expect("projection store lock poisoned")
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreInner> {
        self.inner.write().expect("projection store lock poisoned")
    }

    // ---- Writes ----

    /// Store a batch of records from one source.
    ///
    /// Records are matched to existing players by case-insensitive name and
    /// position; a match keeps its id, takes the new team when one is given
    /// and has its projection replaced. Rejected records are reported in
    /// `IngestReport::errors` and never abort the batch.
    pub fn ingest(&self, source: &str, records: &[NormalizedRecord]) -> IngestReport {
        let mut inner = self.write();
        let mut report = IngestReport {
            source: source.to_string(),
            records_processed: 0,
            players_created: 0,
            players_updated: 0,
            projections_written: 0,
            errors: Vec::new(),
            dataset_version: 0,
        };

        for (index, record) in records.iter().enumerate() {
            report.records_processed += 1;
            match self.validate(index, record) {
                Ok((name, position)) => {
                    let key = (name.to_lowercase(), position);
                    let team = record.team.trim().to_uppercase();
                    let id = match inner.identity.get(&key).copied() {
                        Some(id) => {
                            if let Some(player) = inner.players.get_mut(&id) {
                                if !team.is_empty() {
                                    player.team = team;
                                }
                            }
                            report.players_updated += 1;
                            id
                        }
                        None => {
                            let id = inner.next_id;
                            inner.next_id += 1;
                            inner.players.insert(
                                id,
                                Player {
                                    id,
                                    name,
                                    position,
                                    team,
                                },
                            );
                            inner.identity.insert(key, id);
                            report.players_created += 1;
                            id
                        }
                    };
                    inner.projections.insert(id, record.projection.clone());
                    report.projections_written += 1;
                }
                Err(e) => {
                    debug!("rejected projection record: {}", e);
                    report.errors.push(e.to_string());
                }
            }
        }

        if report.projections_written > 0 {
            inner.sources.insert(
                source.to_string(),
                ProjectionSource {
                    name: source.to_string(),
                    last_updated: Utc::now(),
                    records: report.projections_written,
                },
            );
        }
        inner.version += 1;
        report.dataset_version = inner.version;

        if !report.errors.is_empty() {
            warn!(
                "{}: {} of {} records rejected",
                source,
                report.errors.len(),
                report.records_processed
            );
        }
        info!(
            "ingested {} projections from {} ({} new players, {} updated)",
            report.projections_written, source, report.players_created, report.players_updated
        );

        report
    }

    fn validate(
        &self,
        index: usize,
        record: &NormalizedRecord,
    ) -> Result<(String, Position), IngestionError> {
        let name = record.name.trim();
        if name.is_empty() {
            return Err(IngestionError::EmptyName { index });
        }

        let position = self.unknown_position.resolve(&record.position).ok_or_else(|| {
            IngestionError::UnknownPosition {
                index,
                name: name.to_string(),
                position: record.position.clone(),
            }
        })?;

        check_projection(&record.projection).map_err(|source| IngestionError::MalformedStats {
            index,
            name: name.to_string(),
            source,
        })?;

        Ok((name.to_string(), position))
    }

    /// Remove every player, projection and source. Ids restart at 1; the
    /// dataset version keeps counting.
    pub fn clear(&self) {
        let mut inner = self.write();
        let version = inner.version + 1;
        *inner = StoreInner::new(version);
        info!("projection store cleared");
    }

    // ---- Reads ----

    /// Copy the full contents under one read lock.
    pub fn snapshot(&self) -> StoreSnapshot {
        let inner = self.read();
        StoreSnapshot {
            dataset_version: inner.version,
            entries: inner.entries().collect(),
        }
    }

    pub fn dataset_version(&self) -> u64 {
        self.read().version
    }

    pub fn is_empty(&self) -> bool {
        self.read().players.is_empty()
    }

    /// Projections matching the filter, ordered by the source's fantasy
    /// point total (highest first, missing totals count as zero).
    pub fn get_projections(&self, filter: &ProjectionFilter) -> Vec<PlayerProjection> {
        let inner = self.read();
        let mut out: Vec<PlayerProjection> = inner
            .entries()
            .filter(|e| filter.position.map_or(true, |pos| e.player.position == pos))
            .filter(|e| {
                filter
                    .team
                    .as_deref()
                    .map_or(true, |team| e.player.team.eq_ignore_ascii_case(team.trim()))
            })
            .collect();
        drop(inner);

        sort_by_source_points(&mut out);
        if let Some(limit) = filter.limit {
            out.truncate(limit);
        }
        out
    }

    pub fn get_player_projection(&self, id: PlayerId) -> Option<PlayerProjection> {
        self.read().entry(id)
    }

    /// Case-insensitive substring match on player name, best projected
    /// first.
    pub fn search_players(&self, query: &str, limit: usize) -> Vec<PlayerProjection> {
        let needle = query.trim().to_lowercase();
        let mut out: Vec<PlayerProjection> = self
            .read()
            .entries()
            .filter(|e| e.player.name.to_lowercase().contains(&needle))
            .collect();
        sort_by_source_points(&mut out);
        out.truncate(limit);
        out
    }

    pub fn sources(&self) -> Vec<ProjectionSource> {
        self.read().sources.values().cloned().collect()
    }

    pub fn statistics(&self) -> StoreStatistics {
        let inner = self.read();
        let mut position_breakdown = BTreeMap::new();
        for player in inner.players.values() {
            *position_breakdown.entry(player.position).or_insert(0) += 1;
        }
        StoreStatistics {
            total_players: inner.players.len(),
            total_projections: inner.projections.len(),
            position_breakdown,
            sources: inner.sources.len(),
            last_updated: inner.sources.values().map(|s| s.last_updated).max(),
            dataset_version: inner.version,
        }
    }
}

fn sort_by_source_points(entries: &mut [PlayerProjection]) {
    entries.sort_by(|a, b| {
        b.source_points()
            .partial_cmp(&a.source_points())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
