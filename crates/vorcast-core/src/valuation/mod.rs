// Valuation engine: fantasy points -> replacement levels -> VOR rankings,
// plus draft targets derived from the rankings.

pub mod replacement;
pub mod targets;
pub mod vor;

use std::collections::HashSet;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{ConfigError, LeagueConfig, ValuationConfig};
use crate::player::{Player, PlayerId, Position};
use crate::scoring::{score, ScoreStatus, ScoringError};
use crate::store::{ProjectionStore, StoreSnapshot};

use self::replacement::{
    compute_replacement_levels, position_rankings, PositionRankings, ReplacementLevels,
    RosterConstruction,
};
use self::targets::DraftTargets;
use self::vor::{ValueTier, VorResult, ALL_TIERS};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum RankingError {
    #[error("no projection data loaded")]
    NoData,

    #[error("cannot score {player}: {source}")]
    Scoring { player: String, source: ScoringError },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid draft slot: round {round}, slot {slot} in a {num_teams}-team league")]
    InvalidDraftSlot {
        round: usize,
        slot: usize,
        num_teams: usize,
    },
}

// ---------------------------------------------------------------------------
// Pipeline types
// ---------------------------------------------------------------------------

/// A player with their fantasy point total under the league's rules.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerPoints {
    pub player: Player,
    pub points: f64,
}

/// Per-request ranking parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankingRequest {
    pub num_teams: usize,
    pub include_flex: bool,
}

impl RankingRequest {
    /// The league's own size and the configured FLEX setting.
    pub fn for_league(league: &LeagueConfig, valuation: &ValuationConfig) -> Self {
        RankingRequest {
            num_teams: league.num_teams,
            include_flex: valuation.include_flex,
        }
    }
}

/// Complete ranking output for one dataset version.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VorReport {
    /// Every player, best adjusted VOR first.
    pub rankings: Vec<VorResult>,
    pub position_rankings: PositionRankings,
    pub replacement_levels: ReplacementLevels,
    pub roster_construction: RosterConstruction,
    pub total_players: usize,
    pub num_teams: usize,
    pub dataset_version: u64,
}

/// Gap between the best player in a comparison and another player.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueDifference {
    pub player_id: PlayerId,
    pub name: String,
    pub vor_difference: f64,
    pub adjusted_vor_difference: f64,
    pub points_difference: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerComparison {
    /// Requested players, best adjusted VOR first.
    pub players: Vec<VorResult>,
    pub best_value: Option<VorResult>,
    pub differences: Vec<ValueDifference>,
    /// Requested ids with no ranking entry.
    pub not_found: Vec<PlayerId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierGroup {
    pub tier: ValueTier,
    pub count: usize,
    pub players: Vec<VorResult>,
}

// ---------------------------------------------------------------------------
// Scoring the pool
// ---------------------------------------------------------------------------

/// Score every projection in the snapshot, in player-id order.
///
/// A projection with no scoreable stats falls back to the source's own
/// point total (or zero). Any malformed projection fails the whole call.
pub fn players_with_points(
    snapshot: &StoreSnapshot,
    league: &LeagueConfig,
) -> Result<Vec<PlayerPoints>, RankingError> {
    snapshot
        .entries
        .iter()
        .map(|entry| {
            let scored =
                score(&entry.projection, &league.scoring).map_err(|source| RankingError::Scoring {
                    player: entry.player.name.clone(),
                    source,
                })?;
            let points = match scored.status {
                ScoreStatus::Scored => scored.total,
                ScoreStatus::NoScoreableStats => entry.projection.source_points.unwrap_or(0.0),
            };
            Ok(PlayerPoints {
                player: entry.player.clone(),
                points,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Pipeline entry points
// ---------------------------------------------------------------------------

/// Rank every player in the store.
///
/// 1. Snapshot the store and score each projection under the league rules.
/// 2. Rank players within their positions.
/// 3. Build league-wide roster construction and replacement levels.
/// 4. Compute VOR for every player and rank by adjusted VOR.
pub fn calculate_vor_rankings(
    store: &ProjectionStore,
    league: &LeagueConfig,
    valuation: &ValuationConfig,
    request: RankingRequest,
) -> Result<VorReport, RankingError> {
    if request.num_teams == 0 {
        return Err(ConfigError::ValidationError {
            field: "num_teams".into(),
            message: "must be greater than 0".into(),
        }
        .into());
    }

    let snapshot = store.snapshot();
    if snapshot.entries.is_empty() {
        return Err(RankingError::NoData);
    }

    let players = players_with_points(&snapshot, league)?;
    let rankings = position_rankings(&players);
    let roster = league.roster_construction(request.num_teams, request.include_flex)?;
    let levels = compute_replacement_levels(&rankings, &roster, valuation.replacement_baseline);
    debug!("replacement levels: {:?}", levels);

    let results = vor::rank(
        &players,
        &rankings.rank_index(),
        &levels,
        &valuation.scarcity,
        &roster.flex_eligible,
    );

    info!(
        "ranked {} players for {} teams (dataset version {})",
        results.len(),
        request.num_teams,
        snapshot.dataset_version
    );

    Ok(VorReport {
        total_players: results.len(),
        rankings: results,
        position_rankings: rankings,
        replacement_levels: levels,
        roster_construction: roster,
        num_teams: request.num_teams,
        dataset_version: snapshot.dataset_version,
    })
}

/// Rank the store and return likely targets for a snake-draft pick.
pub fn get_draft_targets(
    store: &ProjectionStore,
    league: &LeagueConfig,
    valuation: &ValuationConfig,
    round: usize,
    slot: usize,
    num_teams: usize,
) -> Result<DraftTargets, RankingError> {
    let request = RankingRequest {
        num_teams,
        include_flex: valuation.include_flex,
    };
    // Validate the pick before doing the ranking work.
    targets::overall_pick(round, slot, num_teams)?;
    let report = calculate_vor_rankings(store, league, valuation, request)?;
    targets::draft_targets(round, slot, &report.rankings, num_teams)
}

// ---------------------------------------------------------------------------
// Report views
// ---------------------------------------------------------------------------

impl VorReport {
    pub fn get(&self, id: PlayerId) -> Option<&VorResult> {
        self.rankings.iter().find(|r| r.player.id == id)
    }

    /// Results at one position in overall order.
    pub fn get_position_rankings(&self, position: Position, limit: Option<usize>) -> Vec<VorResult> {
        self.rankings
            .iter()
            .filter(|r| r.player.position == position)
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    /// Side-by-side values for a set of players. Unknown ids are listed in
    /// `not_found` rather than failing the comparison; repeated ids count
    /// once.
    pub fn compare_players(&self, ids: &[PlayerId]) -> PlayerComparison {
        let mut players = Vec::new();
        let mut not_found = Vec::new();
        let mut seen = HashSet::new();
        for &id in ids.iter().filter(|id| seen.insert(**id)) {
            match self.get(id) {
                Some(r) => players.push(r.clone()),
                None => not_found.push(id),
            }
        }
        players.sort_by(|a, b| {
            b.adjusted_vor
                .partial_cmp(&a.adjusted_vor)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let best_value = players.first().cloned();
        let differences = match &best_value {
            Some(best) => players
                .iter()
                .skip(1)
                .map(|other| ValueDifference {
                    player_id: other.player.id,
                    name: other.player.name.clone(),
                    vor_difference: best.vor - other.vor,
                    adjusted_vor_difference: best.adjusted_vor - other.adjusted_vor,
                    points_difference: best.points - other.points,
                })
                .collect(),
            None => Vec::new(),
        };

        PlayerComparison {
            players,
            best_value,
            differences,
            not_found,
        }
    }

    /// Results grouped by value tier, best tier first. Every tier is
    /// listed, including empty ones.
    pub fn value_tiers(&self) -> Vec<TierGroup> {
        ALL_TIERS
            .iter()
            .map(|&tier| {
                let players: Vec<VorResult> = self
                    .rankings
                    .iter()
                    .filter(|r| r.tier == tier)
                    .cloned()
                    .collect();
                TierGroup {
                    tier,
                    count: players.len(),
                    players,
                }
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
