// Replacement-level computation.
//
// A player's value is measured against the best player who could still be
// had for the same kind of roster slot. For each position that is the player
// at the league-wide starter cutoff; for FLEX it is the cutoff within the
// pool of flex-eligible players left over after every dedicated slot is
// filled.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::player::{Player, PlayerId, Position, RosterSlot, DEFAULT_FLEX_ELIGIBLE};
use crate::valuation::PlayerPoints;

// ---------------------------------------------------------------------------
// Roster construction
// ---------------------------------------------------------------------------

/// Which ranked player defines the replacement level for N starter slots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplacementBaseline {
    /// The N-th ranked player: the last starter sets the baseline, so the
    /// last starter's VOR is exactly zero.
    #[default]
    LastStarter,
    /// The (N+1)-th ranked player: the first player who misses out on a
    /// starting slot sets the baseline.
    FirstReplacement,
}

impl ReplacementBaseline {
    /// Zero-based index into a descending list for `slots` starters, or
    /// `None` when there is no starter to measure against.
    fn cutoff_index(&self, slots: usize) -> Option<usize> {
        match self {
            ReplacementBaseline::LastStarter => slots.checked_sub(1),
            ReplacementBaseline::FirstReplacement => Some(slots),
        }
    }
}

/// League-wide starter slots per roster slot type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RosterConstruction {
    pub slots: BTreeMap<RosterSlot, usize>,
    /// Positions allowed to fill FLEX.
    pub flex_eligible: Vec<Position>,
}

impl RosterConstruction {
    /// Scale per-team starter counts to the whole league. The FLEX entry is
    /// kept only when `include_flex` is set. `None` when a league-wide count
    /// overflows.
    pub fn from_per_team(
        per_team: &BTreeMap<RosterSlot, usize>,
        num_teams: usize,
        include_flex: bool,
        flex_eligible: &[Position],
    ) -> Option<Self> {
        let slots = per_team
            .iter()
            .filter(|(slot, _)| include_flex || **slot != RosterSlot::Flex)
            .map(|(&slot, &count)| Some((slot, count.checked_mul(num_teams)?)))
            .collect::<Option<_>>()?;

        Some(RosterConstruction {
            slots,
            flex_eligible: flex_eligible.to_vec(),
        })
    }

    /// Use explicit league-wide counts as given.
    pub fn league_wide(slots: BTreeMap<RosterSlot, usize>, flex_eligible: &[Position]) -> Self {
        RosterConstruction {
            slots,
            flex_eligible: flex_eligible.to_vec(),
        }
    }

    pub fn slots_for(&self, slot: RosterSlot) -> Option<usize> {
        self.slots.get(&slot).copied()
    }

    pub fn has_flex(&self) -> bool {
        self.slots.contains_key(&RosterSlot::Flex)
    }

}

impl Default for RosterConstruction {
    /// One QB, two RB, two WR, one TE, one FLEX, one K and one DST for a
    /// single team.
    fn default() -> Self {
        let slots = [
            (RosterSlot::Position(Position::Quarterback), 1),
            (RosterSlot::Position(Position::RunningBack), 2),
            (RosterSlot::Position(Position::WideReceiver), 2),
            (RosterSlot::Position(Position::TightEnd), 1),
            (RosterSlot::Flex, 1),
            (RosterSlot::Position(Position::Kicker), 1),
            (RosterSlot::Position(Position::Defense), 1),
        ]
        .into_iter()
        .collect();
        RosterConstruction::league_wide(slots, DEFAULT_FLEX_ELIGIBLE)
    }
}

// ---------------------------------------------------------------------------
// Position rankings
// ---------------------------------------------------------------------------

/// A player's place in their own position's point ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedPlayer {
    pub player: Player,
    pub points: f64,
    /// 1-based rank within the position.
    pub position_rank: usize,
}

/// Players grouped by position, each group sorted by points descending.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PositionRankings {
    by_position: BTreeMap<Position, Vec<RankedPlayer>>,
}

impl PositionRankings {
    /// Group and sort. The sort is stable, so equal point totals keep their
    /// input order.
    pub fn build(players: &[PlayerPoints]) -> Self {
        let mut grouped: BTreeMap<Position, Vec<&PlayerPoints>> = BTreeMap::new();
        for p in players {
            grouped.entry(p.player.position).or_default().push(p);
        }

        let by_position = grouped
            .into_iter()
            .map(|(pos, mut group)| {
                group.sort_by(|a, b| {
                    b.points
                        .partial_cmp(&a.points)
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
                let ranked = group
                    .into_iter()
                    .enumerate()
                    .map(|(i, p)| RankedPlayer {
                        player: p.player.clone(),
                        points: p.points,
                        position_rank: i + 1,
                    })
                    .collect();
                (pos, ranked)
            })
            .collect();

        PositionRankings { by_position }
    }

    pub fn get(&self, pos: Position) -> &[RankedPlayer] {
        self.by_position.get(&pos).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Map of player id to position rank.
    pub fn rank_index(&self) -> HashMap<PlayerId, usize> {
        self.by_position
            .values()
            .flatten()
            .map(|r| (r.player.id, r.position_rank))
            .collect()
    }
}

/// Build per-position rankings from scored players.
pub fn position_rankings(players: &[PlayerPoints]) -> PositionRankings {
    PositionRankings::build(players)
}

// ---------------------------------------------------------------------------
// Replacement levels
// ---------------------------------------------------------------------------

/// Fantasy points of the replacement-level player per roster slot type.
pub type ReplacementLevels = BTreeMap<RosterSlot, f64>;

/// Replacement level for `slots` starters drawn from a descending list.
///
/// When the list is shorter than the cutoff the weakest available player is
/// used; an empty list yields zero. Zero slots under the last-starter rule
/// also yield zero.
fn level_at(points_desc: &[f64], slots: usize, baseline: ReplacementBaseline) -> f64 {
    let Some(idx) = baseline.cutoff_index(slots) else {
        return 0.0;
    };
    points_desc
        .get(idx)
        .or(points_desc.last())
        .copied()
        .unwrap_or(0.0)
}

/// Determine the replacement level for every slot type in the roster.
///
/// Algorithm:
/// 1. For each concrete position with N league-wide slots, take the cutoff
///    player from that position's ranking (see `ReplacementBaseline`).
/// 2. For FLEX, pool the players of each flex-eligible position ranked
///    beyond that position's own N slots, sort the pool by points
///    descending, and take the cutoff with N = FLEX slots.
///
/// Positions absent from the roster get no entry.
pub fn compute_replacement_levels(
    rankings: &PositionRankings,
    roster: &RosterConstruction,
    baseline: ReplacementBaseline,
) -> ReplacementLevels {
    let mut levels = ReplacementLevels::new();

    for (&slot, &count) in &roster.slots {
        let RosterSlot::Position(pos) = slot else {
            continue;
        };
        let points: Vec<f64> = rankings.get(pos).iter().map(|r| r.points).collect();
        levels.insert(slot, level_at(&points, count, baseline));
    }

    if let Some(flex_slots) = roster.slots_for(RosterSlot::Flex) {
        let mut pool: Vec<f64> = Vec::new();
        for &pos in &roster.flex_eligible {
            let dedicated = roster.slots_for(RosterSlot::Position(pos)).unwrap_or(0);
            let overflow = rankings.get(pos).get(dedicated..).unwrap_or(&[]);
            pool.extend(overflow.iter().map(|r| r.points));
        }
        pool.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
        levels.insert(RosterSlot::Flex, level_at(&pool, flex_slots, baseline));
    }

    levels
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn make_player(id: PlayerId, position: Position, points: f64) -> PlayerPoints {
        PlayerPoints {
            player: Player {
                id,
                name: format!("{}{}", position, id),
                position,
                team: "TST".into(),
            },
            points,
        }
    }

    fn qb_pool(points: &[f64]) -> Vec<PlayerPoints> {
        points
            .iter()
            .enumerate()
            .map(|(i, &p)| make_player(i as PlayerId + 1, Position::Quarterback, p))
            .collect()
    }

    fn qb_roster(slots: usize) -> RosterConstruction {
        let mut map = BTreeMap::new();
        map.insert(RosterSlot::Position(Position::Quarterback), slots);
        RosterConstruction::league_wide(map, DEFAULT_FLEX_ELIGIBLE)
    }

    const QB: RosterSlot = RosterSlot::Position(Position::Quarterback);

    // ---- Position rankings ----

    #[test]
    fn rankings_sorted_descending_with_ranks() {
        let rankings = PositionRankings::build(&qb_pool(&[250.0, 300.0, 280.0]));
        let qbs = rankings.get(Position::Quarterback);
        let points: Vec<f64> = qbs.iter().map(|r| r.points).collect();
        assert_eq!(points, vec![300.0, 280.0, 250.0]);
        let ranks: Vec<usize> = qbs.iter().map(|r| r.position_rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[test]
    fn ranking_ties_keep_input_order() {
        let rankings = PositionRankings::build(&qb_pool(&[200.0, 200.0, 200.0]));
        let ids: Vec<PlayerId> = rankings
            .get(Position::Quarterback)
            .iter()
            .map(|r| r.player.id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    // ---- Last-starter baseline ----

    #[test]
    fn nth_player_with_enough_players() {
        let rankings = PositionRankings::build(&qb_pool(&[300.0, 280.0, 260.0, 240.0]));
        let levels = compute_replacement_levels(&rankings, &qb_roster(3), ReplacementBaseline::LastStarter);
        assert!(approx_eq(levels[&QB], 260.0));
    }

    #[test]
    fn exactly_n_players_uses_nth() {
        let rankings = PositionRankings::build(&qb_pool(&[300.0, 280.0, 260.0]));
        let levels = compute_replacement_levels(&rankings, &qb_roster(3), ReplacementBaseline::LastStarter);
        assert!(approx_eq(levels[&QB], 260.0));
    }

    #[test]
    fn n_minus_one_players_uses_lowest() {
        let rankings = PositionRankings::build(&qb_pool(&[300.0, 280.0]));
        let levels = compute_replacement_levels(&rankings, &qb_roster(3), ReplacementBaseline::LastStarter);
        assert!(approx_eq(levels[&QB], 280.0));
    }

    #[test]
    fn no_players_at_position_is_zero() {
        let rankings = PositionRankings::build(&[]);
        let levels = compute_replacement_levels(&rankings, &qb_roster(2), ReplacementBaseline::LastStarter);
        assert_eq!(levels[&QB], 0.0);
    }

    #[test]
    fn single_slot_last_starter_is_top_player() {
        let rankings = PositionRankings::build(&qb_pool(&[300.0, 280.0, 260.0]));
        let levels = compute_replacement_levels(&rankings, &qb_roster(1), ReplacementBaseline::LastStarter);
        assert!(approx_eq(levels[&QB], 300.0));
    }

    // ---- First-replacement baseline ----

    #[test]
    fn single_slot_first_replacement_is_second_player() {
        let rankings = PositionRankings::build(&qb_pool(&[300.0, 280.0, 260.0]));
        let levels =
            compute_replacement_levels(&rankings, &qb_roster(1), ReplacementBaseline::FirstReplacement);
        assert!(approx_eq(levels[&QB], 280.0));
    }

    #[test]
    fn first_replacement_with_exactly_n_players_uses_lowest() {
        let rankings = PositionRankings::build(&qb_pool(&[300.0, 280.0]));
        let levels =
            compute_replacement_levels(&rankings, &qb_roster(2), ReplacementBaseline::FirstReplacement);
        assert!(approx_eq(levels[&QB], 280.0));
    }

    #[test]
    fn zero_slots() {
        let rankings = PositionRankings::build(&qb_pool(&[300.0, 280.0]));
        let last = compute_replacement_levels(&rankings, &qb_roster(0), ReplacementBaseline::LastStarter);
        assert_eq!(last[&QB], 0.0);
        let first =
            compute_replacement_levels(&rankings, &qb_roster(0), ReplacementBaseline::FirstReplacement);
        assert!(approx_eq(first[&QB], 300.0));
    }

    // ---- FLEX ----

    fn flex_fixture() -> Vec<PlayerPoints> {
        let mut players = Vec::new();
        let mut id = 1;
        for &pts in &[250.0, 220.0, 180.0, 150.0] {
            players.push(make_player(id, Position::RunningBack, pts));
            id += 1;
        }
        for &pts in &[240.0, 200.0, 170.0, 160.0] {
            players.push(make_player(id, Position::WideReceiver, pts));
            id += 1;
        }
        for &pts in &[190.0, 140.0] {
            players.push(make_player(id, Position::TightEnd, pts));
            id += 1;
        }
        players.push(make_player(id, Position::Quarterback, 400.0));
        players
    }

    fn flex_roster(flex: usize) -> RosterConstruction {
        let mut map = BTreeMap::new();
        map.insert(RosterSlot::Position(Position::RunningBack), 2);
        map.insert(RosterSlot::Position(Position::WideReceiver), 2);
        map.insert(RosterSlot::Position(Position::TightEnd), 1);
        map.insert(RosterSlot::Flex, flex);
        RosterConstruction::league_wide(map, DEFAULT_FLEX_ELIGIBLE)
    }

    #[test]
    fn flex_pool_is_overflow_of_eligible_positions() {
        // Overflow: RB [180, 150], WR [170, 160], TE [140]
        // Pool sorted: 180, 170, 160, 150, 140
        let rankings = PositionRankings::build(&flex_fixture());
        let levels = compute_replacement_levels(&rankings, &flex_roster(2), ReplacementBaseline::LastStarter);
        assert!(approx_eq(levels[&RosterSlot::Flex], 170.0));
        assert!(approx_eq(levels[&RosterSlot::Position(Position::RunningBack)], 220.0));
        assert!(approx_eq(levels[&RosterSlot::Position(Position::TightEnd)], 190.0));

        let first =
            compute_replacement_levels(&rankings, &flex_roster(2), ReplacementBaseline::FirstReplacement);
        assert!(approx_eq(first[&RosterSlot::Flex], 160.0));
    }

    #[test]
    fn flex_larger_than_pool_uses_weakest() {
        let rankings = PositionRankings::build(&flex_fixture());
        let levels = compute_replacement_levels(&rankings, &flex_roster(10), ReplacementBaseline::LastStarter);
        assert!(approx_eq(levels[&RosterSlot::Flex], 140.0));
    }

    #[test]
    fn flex_ignores_ineligible_positions() {
        let rankings = PositionRankings::build(&flex_fixture());
        let levels = compute_replacement_levels(&rankings, &flex_roster(1), ReplacementBaseline::LastStarter);
        // The QB at 400 never enters the pool.
        assert!(approx_eq(levels[&RosterSlot::Flex], 180.0));
    }

    #[test]
    fn empty_flex_pool_is_zero() {
        let rankings = PositionRankings::build(&qb_pool(&[300.0]));
        let levels = compute_replacement_levels(&rankings, &flex_roster(1), ReplacementBaseline::LastStarter);
        assert_eq!(levels[&RosterSlot::Flex], 0.0);
    }

    #[test]
    fn positions_without_slots_have_no_level() {
        let rankings = PositionRankings::build(&flex_fixture());
        let levels = compute_replacement_levels(&rankings, &flex_roster(1), ReplacementBaseline::LastStarter);
        assert!(!levels.contains_key(&QB));
    }

    // ---- Roster construction ----

    #[test]
    fn per_team_counts_scale_by_league_size() {
        let per_team = RosterConstruction::default().slots;
        let roster = RosterConstruction::from_per_team(&per_team, 12, true, DEFAULT_FLEX_ELIGIBLE).unwrap();
        assert_eq!(roster.slots_for(QB), Some(12));
        assert_eq!(roster.slots_for(RosterSlot::Position(Position::RunningBack)), Some(24));
        assert_eq!(roster.slots_for(RosterSlot::Flex), Some(12));
    }

    #[test]
    fn flex_dropped_when_not_requested() {
        let per_team = RosterConstruction::default().slots;
        let roster = RosterConstruction::from_per_team(&per_team, 12, false, DEFAULT_FLEX_ELIGIBLE).unwrap();
        assert!(!roster.has_flex());
        assert_eq!(roster.slots_for(RosterSlot::Position(Position::Defense)), Some(12));
    }

    #[test]
    fn league_wide_count_overflow_is_none() {
        let per_team = RosterConstruction::default().slots;
        assert!(RosterConstruction::from_per_team(&per_team, usize::MAX, true, DEFAULT_FLEX_ELIGIBLE).is_none());
        assert!(RosterConstruction::from_per_team(&per_team, usize::MAX, false, &[]).is_none());
    }
}
