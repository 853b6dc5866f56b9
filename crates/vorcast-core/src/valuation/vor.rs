// Value Over Replacement (VOR) ranking.
//
// Turns fantasy points into a single position-neutral value: points above
// the replacement level for the player's slot, scaled by a per-position
// scarcity multiplier, then ranked across the whole player pool.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::player::{Player, PlayerId, Position, RosterSlot};
use crate::valuation::replacement::ReplacementLevels;
use crate::valuation::PlayerPoints;

// ---------------------------------------------------------------------------
// Scarcity multipliers
// ---------------------------------------------------------------------------

/// Per-position constants scaling VOR. Positions without an entry use 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScarcityMultipliers(BTreeMap<Position, f64>);

impl ScarcityMultipliers {
    pub fn new(values: BTreeMap<Position, f64>) -> Self {
        ScarcityMultipliers(values)
    }

    /// A multiplier of 1.0 for every position.
    pub fn neutral() -> Self {
        ScarcityMultipliers(BTreeMap::new())
    }

    pub fn get(&self, pos: Position) -> f64 {
        self.0.get(&pos).copied().unwrap_or(1.0)
    }

    pub fn set(&mut self, pos: Position, value: f64) {
        self.0.insert(pos, value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Position, &f64)> {
        self.0.iter()
    }
}

impl Default for ScarcityMultipliers {
    fn default() -> Self {
        let values = [
            (Position::Quarterback, 1.0),
            (Position::RunningBack, 1.2),
            (Position::WideReceiver, 1.2),
            (Position::TightEnd, 1.1),
            (Position::Kicker, 0.8),
            (Position::Defense, 0.8),
        ]
        .into_iter()
        .collect();
        ScarcityMultipliers(values)
    }
}

// ---------------------------------------------------------------------------
// Value tiers
// ---------------------------------------------------------------------------

/// Coarse value buckets by adjusted VOR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ValueTier {
    Elite,
    High,
    Medium,
    Low,
    #[serde(rename = "Below Replacement")]
    BelowReplacement,
}

/// Every tier from best to worst.
pub const ALL_TIERS: &[ValueTier] = &[
    ValueTier::Elite,
    ValueTier::High,
    ValueTier::Medium,
    ValueTier::Low,
    ValueTier::BelowReplacement,
];

impl ValueTier {
    pub fn from_adjusted_vor(adjusted_vor: f64) -> Self {
        if adjusted_vor >= 100.0 {
            ValueTier::Elite
        } else if adjusted_vor >= 50.0 {
            ValueTier::High
        } else if adjusted_vor >= 20.0 {
            ValueTier::Medium
        } else if adjusted_vor >= 0.0 {
            ValueTier::Low
        } else {
            ValueTier::BelowReplacement
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ValueTier::Elite => "Elite",
            ValueTier::High => "High",
            ValueTier::Medium => "Medium",
            ValueTier::Low => "Low",
            ValueTier::BelowReplacement => "Below Replacement",
        }
    }
}

impl fmt::Display for ValueTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ---------------------------------------------------------------------------
// Per-player VOR
// ---------------------------------------------------------------------------

/// A player's full valuation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VorResult {
    pub player: Player,
    pub points: f64,
    pub position_rank: usize,
    /// Replacement level for the player's own position.
    pub replacement_level: f64,
    pub raw_vor: f64,
    /// Points over the FLEX replacement level, for flex-eligible players
    /// when a FLEX level exists.
    pub flex_vor: Option<f64>,
    /// max(raw_vor, flex_vor).
    pub vor: f64,
    pub scarcity_multiplier: f64,
    pub adjusted_vor: f64,
    pub tier: ValueTier,
    /// 1-based rank by adjusted VOR across all players.
    pub overall_rank: usize,
}

/// Compute VOR for a single player. The overall rank is left at 0 until
/// the whole pool is ranked.
pub fn compute_vor(
    entry: &PlayerPoints,
    position_rank: usize,
    levels: &ReplacementLevels,
    scarcity: &ScarcityMultipliers,
    flex_eligible: &[Position],
) -> VorResult {
    let pos = entry.player.position;
    let replacement_level = levels
        .get(&RosterSlot::Position(pos))
        .copied()
        .unwrap_or(0.0);
    let raw_vor = entry.points - replacement_level;

    let flex_vor = if flex_eligible.contains(&pos) {
        levels.get(&RosterSlot::Flex).map(|flex| entry.points - flex)
    } else {
        None
    };
    let vor = flex_vor.map_or(raw_vor, |flex| raw_vor.max(flex));

    let scarcity_multiplier = scarcity.get(pos);
    let adjusted_vor = vor * scarcity_multiplier;

    VorResult {
        player: entry.player.clone(),
        points: entry.points,
        position_rank,
        replacement_level,
        raw_vor,
        flex_vor,
        vor,
        scarcity_multiplier,
        adjusted_vor,
        tier: ValueTier::from_adjusted_vor(adjusted_vor),
        overall_rank: 0,
    }
}

/// Value and rank every player.
///
/// Results are sorted by adjusted VOR descending with a stable sort, so
/// players with equal value keep their input order; `overall_rank` is the
/// 1-based position in that order.
pub fn rank(
    players: &[PlayerPoints],
    position_ranks: &HashMap<PlayerId, usize>,
    levels: &ReplacementLevels,
    scarcity: &ScarcityMultipliers,
    flex_eligible: &[Position],
) -> Vec<VorResult> {
    let mut results: Vec<VorResult> = players
        .iter()
        .map(|entry| {
            let position_rank = position_ranks.get(&entry.player.id).copied().unwrap_or(0);
            compute_vor(entry, position_rank, levels, scarcity, flex_eligible)
        })
        .collect();

    results.sort_by(|a, b| {
        b.adjusted_vor
            .partial_cmp(&a.adjusted_vor)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    for (i, result) in results.iter_mut().enumerate() {
        result.overall_rank = i + 1;
    }

    results
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::DEFAULT_FLEX_ELIGIBLE;
    use proptest::prelude::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn entry(id: PlayerId, position: Position, points: f64) -> PlayerPoints {
        PlayerPoints {
            player: Player {
                id,
                name: format!("Player {id}"),
                position,
                team: "TST".into(),
            },
            points,
        }
    }

    fn levels(pairs: &[(RosterSlot, f64)]) -> ReplacementLevels {
        pairs.iter().copied().collect()
    }

    const RB: RosterSlot = RosterSlot::Position(Position::RunningBack);
    const QB: RosterSlot = RosterSlot::Position(Position::Quarterback);

    // ---- Tiers ----

    #[test]
    fn tier_boundaries() {
        assert_eq!(ValueTier::from_adjusted_vor(100.0), ValueTier::Elite);
        assert_eq!(ValueTier::from_adjusted_vor(99.99), ValueTier::High);
        assert_eq!(ValueTier::from_adjusted_vor(50.0), ValueTier::High);
        assert_eq!(ValueTier::from_adjusted_vor(49.99), ValueTier::Medium);
        assert_eq!(ValueTier::from_adjusted_vor(20.0), ValueTier::Medium);
        assert_eq!(ValueTier::from_adjusted_vor(0.0), ValueTier::Low);
        assert_eq!(ValueTier::from_adjusted_vor(-0.01), ValueTier::BelowReplacement);
    }

    #[test]
    fn tier_serializes_with_label() {
        let json = serde_json::to_string(&ValueTier::BelowReplacement).unwrap();
        assert_eq!(json, "\"Below Replacement\"");
    }

    // ---- compute_vor ----

    #[test]
    fn raw_vor_against_position_level() {
        let lv = levels(&[(QB, 300.0)]);
        let r = compute_vor(
            &entry(1, Position::Quarterback, 340.0),
            1,
            &lv,
            &ScarcityMultipliers::default(),
            DEFAULT_FLEX_ELIGIBLE,
        );
        assert!(approx_eq(r.raw_vor, 40.0));
        assert_eq!(r.flex_vor, None);
        assert!(approx_eq(r.vor, 40.0));
        assert!(approx_eq(r.adjusted_vor, 40.0));
        assert_eq!(r.tier, ValueTier::Medium);
    }

    #[test]
    fn flex_vor_wins_when_flex_level_is_lower() {
        let lv = levels(&[(RB, 200.0), (RosterSlot::Flex, 150.0)]);
        let r = compute_vor(
            &entry(1, Position::RunningBack, 190.0),
            5,
            &lv,
            &ScarcityMultipliers::default(),
            DEFAULT_FLEX_ELIGIBLE,
        );
        assert!(approx_eq(r.raw_vor, -10.0));
        assert_eq!(r.flex_vor, Some(40.0));
        assert!(approx_eq(r.vor, 40.0));
        assert!(approx_eq(r.adjusted_vor, 48.0));
        assert_eq!(r.replacement_level, 200.0);
    }

    #[test]
    fn raw_vor_wins_when_position_level_is_lower() {
        let lv = levels(&[(RB, 100.0), (RosterSlot::Flex, 150.0)]);
        let r = compute_vor(
            &entry(1, Position::RunningBack, 190.0),
            1,
            &lv,
            &ScarcityMultipliers::neutral(),
            DEFAULT_FLEX_ELIGIBLE,
        );
        assert!(approx_eq(r.vor, 90.0));
    }

    #[test]
    fn ineligible_position_ignores_flex() {
        let lv = levels(&[(QB, 300.0), (RosterSlot::Flex, 100.0)]);
        let r = compute_vor(
            &entry(1, Position::Quarterback, 280.0),
            2,
            &lv,
            &ScarcityMultipliers::default(),
            DEFAULT_FLEX_ELIGIBLE,
        );
        assert_eq!(r.flex_vor, None);
        assert!(approx_eq(r.vor, -20.0));
        assert_eq!(r.tier, ValueTier::BelowReplacement);
    }

    #[test]
    fn missing_level_uses_zero_baseline() {
        let r = compute_vor(
            &entry(1, Position::Kicker, 120.0),
            1,
            &ReplacementLevels::new(),
            &ScarcityMultipliers::default(),
            DEFAULT_FLEX_ELIGIBLE,
        );
        assert_eq!(r.replacement_level, 0.0);
        assert!(approx_eq(r.adjusted_vor, 96.0));
    }

    #[test]
    fn unset_multiplier_is_neutral() {
        let mut scarcity = ScarcityMultipliers::neutral();
        scarcity.set(Position::TightEnd, 1.5);
        assert_eq!(scarcity.get(Position::TightEnd), 1.5);
        assert_eq!(scarcity.get(Position::Kicker), 1.0);
    }

    // ---- rank ----

    #[test]
    fn rank_sorts_by_adjusted_vor() {
        let players = vec![
            entry(1, Position::Quarterback, 320.0),
            entry(2, Position::RunningBack, 260.0),
            entry(3, Position::Kicker, 140.0),
        ];
        let lv = levels(&[(QB, 300.0), (RB, 200.0)]);
        let ranks: HashMap<PlayerId, usize> = [(1, 1), (2, 1), (3, 1)].into_iter().collect();
        let results = rank(
            &players,
            &ranks,
            &lv,
            &ScarcityMultipliers::default(),
            DEFAULT_FLEX_ELIGIBLE,
        );
        let ids: Vec<PlayerId> = results.iter().map(|r| r.player.id).collect();
        // K: 140 * 0.8 = 112, RB: 60 * 1.2 = 72, QB: 20
        assert_eq!(ids, vec![3, 2, 1]);
        let overall: Vec<usize> = results.iter().map(|r| r.overall_rank).collect();
        assert_eq!(overall, vec![1, 2, 3]);
    }

    #[test]
    fn rank_ties_keep_input_order() {
        let players = vec![
            entry(4, Position::WideReceiver, 200.0),
            entry(2, Position::WideReceiver, 200.0),
            entry(9, Position::WideReceiver, 200.0),
        ];
        let results = rank(
            &players,
            &HashMap::new(),
            &ReplacementLevels::new(),
            &ScarcityMultipliers::default(),
            DEFAULT_FLEX_ELIGIBLE,
        );
        let ids: Vec<PlayerId> = results.iter().map(|r| r.player.id).collect();
        assert_eq!(ids, vec![4, 2, 9]);
    }

    #[test]
    fn rank_empty_pool() {
        let results = rank(
            &[],
            &HashMap::new(),
            &ReplacementLevels::new(),
            &ScarcityMultipliers::default(),
            DEFAULT_FLEX_ELIGIBLE,
        );
        assert!(results.is_empty());
    }

    proptest! {
        #[test]
        fn overall_rank_is_a_permutation(points in proptest::collection::vec(-50.0f64..400.0, 0..60)) {
            let positions = [
                Position::Quarterback,
                Position::RunningBack,
                Position::WideReceiver,
                Position::TightEnd,
                Position::Kicker,
                Position::Defense,
            ];
            let players: Vec<PlayerPoints> = points
                .iter()
                .enumerate()
                .map(|(i, &p)| entry(i as PlayerId + 1, positions[i % positions.len()], p))
                .collect();
            let lv = levels(&[(QB, 250.0), (RB, 150.0), (RosterSlot::Flex, 120.0)]);
            let results = rank(
                &players,
                &HashMap::new(),
                &lv,
                &ScarcityMultipliers::default(),
                DEFAULT_FLEX_ELIGIBLE,
            );

            let mut ranks: Vec<usize> = results.iter().map(|r| r.overall_rank).collect();
            ranks.sort_unstable();
            let expected: Vec<usize> = (1..=players.len()).collect();
            prop_assert_eq!(ranks, expected);

            for pair in results.windows(2) {
                prop_assert!(pair[0].adjusted_vor >= pair[1].adjusted_vor);
            }
        }
    }
}
