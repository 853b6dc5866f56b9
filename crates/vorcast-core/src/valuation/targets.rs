// Draft targets for a snake-draft pick.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::player::Position;
use crate::valuation::vor::VorResult;
use crate::valuation::RankingError;

/// Picks before ours that we assume the rest of the league may reach past.
pub const AVAILABILITY_BUFFER: usize = 5;

/// Number of overall targets reported.
pub const TOP_TARGETS: usize = 10;

/// Number of likely-available players grouped into the per-position view.
pub const POSITION_TARGET_POOL: usize = 20;

/// Likely targets at a draft slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DraftTargets {
    pub round: usize,
    pub slot: usize,
    pub overall_pick: usize,
    pub top_targets: Vec<VorResult>,
    pub targets_by_position: BTreeMap<Position, Vec<VorResult>>,
}

/// Overall pick number for a round and slot in a snake draft.
///
/// Odd rounds run 1..T, even rounds run T..1.
pub fn overall_pick(round: usize, slot: usize, num_teams: usize) -> Result<usize, RankingError> {
    let invalid = || RankingError::InvalidDraftSlot {
        round,
        slot,
        num_teams,
    };
    if round == 0 || slot == 0 || slot > num_teams {
        return Err(invalid());
    }

    let in_round = if round % 2 == 1 {
        slot
    } else {
        num_teams - slot + 1
    };
    (round - 1)
        .checked_mul(num_teams)
        .and_then(|before| before.checked_add(in_round))
        .ok_or_else(invalid)
}

/// Players likely to still be on the board at the given pick.
///
/// A player counts as likely available when their overall rank is no
/// better than `AVAILABILITY_BUFFER` picks ahead of ours. This is a coarse
/// heuristic, not a simulation of other teams' choices.
pub fn draft_targets(
    round: usize,
    slot: usize,
    rankings: &[VorResult],
    num_teams: usize,
) -> Result<DraftTargets, RankingError> {
    let pick = overall_pick(round, slot, num_teams)?;
    let threshold = pick.saturating_sub(AVAILABILITY_BUFFER);

    let available: Vec<&VorResult> = rankings
        .iter()
        .filter(|r| r.overall_rank >= threshold)
        .collect();

    let mut targets_by_position: BTreeMap<Position, Vec<VorResult>> = BTreeMap::new();
    for r in available.iter().take(POSITION_TARGET_POOL) {
        targets_by_position
            .entry(r.player.position)
            .or_default()
            .push((*r).clone());
    }

    let top_targets = available
        .iter()
        .take(TOP_TARGETS)
        .map(|r| (*r).clone())
        .collect();

    Ok(DraftTargets {
        round,
        slot,
        overall_pick: pick,
        top_targets,
        targets_by_position,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::{Player, PlayerId};
    use crate::valuation::vor::ValueTier;

    fn result(id: PlayerId, position: Position, overall_rank: usize) -> VorResult {
        let adjusted_vor = 200.0 - overall_rank as f64;
        VorResult {
            player: Player {
                id,
                name: format!("Player {id}"),
                position,
                team: "TST".into(),
            },
            points: adjusted_vor,
            position_rank: 1,
            replacement_level: 0.0,
            raw_vor: adjusted_vor,
            flex_vor: None,
            vor: adjusted_vor,
            scarcity_multiplier: 1.0,
            adjusted_vor,
            tier: ValueTier::from_adjusted_vor(adjusted_vor),
            overall_rank,
        }
    }

    fn board(count: usize) -> Vec<VorResult> {
        let positions = [Position::RunningBack, Position::WideReceiver, Position::Quarterback];
        (1..=count)
            .map(|rank| result(rank as PlayerId, positions[rank % positions.len()], rank))
            .collect()
    }

    #[test]
    fn snake_numbering() {
        assert_eq!(overall_pick(1, 1, 12).unwrap(), 1);
        assert_eq!(overall_pick(1, 12, 12).unwrap(), 12);
        assert_eq!(overall_pick(2, 1, 12).unwrap(), 24);
        assert_eq!(overall_pick(2, 12, 12).unwrap(), 13);
        assert_eq!(overall_pick(3, 1, 12).unwrap(), 25);
    }

    #[test]
    fn invalid_slots_rejected() {
        for (round, slot) in [(0, 1), (1, 0), (1, 13)] {
            let err = overall_pick(round, slot, 12).unwrap_err();
            assert!(matches!(err, RankingError::InvalidDraftSlot { .. }), "({round}, {slot})");
        }
        assert!(draft_targets(1, 13, &board(5), 12).is_err());
    }

    #[test]
    fn pick_number_overflow_rejected() {
        let err = overall_pick(usize::MAX / 2, 1, 12).unwrap_err();
        assert!(matches!(err, RankingError::InvalidDraftSlot { .. }));
        assert!(draft_targets(usize::MAX, 12, &board(5), 12).is_err());
        assert_eq!(overall_pick(usize::MAX, 1, 1).unwrap(), usize::MAX);
    }

    #[test]
    fn first_pick_sees_whole_board() {
        let targets = draft_targets(1, 1, &board(30), 12).unwrap();
        assert_eq!(targets.overall_pick, 1);
        assert_eq!(targets.top_targets.len(), TOP_TARGETS);
        assert_eq!(targets.top_targets[0].overall_rank, 1);
        let grouped: usize = targets.targets_by_position.values().map(Vec::len).sum();
        assert_eq!(grouped, POSITION_TARGET_POOL);
    }

    #[test]
    fn later_pick_skips_players_gone_before_the_buffer() {
        // Round 2, slot 1 of 12 is pick 24; ranks >= 19 are likely available.
        let targets = draft_targets(2, 1, &board(60), 12).unwrap();
        assert_eq!(targets.overall_pick, 24);
        assert_eq!(targets.top_targets[0].overall_rank, 19);
        assert!(targets.top_targets.iter().all(|r| r.overall_rank >= 19));
    }

    #[test]
    fn position_groups_preserve_rank_order() {
        let targets = draft_targets(1, 6, &board(40), 12).unwrap();
        for group in targets.targets_by_position.values() {
            for pair in group.windows(2) {
                assert!(pair[0].overall_rank < pair[1].overall_rank);
            }
        }
    }

    #[test]
    fn thin_board_returns_what_is_left() {
        let targets = draft_targets(3, 4, &board(30), 12).unwrap();
        // Pick 28, threshold 23: ranks 23..=30 remain.
        assert_eq!(targets.top_targets.len(), 8);

        let empty = draft_targets(10, 1, &board(30), 12).unwrap();
        assert!(empty.top_targets.is_empty());
        assert!(empty.targets_by_position.is_empty());
    }
}
