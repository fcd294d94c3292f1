//! Invariant audits for a trial's shared state. Always compiled; callers
//! decide whether a reported violation is fatal.

use core::fmt;

use crate::belief::OddsModel;
use crate::model::assignment::HiddenAssignment;
use crate::model::knowledge::KnowledgeStore;

/// Tolerance for the doubly-stochastic row/column sums.
pub const ODDS_EPSILON: f64 = 1e-4;

#[derive(Debug, Clone, PartialEq)]
pub enum Violation {
    /// Match and miss bit both set for the same pair.
    OverlappingBits { left: usize, right: usize },
    /// More than one match bit set in a row.
    MultipleMatches { left: usize },
    /// Two left items both claim the same right item.
    DuplicateMatch { right: usize, first: usize, second: usize },
    /// A proven match whose column is not missed by every other row.
    UnpropagatedMatch { left: usize, right: usize },
    RowSum { left: usize, sum: f64 },
    ColumnSum { right: usize, sum: f64 },
    /// Odds entry not pinned to 1/0 for a proven pair, or out of range.
    UnpinnedOdds { left: usize, right: usize, value: f64 },
    /// Recorded knowledge that contradicts the hidden assignment.
    TruthConflict { left: usize, right: usize },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::OverlappingBits { left, right } => {
                write!(f, "pair ({left}, {right}) has both match and miss bits set")
            }
            Violation::MultipleMatches { left } => {
                write!(f, "left item {left} has more than one proven match")
            }
            Violation::DuplicateMatch { right, first, second } => {
                write!(f, "right item {right} matched to both {first} and {second}")
            }
            Violation::UnpropagatedMatch { left, right } => {
                write!(
                    f,
                    "match ({left}, {right}) not propagated as a miss to every other row"
                )
            }
            Violation::RowSum { left, sum } => {
                write!(f, "row {left} odds sum to {sum}")
            }
            Violation::ColumnSum { right, sum } => {
                write!(f, "column {right} odds sum to {sum}")
            }
            Violation::UnpinnedOdds { left, right, value } => {
                write!(f, "odds for proven pair ({left}, {right}) is {value}")
            }
            Violation::TruthConflict { left, right } => {
                write!(
                    f,
                    "recorded knowledge for ({left}, {right}) contradicts the hidden assignment"
                )
            }
        }
    }
}

/// Audit the knowledge bitmasks, the odds matrix (when a belief model is
/// active) and, when handed the hidden assignment, agreement with it.
pub fn validate(
    knowledge: &KnowledgeStore,
    odds: Option<&OddsModel>,
    truth: Option<&HiddenAssignment>,
) -> Vec<Violation> {
    let size = knowledge.size();
    let mut violations = Vec::new();

    let mut claimed: Vec<Option<usize>> = vec![None; size];
    for left in 0..size {
        let match_mask = knowledge.match_mask(left);
        let miss_mask = knowledge.miss_mask(left);

        if match_mask & miss_mask != 0 {
            let right = (match_mask & miss_mask).trailing_zeros() as usize;
            violations.push(Violation::OverlappingBits { left, right });
        }
        if match_mask.count_ones() > 1 {
            violations.push(Violation::MultipleMatches { left });
        }

        if let Some(right) = knowledge.match_of(left) {
            match claimed[right] {
                Some(first) => violations.push(Violation::DuplicateMatch {
                    right,
                    first,
                    second: left,
                }),
                None => claimed[right] = Some(left),
            }
            for other in 0..size {
                if other != left && (knowledge.miss_mask(other) >> right) & 1 == 0 {
                    violations.push(Violation::UnpropagatedMatch { left, right });
                    break;
                }
            }
        }
    }

    if let Some(odds) = odds {
        for left in 0..size {
            let sum = odds.row_sum(left);
            if (sum - 1.0).abs() > ODDS_EPSILON {
                violations.push(Violation::RowSum { left, sum });
            }
        }
        for right in 0..size {
            let sum = odds.column_sum(right);
            if (sum - 1.0).abs() > ODDS_EPSILON {
                violations.push(Violation::ColumnSum { right, sum });
            }
        }
        for left in 0..size {
            for right in 0..size {
                let value = odds.prob(left, right);
                let miss = (knowledge.miss_mask(left) >> right) & 1 == 1;
                let matched = (knowledge.match_mask(left) >> right) & 1 == 1;
                let pinned_ok = if matched {
                    (value - 1.0).abs() <= ODDS_EPSILON
                } else if miss {
                    value.abs() <= ODDS_EPSILON
                } else {
                    (0.0..=1.0 + ODDS_EPSILON).contains(&value)
                };
                if !pinned_ok {
                    violations.push(Violation::UnpinnedOdds { left, right, value });
                }
            }
        }
    }

    if let Some(truth) = truth {
        for left in 0..size {
            for right in 0..size {
                let is_match = truth.is_match(left, right);
                let matched = (knowledge.match_mask(left) >> right) & 1 == 1;
                let missed = (knowledge.miss_mask(left) >> right) & 1 == 1;
                if (matched && !is_match) || (missed && is_match) {
                    violations.push(Violation::TruthConflict { left, right });
                }
            }
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::{Violation, validate};
    use crate::belief::OddsModel;
    use crate::engine::process_answer;
    use crate::model::assignment::HiddenAssignment;
    use crate::model::knowledge::KnowledgeStore;

    #[test]
    fn fresh_state_is_clean() {
        let knowledge = KnowledgeStore::new(6);
        let odds = OddsModel::new_uniform(6);
        let truth = HiddenAssignment::random_with_seed(6, 9);
        assert!(validate(&knowledge, Some(&odds), Some(&truth)).is_empty());
    }

    #[test]
    fn stays_clean_through_a_truthful_run() {
        let size = 8;
        let truth = HiddenAssignment::random_with_seed(size, 31);
        let mut knowledge = KnowledgeStore::new(size);
        let mut odds = OddsModel::new_uniform(size);

        for left in 0..size {
            for right in 0..size {
                if knowledge.state(left, right).unwrap()
                    != crate::model::knowledge::PairState::Unknown
                {
                    continue;
                }
                process_answer(
                    &mut knowledge,
                    Some(&mut odds),
                    left,
                    right,
                    truth.is_match(left, right),
                )
                .unwrap();
                let violations = validate(&knowledge, Some(&odds), Some(&truth));
                assert!(violations.is_empty(), "violations: {violations:?}");
                if knowledge.has_match(left) {
                    break;
                }
            }
        }
    }

    #[test]
    fn flags_knowledge_the_odds_never_applied() {
        let mut knowledge = KnowledgeStore::new(4);
        let odds = OddsModel::new_uniform(4);
        knowledge
            .record(0, 1, crate::model::knowledge::QueryOutcome::Match)
            .unwrap();
        let violations = validate(&knowledge, Some(&odds), None);
        assert!(
            violations
                .iter()
                .any(|v| matches!(v, Violation::UnpinnedOdds { left: 0, right: 1, .. }))
        );
    }

    #[test]
    fn flags_truth_conflicts() {
        let truth = HiddenAssignment::from_mapping(vec![1, 0, 2]).unwrap();
        let mut knowledge = KnowledgeStore::new(3);
        knowledge
            .record(0, 0, crate::model::knowledge::QueryOutcome::Match)
            .unwrap();
        let violations = validate(&knowledge, None, Some(&truth));
        assert!(
            violations
                .iter()
                .any(|v| matches!(v, Violation::TruthConflict { left: 0, right: 0 }))
        );
    }
}
