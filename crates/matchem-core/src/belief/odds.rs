use crate::model::knowledge::{KnowledgeError, KnowledgeStore, PairState};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OddsError {
    /// Mass released from an eliminated pair had no still-unknown row left
    /// to receive it. Indicates earlier propagation went wrong.
    StrandedMass { left: usize, column: usize },
    /// A row lost its last candidate without being pinned to a match.
    NoCandidates { left: usize },
    Knowledge(KnowledgeError),
}

impl From<KnowledgeError> for OddsError {
    fn from(err: KnowledgeError) -> Self {
        OddsError::Knowledge(err)
    }
}

/// N×N matrix of match beliefs, row i = left item, column j = right item.
/// Invariant while active: every row and column sums to 1 (to round-off),
/// and entries for proven pairs are pinned to exactly 1 or 0.
///
/// Both update rules assume the corresponding fact has already been recorded
/// in the [`KnowledgeStore`] they are handed.
#[derive(Debug, Clone)]
pub struct OddsModel {
    size: usize,
    cells: Vec<f64>,
}

impl OddsModel {
    pub fn new_uniform(size: usize) -> Self {
        Self {
            size,
            cells: vec![1.0 / size as f64; size * size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn prob(&self, left: usize, right: usize) -> f64 {
        self.cells[left * self.size + right]
    }

    fn set(&mut self, left: usize, right: usize, value: f64) {
        self.cells[left * self.size + right] = value;
    }

    pub fn row_sum(&self, left: usize) -> f64 {
        (0..self.size).map(|j| self.prob(left, j)).sum()
    }

    pub fn column_sum(&self, right: usize) -> f64 {
        (0..self.size).map(|i| self.prob(i, right)).sum()
    }

    pub fn row(&self, left: usize) -> &[f64] {
        &self.cells[left * self.size..(left + 1) * self.size]
    }

    /// Proven `Match(left, right)`: pin row `left`, then move every other
    /// row's claim on the now-taken column back into the columns row `left`
    /// stopped claiming. Each released entry is split evenly across the rows
    /// that still held mass on column `right`, which are exactly the rows
    /// about to lose that mass when the column is zeroed.
    pub fn apply_match(
        &mut self,
        knowledge: &KnowledgeStore,
        left: usize,
        right: usize,
    ) -> Result<(), OddsError> {
        for j in 0..self.size {
            if j == right {
                continue;
            }
            let before = self.prob(left, j);
            if before <= 0.0 {
                continue;
            }
            self.set(left, j, 0.0);

            let mut receivers = 0usize;
            for i in 0..self.size {
                if i != left
                    && knowledge.state(i, j)? == PairState::Unknown
                    && self.prob(i, right) > 0.0
                {
                    receivers += 1;
                }
            }
            if receivers == 0 {
                return Err(OddsError::StrandedMass { left, column: j });
            }
            let share = before / receivers as f64;
            for i in 0..self.size {
                if i != left
                    && knowledge.state(i, j)? == PairState::Unknown
                    && self.prob(i, right) > 0.0
                {
                    self.cells[i * self.size + j] += share;
                }
            }
        }

        self.set(left, right, 1.0);
        for i in 0..self.size {
            if i != left {
                self.set(i, right, 0.0);
            }
        }
        Ok(())
    }

    /// Proven `NoMatch(left, right)`: spread the removed mass evenly over
    /// row `left`'s remaining unknown columns, pull the same delta back out
    /// of the other unknown rows of those columns, and return each row's
    /// total loss to column `right` so both sums stay at 1. Negative
    /// round-off residues clamp to zero.
    pub fn apply_no_match(
        &mut self,
        knowledge: &KnowledgeStore,
        left: usize,
        right: usize,
    ) -> Result<(), OddsError> {
        let remaining = knowledge.candidate_count(left);
        if remaining == 0 {
            return Err(OddsError::NoCandidates { left });
        }
        let before = self.prob(left, right);
        let fwd_delta = before / remaining as f64;
        self.set(left, right, 0.0);

        let mut lost = vec![0.0; self.size];
        for j in 0..self.size {
            if j == right || knowledge.state(left, j)? != PairState::Unknown {
                continue;
            }
            self.cells[left * self.size + j] += fwd_delta;

            let other_rows = knowledge.back_candidate_count(j).saturating_sub(1);
            if other_rows == 0 {
                continue;
            }
            let bwd_delta = fwd_delta / other_rows as f64;
            for i in 0..self.size {
                if i == left || knowledge.state(i, j)? != PairState::Unknown {
                    continue;
                }
                let cell = &mut self.cells[i * self.size + j];
                *cell -= bwd_delta;
                lost[i] += bwd_delta;
                if *cell < 0.0 {
                    *cell = 0.0;
                }
            }
        }

        for (i, &returned) in lost.iter().enumerate() {
            if i != left && knowledge.state(i, right)? == PairState::Unknown {
                self.cells[i * self.size + right] += returned;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::OddsModel;
    use crate::model::knowledge::{KnowledgeStore, PairState, QueryOutcome};

    const EPS: f64 = 1e-4;

    fn assert_doubly_stochastic(odds: &OddsModel) {
        for i in 0..odds.size() {
            assert!(
                (odds.row_sum(i) - 1.0).abs() < EPS,
                "row {i} sums to {}",
                odds.row_sum(i)
            );
        }
        for j in 0..odds.size() {
            assert!(
                (odds.column_sum(j) - 1.0).abs() < EPS,
                "column {j} sums to {}",
                odds.column_sum(j)
            );
        }
    }

    #[test]
    fn uniform_model_is_doubly_stochastic() {
        let odds = OddsModel::new_uniform(10);
        assert!((odds.prob(3, 7) - 0.1).abs() < 1e-12);
        assert_doubly_stochastic(&odds);
    }

    #[test]
    fn no_match_zeroes_pair_and_conserves_mass() {
        let mut knowledge = KnowledgeStore::new(5);
        let mut odds = OddsModel::new_uniform(5);

        knowledge.record(0, 0, QueryOutcome::NoMatch).unwrap();
        odds.apply_no_match(&knowledge, 0, 0).unwrap();

        assert_eq!(odds.prob(0, 0), 0.0);
        // Row 0's removed fifth spreads evenly over its four open columns.
        assert!((odds.prob(0, 1) - 0.25).abs() < EPS);
        assert_doubly_stochastic(&odds);
    }

    #[test]
    fn match_pins_row_and_column() {
        let mut knowledge = KnowledgeStore::new(5);
        let mut odds = OddsModel::new_uniform(5);

        knowledge.record(2, 4, QueryOutcome::Match).unwrap();
        odds.apply_match(&knowledge, 2, 4).unwrap();

        assert_eq!(odds.prob(2, 4), 1.0);
        for j in 0..4 {
            assert_eq!(odds.prob(2, j), 0.0);
        }
        for i in [0usize, 1, 3] {
            assert_eq!(odds.prob(i, 4), 0.0);
        }
        assert_doubly_stochastic(&odds);
    }

    #[test]
    fn pinned_entries_stay_pinned_through_later_updates() {
        let mut knowledge = KnowledgeStore::new(6);
        let mut odds = OddsModel::new_uniform(6);

        knowledge.record(1, 3, QueryOutcome::Match).unwrap();
        odds.apply_match(&knowledge, 1, 3).unwrap();
        knowledge.record(0, 5, QueryOutcome::NoMatch).unwrap();
        odds.apply_no_match(&knowledge, 0, 5).unwrap();

        assert_eq!(odds.prob(1, 3), 1.0);
        assert_eq!(odds.prob(0, 3), 0.0);
        assert_eq!(odds.prob(0, 5), 0.0);
        assert_doubly_stochastic(&odds);
    }

    /// Highest-rated unknown pair, the order live belief-driven play
    /// submits queries in.
    fn next_query(knowledge: &KnowledgeStore, odds: &OddsModel) -> Option<(usize, usize)> {
        let mut best: Option<((usize, usize), f64)> = None;
        for left in 0..knowledge.size() {
            for right in 0..knowledge.size() {
                if knowledge.state(left, right).unwrap() != PairState::Unknown {
                    continue;
                }
                let value = odds.prob(left, right);
                if best.is_none_or(|(_, best_value)| value > best_value) {
                    best = Some(((left, right), value));
                }
            }
        }
        best.map(|(pair, _)| pair)
    }

    #[test]
    fn belief_driven_games_stay_doubly_stochastic() {
        // Replay full games against hidden permutations, routing every
        // answer through the inference cascade so forced deductions land
        // the way live play produces them, and check the invariant after
        // each submitted query.
        use crate::engine::process_answer;
        use crate::model::assignment::HiddenAssignment;

        for seed in 0..20u64 {
            let size = 8;
            let truth = HiddenAssignment::random_with_seed(size, seed);
            let mut knowledge = KnowledgeStore::new(size);
            let mut odds = OddsModel::new_uniform(size);

            while let Some((left, right)) = next_query(&knowledge, &odds) {
                process_answer(
                    &mut knowledge,
                    Some(&mut odds),
                    left,
                    right,
                    truth.is_match(left, right),
                )
                .unwrap();
                assert_doubly_stochastic(&odds);
            }
        }
    }
}
