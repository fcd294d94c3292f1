use super::{PairQuery, Strategy, StrategyContext, StrategyError};
use matchem_core::model::guess::GuessVector;
use matchem_core::model::knowledge::PairState;

/// Belief-driven policy: query the unknown pair the odds model currently
/// rates highest, and guess greedily by descending odds. This exploits the
/// current best estimate rather than maximising information gain.
#[derive(Debug, Clone, Copy, Default)]
pub struct BeliefStrategy;

impl BeliefStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for BeliefStrategy {
    fn uses_odds(&self) -> bool {
        true
    }

    fn select_query(&mut self, ctx: &StrategyContext) -> Result<PairQuery, StrategyError> {
        if ctx.round == 0 {
            // Nothing is known yet, so every pair is equivalent.
            return Ok(PairQuery { left: 0, right: 0 });
        }

        let odds = ctx.odds.ok_or(StrategyError::MissingOdds)?;
        let knowledge = ctx.knowledge;
        let mut best: Option<(PairQuery, f64)> = None;
        let mut fallback = None;

        for left in 0..knowledge.size() {
            for right in 0..knowledge.size() {
                if knowledge.state(left, right)? != PairState::Unknown {
                    continue;
                }
                let query = PairQuery { left, right };
                if fallback.is_none() {
                    fallback = Some(query);
                }
                let value = odds.prob(left, right);
                if best.is_none_or(|(_, best_value)| value > best_value) && value > 0.0 {
                    best = Some((query, value));
                }
            }
        }

        best.map(|(query, _)| query)
            .or(fallback)
            .ok_or(StrategyError::NoQueryCandidate)
    }

    fn build_guess(&mut self, ctx: &StrategyContext) -> Result<GuessVector, StrategyError> {
        let odds = ctx.odds.ok_or(StrategyError::MissingOdds)?;
        let knowledge = ctx.knowledge;
        let size = knowledge.size();
        let mut claimed = vec![false; size];
        let mut pairing = Vec::with_capacity(size);

        for left in 0..size {
            if let Some(partner) = knowledge.match_of(left) {
                claimed[partner] = true;
                pairing.push(partner);
                continue;
            }

            let mut pick: Option<(usize, f64)> = None;
            for right in knowledge.candidates(left) {
                if claimed[right] || knowledge.state(left, right)? != PairState::Unknown {
                    continue;
                }
                let value = odds.prob(left, right);
                if pick.is_none_or(|(_, best)| value > best) {
                    pick = Some((right, value));
                }
            }

            let (right, _) = pick.ok_or(StrategyError::GuessExhausted { left })?;
            claimed[right] = true;
            pairing.push(right);
        }

        Ok(GuessVector::from_pairing(pairing)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use matchem_core::belief::OddsModel;
    use matchem_core::engine::process_answer;
    use matchem_core::model::knowledge::KnowledgeStore;

    fn ctx<'a>(
        knowledge: &'a KnowledgeStore,
        odds: &'a OddsModel,
        round: u32,
    ) -> StrategyContext<'a> {
        StrategyContext {
            knowledge,
            odds: Some(odds),
            round,
        }
    }

    #[test]
    fn round_zero_picks_origin_pair() {
        let knowledge = KnowledgeStore::new(4);
        let odds = OddsModel::new_uniform(4);
        let mut strategy = BeliefStrategy::new();
        let query = strategy.select_query(&ctx(&knowledge, &odds, 0)).unwrap();
        assert_eq!(query, PairQuery { left: 0, right: 0 });
    }

    #[test]
    fn later_rounds_pick_the_highest_odds_unknown_pair() {
        let mut knowledge = KnowledgeStore::new(4);
        let mut odds = OddsModel::new_uniform(4);
        // Eliminating (0,0) concentrates row 0's mass on its survivors.
        process_answer(&mut knowledge, Some(&mut odds), 0, 0, false).unwrap();

        let mut strategy = BeliefStrategy::new();
        let query = strategy.select_query(&ctx(&knowledge, &odds, 1)).unwrap();
        assert_eq!(query.left, 0);
        assert_ne!(query.right, 0);
        let best = odds.prob(query.left, query.right);
        for left in 0..4 {
            for right in 0..4 {
                if knowledge.state(left, right).unwrap()
                    == matchem_core::model::knowledge::PairState::Unknown
                {
                    assert!(odds.prob(left, right) <= best + 1e-12);
                }
            }
        }
    }

    #[test]
    fn guess_prefers_known_matches_then_highest_odds() {
        let mut knowledge = KnowledgeStore::new(4);
        let mut odds = OddsModel::new_uniform(4);
        process_answer(&mut knowledge, Some(&mut odds), 0, 2, true).unwrap();
        process_answer(&mut knowledge, Some(&mut odds), 1, 0, false).unwrap();

        let mut strategy = BeliefStrategy::new();
        let guess = strategy.build_guess(&ctx(&knowledge, &odds, 2)).unwrap();

        assert_eq!(guess.partner_of(0), 2);
        let mut sorted = guess.pairing().to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![0, 1, 2, 3]);
        // Row 1 missed column 0, so its guess must avoid it.
        assert_ne!(guess.partner_of(1), 0);
    }

    #[test]
    fn missing_odds_is_an_error() {
        let knowledge = KnowledgeStore::new(3);
        let mut strategy = BeliefStrategy::new();
        let bare = StrategyContext {
            knowledge: &knowledge,
            odds: None,
            round: 1,
        };
        assert_eq!(
            strategy.select_query(&bare).unwrap_err(),
            StrategyError::MissingOdds
        );
    }
}
