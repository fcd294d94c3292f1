use super::{PairQuery, Strategy, StrategyContext, StrategyError};
use matchem_core::model::guess::GuessVector;
use matchem_core::model::knowledge::PairState;

/// The basic, belief-free policy: query the first unknown candidate of the
/// first left item without a proven match, and guess by handing each left
/// item its first unclaimed candidate.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstFitStrategy;

impl FirstFitStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for FirstFitStrategy {
    fn uses_odds(&self) -> bool {
        false
    }

    fn select_query(&mut self, ctx: &StrategyContext) -> Result<PairQuery, StrategyError> {
        let knowledge = ctx.knowledge;
        for left in 0..knowledge.size() {
            if knowledge.has_match(left) {
                continue;
            }
            for right in 0..knowledge.size() {
                if knowledge.state(left, right)? == PairState::Unknown {
                    return Ok(PairQuery { left, right });
                }
            }
        }
        Err(StrategyError::NoQueryCandidate)
    }

    fn build_guess(&mut self, ctx: &StrategyContext) -> Result<GuessVector, StrategyError> {
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
            let pick = knowledge
                .candidates(left)
                .find(|&right| !claimed[right])
                .ok_or(StrategyError::GuessExhausted { left })?;
            claimed[pick] = true;
            pairing.push(pick);
        }

        Ok(GuessVector::from_pairing(pairing)?)
    }
}
