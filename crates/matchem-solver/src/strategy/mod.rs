mod belief;
mod first_fit;

pub use belief::BeliefStrategy;
pub use first_fit::FirstFitStrategy;

use matchem_core::belief::OddsModel;
use matchem_core::model::guess::{GuessError, GuessVector};
use matchem_core::model::knowledge::{KnowledgeError, KnowledgeStore};

/// A (left, right) pair submitted as the next truth query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairQuery {
    pub left: usize,
    pub right: usize,
}

/// Context provided to strategies for query and guess decisions.
pub struct StrategyContext<'a> {
    pub knowledge: &'a KnowledgeStore,
    pub odds: Option<&'a OddsModel>,
    pub round: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyError {
    /// No unknown pair left to query while the trial has not terminated.
    NoQueryCandidate,
    /// A left item could not be assigned any unclaimed right item.
    GuessExhausted { left: usize },
    /// The belief strategy was run without an odds model.
    MissingOdds,
    Knowledge(KnowledgeError),
    Guess(GuessError),
}

impl From<KnowledgeError> for StrategyError {
    fn from(err: KnowledgeError) -> Self {
        StrategyError::Knowledge(err)
    }
}

impl From<GuessError> for StrategyError {
    fn from(err: GuessError) -> Self {
        StrategyError::Guess(err)
    }
}

/// Unified interface for query-selection and guess-construction policies.
pub trait Strategy: Send {
    /// Whether the trial loop should maintain an odds model for this
    /// strategy.
    fn uses_odds(&self) -> bool;

    /// Pick the next still-unknown pair to submit as a truth query.
    fn select_query(&mut self, ctx: &StrategyContext) -> Result<PairQuery, StrategyError>;

    /// Build this round's full guessed bijection.
    fn build_guess(&mut self, ctx: &StrategyContext) -> Result<GuessVector, StrategyError>;
}

/// Strategy kinds selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    FirstFit,
    Belief,
}

impl StrategyKind {
    pub fn spawn(self) -> Box<dyn Strategy> {
        match self {
            StrategyKind::FirstFit => Box::new(FirstFitStrategy::new()),
            StrategyKind::Belief => Box::new(BeliefStrategy::new()),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StrategyKind::FirstFit => "first_fit",
            StrategyKind::Belief => "belief",
        }
    }
}
