use core::fmt;

use matchem_core::MAX_SET_SIZE;
use matchem_core::belief::OddsModel;
use matchem_core::engine::{EngineError, process_answer};
use matchem_core::model::assignment::HiddenAssignment;
use matchem_core::model::guess::GuessVector;
use matchem_core::model::knowledge::KnowledgeStore;
use matchem_core::serialization::TrialSnapshot;
use matchem_core::validate::{Violation, validate};
use tracing::{Level, event};

use crate::strategy::{Strategy, StrategyContext, StrategyError};

/// Inputs for one trial. The hidden assignment is fixed at construction so
/// the loop only ever consults it through the oracle and scoring steps.
#[derive(Debug, Clone)]
pub struct TrialSetup {
    truth: HiddenAssignment,
    seed: u64,
    check_invariants: bool,
}

impl TrialSetup {
    pub fn seeded(set_size: usize, seed: u64) -> Result<Self, TrialError> {
        if !(2..=MAX_SET_SIZE).contains(&set_size) {
            return Err(TrialError::InvalidSetSize { set_size });
        }
        Ok(Self {
            truth: HiddenAssignment::random_with_seed(set_size, seed),
            seed,
            check_invariants: false,
        })
    }

    /// Fix the hidden assignment directly (scenario tests).
    pub fn from_truth(truth: HiddenAssignment) -> Self {
        Self {
            truth,
            seed: 0,
            check_invariants: false,
        }
    }

    pub fn check_invariants(mut self, enabled: bool) -> Self {
        self.check_invariants = enabled;
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn set_size(&self) -> usize {
        self.truth.len()
    }
}

/// Terminal result of a completed trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialOutcome {
    pub rounds: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrialError {
    InvalidSetSize { set_size: usize },
    Engine(EngineError),
    Strategy(StrategyError),
    /// The round bound was exceeded; a bookkeeping bug, not bad luck.
    RoundLimit { rounds: u32, limit: u32 },
    /// An invariant audit failed. Carries the violations and a JSON dump of
    /// the full deduction state (the secret excluded).
    InvariantViolation {
        round: u32,
        violations: Vec<Violation>,
        dump: String,
    },
}

impl From<EngineError> for TrialError {
    fn from(err: EngineError) -> Self {
        TrialError::Engine(err)
    }
}

impl From<StrategyError> for TrialError {
    fn from(err: StrategyError) -> Self {
        TrialError::Strategy(err)
    }
}

/// Upper bound on rounds: every pair is queried at most once and forced
/// deductions never re-query, so N(N-1)/2 eliminations plus N-1 direct
/// matches always suffice.
pub fn round_limit(set_size: usize) -> u32 {
    let n = set_size as u32;
    n * (n - 1) / 2 + (n - 1)
}

/// Run one trial to completion: query, infer, guess, score, repeat until
/// the guess matches the hidden assignment everywhere.
pub fn run_trial(
    setup: &TrialSetup,
    strategy: &mut dyn Strategy,
) -> Result<TrialOutcome, TrialError> {
    let size = setup.truth.len();
    let limit = round_limit(size);
    let mut knowledge = KnowledgeStore::new(size);
    let mut odds = strategy.uses_odds().then(|| OddsModel::new_uniform(size));
    let mut round: u32 = 0;

    loop {
        if round >= limit {
            return Err(TrialError::RoundLimit {
                rounds: round,
                limit,
            });
        }

        let query = {
            let ctx = StrategyContext {
                knowledge: &knowledge,
                odds: odds.as_ref(),
                round,
            };
            strategy.select_query(&ctx)?
        };

        // The only consultation of the secret.
        let answer = setup.truth.is_match(query.left, query.right);
        let report = process_answer(&mut knowledge, odds.as_mut(), query.left, query.right, answer)?;

        let guess = {
            let ctx = StrategyContext {
                knowledge: &knowledge,
                odds: odds.as_ref(),
                round,
            };
            strategy.build_guess(&ctx)?
        };

        let matched = guess.score_against(&setup.truth);
        round += 1;

        if setup.check_invariants {
            let violations = validate(&knowledge, odds.as_ref(), Some(&setup.truth));
            if !violations.is_empty() {
                let dump = TrialSnapshot::capture(round, &knowledge, odds.as_ref(), Some(&guess))
                    .to_json()
                    .unwrap_or_else(|err| format!("snapshot failed: {err}"));
                return Err(TrialError::InvariantViolation {
                    round,
                    violations,
                    dump,
                });
            }
        }

        if tracing::enabled!(Level::DEBUG) {
            let view = TrialView {
                knowledge: &knowledge,
                odds: odds.as_ref(),
                guess: &guess,
            };
            event!(
                target: "matchem_solver::trial",
                Level::DEBUG,
                round,
                left = query.left,
                right = query.right,
                answer,
                forced = report.forced_matches(),
                matched,
                state = %view
            );
        }

        if matched == size {
            return Ok(TrialOutcome { rounds: round });
        }
    }
}

/// Human-readable rendering of a trial's deduction state, with the hidden
/// assignment left out.
struct TrialView<'a> {
    knowledge: &'a KnowledgeStore,
    odds: Option<&'a OddsModel>,
    guess: &'a GuessVector,
}

impl fmt::Display for TrialView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let size = self.knowledge.size();
        writeln!(f, "known_info:")?;
        for i in 0..size {
            write!(f, "  {i}:")?;
            for j in 0..size {
                let matched = (self.knowledge.match_mask(i) >> j) & 1;
                let missed = (self.knowledge.miss_mask(i) >> j) & 1;
                write!(f, " ({matched},{missed})")?;
            }
            writeln!(f)?;
        }
        write!(f, "guess:")?;
        for (i, right) in self.guess.pairing().iter().enumerate() {
            write!(f, " {i}:{right}")?;
        }
        writeln!(f)?;
        if let Some(odds) = self.odds {
            writeln!(f, "odds:")?;
            for i in 0..size {
                write!(f, "  {i}:")?;
                for j in 0..size {
                    write!(f, " {:.3}", odds.prob(i, j))?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}
