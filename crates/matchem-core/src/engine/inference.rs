use std::collections::VecDeque;

use crate::belief::{OddsError, OddsModel};
use crate::model::knowledge::{KnowledgeError, KnowledgeStore, PairState, QueryOutcome};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngineError {
    Knowledge(KnowledgeError),
    Odds(OddsError),
    /// A forced deduction pointed at a row or column with no candidate left.
    CandidateExhausted { left: Option<usize>, right: Option<usize> },
}

impl From<KnowledgeError> for EngineError {
    fn from(err: KnowledgeError) -> Self {
        EngineError::Knowledge(err)
    }
}

impl From<OddsError> for EngineError {
    fn from(err: OddsError) -> Self {
        EngineError::Odds(err)
    }
}

/// What a single answered query ended up proving.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InferenceReport {
    /// Every pair recorded, the submitted one first. Forced matches follow
    /// in the order the cascade discovered them.
    pub recorded: Vec<(usize, usize, bool)>,
}

impl InferenceReport {
    pub fn forced_matches(&self) -> usize {
        self.recorded.iter().skip(1).count()
    }
}

/// Process the oracle's answer for one submitted pair.
///
/// Records the outcome and walks the forced-deduction cascade: after a
/// NoMatch, a row down to one candidate or a column down to one
/// back-candidate pins that last pair as a match. The cascade runs off an
/// explicit worklist so depth is bounded, and items resolved by an earlier
/// cascade step are skipped rather than re-recorded.
///
/// When a belief model is active, each recorded fact also applies its odds
/// rule, except that a NoMatch which triggers a forced deduction defers
/// entirely to the forced match's update; applying both would break the
/// doubly-stochastic property.
///
/// Re-answering an already-resolved submitted pair is a contradiction and
/// fails fast; it means the query selector is broken.
pub fn process_answer(
    knowledge: &mut KnowledgeStore,
    mut odds: Option<&mut OddsModel>,
    left: usize,
    right: usize,
    is_match: bool,
) -> Result<InferenceReport, EngineError> {
    let first_outcome = if is_match {
        QueryOutcome::Match
    } else {
        QueryOutcome::NoMatch
    };

    let mut report = InferenceReport::default();
    let mut worklist = VecDeque::new();
    worklist.push_back((left, right, first_outcome));
    let mut submitted = true;

    while let Some((i, j, outcome)) = worklist.pop_front() {
        match knowledge.state(i, j)? {
            PairState::Unknown => {}
            existing => {
                if submitted {
                    return Err(KnowledgeError::Contradiction {
                        left: i,
                        right: j,
                        existing,
                    }
                    .into());
                }
                // Resolved by an earlier cascade step; nothing to do.
                continue;
            }
        }
        submitted = false;

        knowledge.record(i, j, outcome)?;
        report
            .recorded
            .push((i, j, outcome == QueryOutcome::Match));

        let mut forced_deduction = false;
        if outcome == QueryOutcome::NoMatch {
            if !knowledge.has_match(i) && knowledge.candidate_count(i) == 1 {
                let forced = knowledge.first_candidate(i).ok_or(
                    EngineError::CandidateExhausted {
                        left: Some(i),
                        right: None,
                    },
                )?;
                worklist.push_back((i, forced, QueryOutcome::Match));
                forced_deduction = true;
            }
            if knowledge.back_candidate_count(j) == 1 {
                let forced = knowledge.first_back_candidate(j).ok_or(
                    EngineError::CandidateExhausted {
                        left: None,
                        right: Some(j),
                    },
                )?;
                worklist.push_back((forced, j, QueryOutcome::Match));
                forced_deduction = true;
            }
        }

        if let Some(model) = odds.as_deref_mut() {
            match outcome {
                QueryOutcome::Match => model.apply_match(knowledge, i, j)?,
                // When an elimination pins a forced match, that match's odds
                // update already accounts for the eliminated cell; running
                // the elimination rule too would drain mass the forced pin
                // never returns.
                QueryOutcome::NoMatch if !forced_deduction => {
                    model.apply_no_match(knowledge, i, j)?
                }
                QueryOutcome::NoMatch => {}
            }
        }
    }

    Ok(report)
}
