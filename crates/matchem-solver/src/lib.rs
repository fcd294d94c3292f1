#![deny(warnings)]
pub mod strategy;
pub mod trial;

pub use strategy::{
    BeliefStrategy, FirstFitStrategy, PairQuery, Strategy, StrategyContext, StrategyError,
    StrategyKind,
};
pub use trial::{TrialError, TrialOutcome, TrialSetup, run_trial};
