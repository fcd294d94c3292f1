//! Probabilistic belief tracking for the hidden bijection.
//!
//! The belief state is a single doubly-stochastic matrix over (left, right)
//! pairs, updated in place after every recorded query answer. Updates are
//! cheap local redistributions that keep row and column sums at 1 without
//! recomputing the distribution from scratch.

mod odds;

pub use odds::{OddsError, OddsModel};
