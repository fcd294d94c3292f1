use crate::model::assignment::HiddenAssignment;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuessError {
    /// A left item ended up without a right item to claim.
    MissingAssignment { left: usize },
    /// A right item was claimed more than once, or is out of range.
    NotAPermutation { right: usize },
}

/// One round's full guessed bijection; always a valid permutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuessVector {
    pairing: Vec<usize>,
}

impl GuessVector {
    /// Validate a pairing built by a guess policy. Each entry is the right
    /// item claimed for that left index; every right item must appear once.
    pub fn from_pairing(pairing: Vec<usize>) -> Result<Self, GuessError> {
        let size = pairing.len();
        let mut seen = vec![false; size];
        for &right in &pairing {
            if right >= size || seen[right] {
                return Err(GuessError::NotAPermutation { right });
            }
            seen[right] = true;
        }
        Ok(Self { pairing })
    }

    pub fn len(&self) -> usize {
        self.pairing.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairing.is_empty()
    }

    pub fn partner_of(&self, left: usize) -> usize {
        self.pairing[left]
    }

    pub fn pairing(&self) -> &[usize] {
        &self.pairing
    }

    /// Number of positions that agree with the hidden assignment. This is
    /// the only feedback a round's guess receives.
    pub fn score_against(&self, truth: &HiddenAssignment) -> usize {
        self.pairing
            .iter()
            .enumerate()
            .filter(|&(left, &right)| truth.is_match(left, right))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::{GuessError, GuessVector};
    use crate::model::assignment::HiddenAssignment;

    #[test]
    fn accepts_a_permutation() {
        let guess = GuessVector::from_pairing(vec![2, 0, 3, 1]).unwrap();
        assert_eq!(guess.len(), 4);
        assert_eq!(guess.partner_of(0), 2);
    }

    #[test]
    fn rejects_duplicate_claims() {
        let err = GuessVector::from_pairing(vec![1, 1, 2]).unwrap_err();
        assert_eq!(err, GuessError::NotAPermutation { right: 1 });
    }

    #[test]
    fn rejects_out_of_range_claims() {
        assert!(GuessVector::from_pairing(vec![0, 3]).is_err());
    }

    #[test]
    fn scores_exact_positions() {
        let truth = HiddenAssignment::from_mapping(vec![2, 0, 3, 1]).unwrap();
        let exact = GuessVector::from_pairing(vec![2, 0, 3, 1]).unwrap();
        assert_eq!(exact.score_against(&truth), 4);

        let partial = GuessVector::from_pairing(vec![2, 0, 1, 3]).unwrap();
        assert_eq!(partial.score_against(&truth), 2);

        let wrong = GuessVector::from_pairing(vec![0, 1, 2, 3]).unwrap();
        assert_eq!(wrong.score_against(&truth), 0);
    }
}
