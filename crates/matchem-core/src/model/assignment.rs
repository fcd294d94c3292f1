use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// The secret bijection for one trial: `partner_of(i)` is the right item
/// matched to left item `i`. Consulted only when answering a truth query or
/// scoring a guess, never by the deduction logic itself.
#[derive(Debug, Clone)]
pub struct HiddenAssignment {
    mapping: Vec<usize>,
}

impl HiddenAssignment {
    pub fn identity(size: usize) -> Self {
        Self {
            mapping: (0..size).collect(),
        }
    }

    pub fn random<R: rand::Rng + ?Sized>(size: usize, rng: &mut R) -> Self {
        let mut assignment = Self::identity(size);
        assignment.mapping.shuffle(rng);
        assignment
    }

    pub fn random_with_seed(size: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::random(size, &mut rng)
    }

    /// Build from an explicit mapping; `None` if it is not a permutation.
    pub fn from_mapping(mapping: Vec<usize>) -> Option<Self> {
        let size = mapping.len();
        let mut seen = vec![false; size];
        for &right in &mapping {
            if right >= size || seen[right] {
                return None;
            }
            seen[right] = true;
        }
        Some(Self { mapping })
    }

    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }

    pub fn partner_of(&self, left: usize) -> usize {
        self.mapping[left]
    }

    pub fn is_match(&self, left: usize, right: usize) -> bool {
        self.mapping[left] == right
    }
}

#[cfg(test)]
mod tests {
    use super::HiddenAssignment;

    #[test]
    fn seeded_assignment_is_deterministic() {
        let a = HiddenAssignment::random_with_seed(10, 42);
        let b = HiddenAssignment::random_with_seed(10, 42);
        for i in 0..10 {
            assert_eq!(a.partner_of(i), b.partner_of(i));
        }
    }

    #[test]
    fn different_seeds_differ() {
        let a = HiddenAssignment::random_with_seed(10, 1);
        let b = HiddenAssignment::random_with_seed(10, 2);
        assert!((0..10).any(|i| a.partner_of(i) != b.partner_of(i)));
    }

    #[test]
    fn random_assignment_is_a_permutation() {
        let assignment = HiddenAssignment::random_with_seed(16, 7);
        let mut seen = vec![false; 16];
        for i in 0..16 {
            let j = assignment.partner_of(i);
            assert!(!seen[j]);
            seen[j] = true;
        }
    }

    #[test]
    fn rejects_non_permutation_mapping() {
        assert!(HiddenAssignment::from_mapping(vec![0, 0, 2]).is_none());
        assert!(HiddenAssignment::from_mapping(vec![0, 3, 1]).is_none());
        assert!(HiddenAssignment::from_mapping(vec![2, 0, 1]).is_some());
    }
}
