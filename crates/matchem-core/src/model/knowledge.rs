/// What is proven about a single (left, right) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairState {
    Unknown,
    Match,
    NoMatch,
}

/// The answer recorded for a pair. `Unknown` is never recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOutcome {
    Match,
    NoMatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnowledgeError {
    /// A pair already resolved is being asserted again. Indicates a logic
    /// defect upstream, not bad input.
    Contradiction {
        left: usize,
        right: usize,
        existing: PairState,
    },
    /// Both the match and miss bit are set for the same pair.
    CorruptPair { left: usize, right: usize },
}

/// Per-left-item record of proven matches and proven non-matches, the single
/// source of truth for "what is certain". `match_bits[i]` holds at most one
/// bit (the proven partner); `miss_bits[i]` holds every eliminated right
/// item. The two sets stay disjoint.
#[derive(Debug, Clone)]
pub struct KnowledgeStore {
    size: usize,
    match_bits: Vec<u16>,
    miss_bits: Vec<u16>,
}

impl KnowledgeStore {
    pub fn new(size: usize) -> Self {
        debug_assert!(size <= crate::MAX_SET_SIZE);
        Self {
            size,
            match_bits: vec![0; size],
            miss_bits: vec![0; size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn state(&self, left: usize, right: usize) -> Result<PairState, KnowledgeError> {
        let matched = bit_set(self.match_bits[left], right);
        let missed = bit_set(self.miss_bits[left], right);
        match (matched, missed) {
            (true, true) => Err(KnowledgeError::CorruptPair { left, right }),
            (true, false) => Ok(PairState::Match),
            (false, true) => Ok(PairState::NoMatch),
            (false, false) => Ok(PairState::Unknown),
        }
    }

    /// Record a proven outcome for a still-unknown pair.
    ///
    /// A `Match` claims the column: every other right item is eliminated for
    /// `left`, and `right` is eliminated for every other left item.
    pub fn record(
        &mut self,
        left: usize,
        right: usize,
        outcome: QueryOutcome,
    ) -> Result<(), KnowledgeError> {
        match self.state(left, right)? {
            PairState::Unknown => {}
            existing => {
                return Err(KnowledgeError::Contradiction {
                    left,
                    right,
                    existing,
                });
            }
        }

        match outcome {
            QueryOutcome::Match => {
                self.match_bits[left] = 1 << right;
                for j in 0..self.size {
                    if j != right {
                        self.miss_bits[left] |= 1 << j;
                    }
                }
                for i in 0..self.size {
                    if i != left {
                        self.miss_bits[i] |= 1 << right;
                    }
                }
            }
            QueryOutcome::NoMatch => {
                self.miss_bits[left] |= 1 << right;
            }
        }
        Ok(())
    }

    pub fn has_match(&self, left: usize) -> bool {
        self.match_bits[left] != 0
    }

    pub fn match_of(&self, left: usize) -> Option<usize> {
        (0..self.size).find(|&j| bit_set(self.match_bits[left], j))
    }

    /// Right items not yet eliminated for `left` (includes a proven match).
    pub fn candidate_count(&self, left: usize) -> usize {
        self.size - (self.miss_bits[left] & low_mask(self.size)).count_ones() as usize
    }

    /// Left items that could still own `right`.
    pub fn back_candidate_count(&self, right: usize) -> usize {
        (0..self.size)
            .filter(|&i| !bit_set(self.miss_bits[i], right))
            .count()
    }

    pub fn first_candidate(&self, left: usize) -> Option<usize> {
        (0..self.size).find(|&j| !bit_set(self.miss_bits[left], j))
    }

    pub fn first_back_candidate(&self, right: usize) -> Option<usize> {
        (0..self.size).find(|&i| !bit_set(self.miss_bits[i], right))
    }

    pub fn candidates(&self, left: usize) -> impl Iterator<Item = usize> + '_ {
        (0..self.size).filter(move |&j| !bit_set(self.miss_bits[left], j))
    }

    pub fn match_mask(&self, left: usize) -> u16 {
        self.match_bits[left]
    }

    pub fn miss_mask(&self, left: usize) -> u16 {
        self.miss_bits[left]
    }
}

fn bit_set(mask: u16, idx: usize) -> bool {
    (mask >> idx) & 1 == 1
}

fn low_mask(size: usize) -> u16 {
    if size == 16 { u16::MAX } else { (1 << size) - 1 }
}
