use crate::belief::OddsModel;
use crate::model::guess::GuessVector;
use crate::model::knowledge::KnowledgeStore;
use serde::{Deserialize, Serialize};

/// Serializable capture of one trial's deduction state. The hidden
/// assignment is deliberately absent so a dump never leaks the secret.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrialSnapshot {
    pub set_size: usize,
    pub round: u32,
    pub match_masks: Vec<u16>,
    pub miss_masks: Vec<u16>,
    pub guess: Option<Vec<usize>>,
    pub odds: Option<Vec<Vec<f64>>>,
}

impl TrialSnapshot {
    pub fn capture(
        round: u32,
        knowledge: &KnowledgeStore,
        odds: Option<&OddsModel>,
        guess: Option<&GuessVector>,
    ) -> Self {
        let size = knowledge.size();
        TrialSnapshot {
            set_size: size,
            round,
            match_masks: (0..size).map(|i| knowledge.match_mask(i)).collect(),
            miss_masks: (0..size).map(|i| knowledge.miss_mask(i)).collect(),
            guess: guess.map(|g| g.pairing().to_vec()),
            odds: odds.map(|model| (0..size).map(|i| model.row(i).to_vec()).collect()),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::TrialSnapshot;
    use crate::belief::OddsModel;
    use crate::model::guess::GuessVector;
    use crate::model::knowledge::{KnowledgeStore, QueryOutcome};

    #[test]
    fn snapshot_serializes_without_the_secret() {
        let mut knowledge = KnowledgeStore::new(4);
        knowledge.record(0, 2, QueryOutcome::Match).unwrap();
        let odds = OddsModel::new_uniform(4);
        let guess = GuessVector::from_pairing(vec![2, 0, 1, 3]).unwrap();

        let snapshot = TrialSnapshot::capture(3, &knowledge, Some(&odds), Some(&guess));
        let json = snapshot.to_json().unwrap();
        assert!(json.contains("\"round\": 3"));
        assert!(json.contains("\"match_masks\""));
        assert!(!json.contains("assignment"));
        assert!(!json.contains("truth"));
    }

    #[test]
    fn snapshot_roundtrips_through_json() {
        let knowledge = KnowledgeStore::new(3);
        let snapshot = TrialSnapshot::capture(0, &knowledge, None, None);
        let json = snapshot.to_json().unwrap();
        let restored = TrialSnapshot::from_json(&json).unwrap();
        assert_eq!(restored, snapshot);
        assert_eq!(restored.set_size, 3);
        assert!(restored.odds.is_none());
    }
}
