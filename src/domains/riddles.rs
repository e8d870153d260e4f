use std::collections::BTreeMap;

use crate::save::{Domain, RiddleSaveData, SaveError, Saveable};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RiddleProgress {
    pub answered: bool,
    pub was_correct: bool,
    pub attempt_count: u32,
}

/// Riddle attempts keyed by riddle id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RiddleBook {
    riddles: BTreeMap<String, RiddleProgress>,
}

impl RiddleBook {
    /// Records an answer. A solved riddle stays solved.
    pub fn attempt(&mut self, riddle_id: &str, correct: bool) -> &RiddleProgress {
        let progress = self.riddles.entry(riddle_id.to_string()).or_default();
        progress.answered = true;
        progress.was_correct |= correct;
        progress.attempt_count += 1;
        progress
    }

    pub fn is_solved(&self, riddle_id: &str) -> bool {
        self.riddles
            .get(riddle_id)
            .map(|r| r.was_correct)
            .unwrap_or(false)
    }

    pub fn progress(&self, riddle_id: &str) -> Option<&RiddleProgress> {
        self.riddles.get(riddle_id)
    }
}

impl Saveable for RiddleBook {
    type Data = Vec<RiddleSaveData>;
    const DOMAIN: Domain = Domain::Riddles;

    fn to_save_data(&self) -> Result<Vec<RiddleSaveData>, SaveError> {
        Ok(self
            .riddles
            .iter()
            .map(|(id, r)| RiddleSaveData {
                riddle_id: id.clone(),
                answered: r.answered,
                was_correct: r.was_correct,
                attempt_count: r.attempt_count,
            })
            .collect())
    }

    fn apply_save_data(&mut self, data: Option<Vec<RiddleSaveData>>) {
        let Some(entries) = data else {
            return;
        };
        self.riddles = entries
            .into_iter()
            .map(|r| {
                (
                    r.riddle_id,
                    RiddleProgress {
                        answered: r.answered,
                        was_correct: r.was_correct,
                        attempt_count: r.attempt_count,
                    },
                )
            })
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempts() {
        let mut book = RiddleBook::default();
        book.attempt("sphinx", false);
        assert!(!book.is_solved("sphinx"));
        book.attempt("sphinx", true);
        book.attempt("sphinx", false);

        let progress = book.progress("sphinx").unwrap();
        assert!(progress.answered);
        assert!(progress.was_correct);
        assert_eq!(progress.attempt_count, 3);
    }

    #[test]
    fn test_save_and_apply() {
        let mut book = RiddleBook::default();
        book.attempt("mirror", true);
        let data = book.to_save_data().unwrap();

        let mut restored = RiddleBook::default();
        restored.apply_save_data(Some(data));
        assert!(restored.is_solved("mirror"));
    }
}
