//! Quest log
//!
//! Quests are keyed by id and kept in id order so saves are stable.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::save::{Domain, QuestSaveData, QuestState, SaveError, Saveable};

#[derive(Debug, Clone, PartialEq)]
pub struct QuestProgress {
    pub state: QuestState,
    pub last_completed_at: Option<DateTime<Utc>>,
    pub times_completed: u32,
}

impl Default for QuestProgress {
    fn default() -> Self {
        QuestProgress {
            state: QuestState::NotStarted,
            last_completed_at: None,
            times_completed: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuestLog {
    quests: BTreeMap<String, QuestProgress>,
}

impl QuestLog {
    pub fn start(&mut self, quest_id: &str) {
        self.quests.entry(quest_id.to_string()).or_default().state = QuestState::Active;
    }

    /// Marks a quest completed; repeatable quests may be completed again
    pub fn complete(&mut self, quest_id: &str, at: DateTime<Utc>) {
        let progress = self.quests.entry(quest_id.to_string()).or_default();
        progress.state = QuestState::Completed;
        progress.last_completed_at = Some(at);
        progress.times_completed += 1;
    }

    pub fn fail(&mut self, quest_id: &str) {
        self.quests.entry(quest_id.to_string()).or_default().state = QuestState::Failed;
    }

    pub fn state(&self, quest_id: &str) -> QuestState {
        self.quests
            .get(quest_id)
            .map(|q| q.state)
            .unwrap_or(QuestState::NotStarted)
    }

    pub fn is_active(&self, quest_id: &str) -> bool {
        self.state(quest_id) == QuestState::Active
    }

    pub fn progress(&self, quest_id: &str) -> Option<&QuestProgress> {
        self.quests.get(quest_id)
    }

    pub fn len(&self) -> usize {
        self.quests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quests.is_empty()
    }
}

impl Saveable for QuestLog {
    type Data = Vec<QuestSaveData>;
    const DOMAIN: Domain = Domain::Quests;

    fn to_save_data(&self) -> Result<Vec<QuestSaveData>, SaveError> {
        Ok(self
            .quests
            .iter()
            .map(|(id, progress)| QuestSaveData {
                quest_id: id.clone(),
                state: progress.state,
                last_completed_at: progress.last_completed_at,
                times_completed: progress.times_completed,
            })
            .collect())
    }

    fn apply_save_data(&mut self, data: Option<Vec<QuestSaveData>>) {
        let Some(entries) = data else {
            return;
        };
        self.quests = entries
            .into_iter()
            .map(|entry| {
                (
                    entry.quest_id,
                    QuestProgress {
                        state: entry.state,
                        last_completed_at: entry.last_completed_at,
                        times_completed: entry.times_completed,
                    },
                )
            })
            .collect();
    }
}
