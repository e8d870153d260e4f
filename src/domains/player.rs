//! Player state: transform, vitals, progression and discoveries

use crate::save::{Domain, PlayerSaveData, SaveError, Saveable};

/// Experience needed to go from `level` to `level + 1`
fn experience_for_level(level: u32) -> u64 {
    u64::from(level) * 100
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    pub position: [f32; 3],
    pub orientation: [f32; 4],
    pub health: f32,
    pub max_health: f32,
    pub mana: Option<f32>,
    pub stamina: f32,
    pub level: u32,
    /// Experience towards the next level
    pub experience: u64,
    pub unlocked_ability_ids: Vec<String>,
    pub discovered_entry_ids: Vec<String>,
}

impl Default for PlayerState {
    fn default() -> Self {
        PlayerState {
            position: [0.0, 0.0, 0.0],
            orientation: [0.0, 0.0, 0.0, 1.0],
            health: 100.0,
            max_health: 100.0,
            mana: None,
            stamina: 100.0,
            level: 1,
            experience: 0,
            unlocked_ability_ids: Vec::new(),
            discovered_entry_ids: Vec::new(),
        }
    }
}

impl PlayerState {
    pub fn move_to(&mut self, position: [f32; 3]) {
        self.position = position;
    }

    /// Adds experience and returns how many levels were gained
    pub fn gain_experience(&mut self, amount: u64) -> u32 {
        self.experience += amount;
        let mut gained = 0;
        while self.experience >= experience_for_level(self.level) {
            self.experience -= experience_for_level(self.level);
            self.level += 1;
            gained += 1;
        }
        gained
    }

    pub fn take_damage(&mut self, amount: f32) {
        self.health = (self.health - amount.max(0.0)).max(0.0);
    }

    pub fn heal(&mut self, amount: f32) {
        self.health = (self.health + amount.max(0.0)).min(self.max_health);
    }

    pub fn unlock_ability(&mut self, id: &str) -> bool {
        push_unique(&mut self.unlocked_ability_ids, id)
    }

    pub fn discover_entry(&mut self, id: &str) -> bool {
        push_unique(&mut self.discovered_entry_ids, id)
    }
}

fn push_unique(list: &mut Vec<String>, id: &str) -> bool {
    if list.iter().any(|existing| existing == id) {
        return false;
    }
    list.push(id.to_string());
    true
}

impl Saveable for PlayerState {
    type Data = PlayerSaveData;
    const DOMAIN: Domain = Domain::Player;

    fn to_save_data(&self) -> Result<PlayerSaveData, SaveError> {
        let finite = self
            .position
            .iter()
            .chain(self.orientation.iter())
            .chain([&self.health, &self.max_health, &self.stamina])
            .chain(self.mana.as_ref())
            .all(|v| v.is_finite());
        if !finite {
            return Err(SaveError::capture(
                Self::DOMAIN.key(),
                "transform or vitals are not finite",
            ));
        }

        Ok(PlayerSaveData {
            position: self.position,
            orientation: self.orientation,
            health: self.health,
            max_health: self.max_health,
            mana: self.mana,
            stamina: self.stamina,
            level: self.level,
            experience: self.experience,
            unlocked_ability_ids: self.unlocked_ability_ids.clone(),
            discovered_entry_ids: self.discovered_entry_ids.clone(),
        })
    }

    fn apply_save_data(&mut self, data: Option<PlayerSaveData>) {
        let Some(data) = data else {
            return;
        };
        self.position = data.position;
        self.orientation = data.orientation;
        self.max_health = data.max_health;
        self.health = data.health.min(data.max_health);
        self.mana = data.mana;
        self.stamina = data.stamina;
        self.level = data.level.max(1);
        self.experience = data.experience;
        self.unlocked_ability_ids = data.unlocked_ability_ids;
        self.discovered_entry_ids = data.discovered_entry_ids;
    }
}
