//! World clock, weather and current scene

use crate::save::{Domain, SaveError, Saveable, WorldSaveData};

const HOURS_PER_DAY: f32 = 24.0;
const SECONDS_PER_HOUR: f64 = 3600.0;

#[derive(Debug, Clone, PartialEq)]
pub struct WorldState {
    /// Total in-game seconds since the world began
    pub game_time_seconds: f64,
    pub time_of_day_hours: f32,
    pub days_elapsed: u32,
    pub weather_id: String,
    pub current_scene_id: String,
}

impl WorldState {
    pub fn new(scene_id: &str) -> Self {
        WorldState {
            game_time_seconds: 0.0,
            time_of_day_hours: 8.0,
            days_elapsed: 0,
            weather_id: "clear".to_string(),
            current_scene_id: scene_id.to_string(),
        }
    }

    /// Advances the clock by in-game seconds, rolling over into new days
    ///
    /// Negative and non-finite amounts are ignored.
    pub fn advance(&mut self, game_seconds: f64) {
        if !game_seconds.is_finite() || game_seconds <= 0.0 {
            return;
        }
        self.game_time_seconds += game_seconds;
        let day = f64::from(HOURS_PER_DAY);
        let hours = f64::from(self.time_of_day_hours) + game_seconds / SECONDS_PER_HOUR;
        let days = (hours / day).floor() as u32;
        self.days_elapsed = self.days_elapsed.saturating_add(days);
        self.time_of_day_hours = hours.rem_euclid(day) as f32;
    }

    pub fn set_weather(&mut self, weather_id: &str) {
        self.weather_id = weather_id.to_string();
    }

    pub fn enter_scene(&mut self, scene_id: &str) {
        self.current_scene_id = scene_id.to_string();
    }
}

impl Saveable for WorldState {
    type Data = WorldSaveData;
    const DOMAIN: Domain = Domain::World;

    fn to_save_data(&self) -> Result<WorldSaveData, SaveError> {
        if self.current_scene_id.is_empty() {
            return Err(SaveError::capture(Self::DOMAIN.key(), "no current scene"));
        }
        if !self.game_time_seconds.is_finite() || !self.time_of_day_hours.is_finite() {
            return Err(SaveError::capture(Self::DOMAIN.key(), "clock is not finite"));
        }
        Ok(WorldSaveData {
            game_time_seconds: self.game_time_seconds,
            time_of_day_hours: self.time_of_day_hours,
            days_elapsed: self.days_elapsed,
            weather_id: self.weather_id.clone(),
            current_scene_id: self.current_scene_id.clone(),
        })
    }

    fn apply_save_data(&mut self, data: Option<WorldSaveData>) {
        let Some(data) = data else {
            return;
        };
        self.game_time_seconds = data.game_time_seconds;
        self.time_of_day_hours = data.time_of_day_hours.rem_euclid(HOURS_PER_DAY);
        self.days_elapsed = data.days_elapsed;
        self.weather_id = data.weather_id;
        self.current_scene_id = data.current_scene_id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_rolls_over() {
        let mut world = WorldState::new("meadow");
        world.advance(20.0 * SECONDS_PER_HOUR);
        assert_eq!(world.days_elapsed, 1);
        assert_eq!(world.time_of_day_hours, 4.0);
        assert_eq!(world.game_time_seconds, 72000.0);

        world.advance(-5.0);
        assert_eq!(world.game_time_seconds, 72000.0);
    }

    #[test]
    fn test_clock_ignores_non_finite_and_spans_many_days() {
        let mut world = WorldState::new("meadow");
        world.advance(f64::INFINITY);
        world.advance(f64::NAN);
        assert_eq!(world, WorldState::new("meadow"));

        world.advance(10.0 * 24.0 * SECONDS_PER_HOUR + 2.0 * SECONDS_PER_HOUR);
        assert_eq!(world.days_elapsed, 10);
        assert_eq!(world.time_of_day_hours, 10.0);
    }

    #[test]
    fn test_non_finite_clock_fails_capture() {
        let mut world = WorldState::new("meadow");
        world.game_time_seconds = f64::NAN;
        assert!(world.to_save_data().is_err());
    }

    #[test]
    fn test_empty_scene_fails_capture() {
        let world = WorldState::new("");
        assert!(world.to_save_data().is_err());
    }

    #[test]
    fn test_apply() {
        let mut saved = WorldState::new("cliffs");
        saved.set_weather("fog");
        saved.advance(3.0 * SECONDS_PER_HOUR);

        let mut world = WorldState::new("meadow");
        world.apply_save_data(Some(saved.to_save_data().unwrap()));
        assert_eq!(world, saved);
    }
}
