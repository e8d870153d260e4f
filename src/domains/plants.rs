use crate::save::{Domain, PlantSaveData, SaveError, Saveable};

pub const MAX_GROWTH_STAGE: u8 = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct Plant {
    pub position: [f32; 3],
    pub species_id: String,
    pub growth_stage: u8,
}

/// Planted world objects and their growth
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlantField {
    plants: Vec<Plant>,
}

impl PlantField {
    pub fn plant(&mut self, species_id: &str, position: [f32; 3]) {
        self.plants.push(Plant {
            position,
            species_id: species_id.to_string(),
            growth_stage: 0,
        });
    }

    /// Advances every plant one stage, returns how many grew
    pub fn grow(&mut self) -> usize {
        let mut grown = 0;
        for plant in &mut self.plants {
            if plant.growth_stage < MAX_GROWTH_STAGE {
                plant.growth_stage += 1;
                grown += 1;
            }
        }
        grown
    }

    pub fn plants(&self) -> &[Plant] {
        &self.plants
    }
}

impl Saveable for PlantField {
    type Data = Vec<PlantSaveData>;
    const DOMAIN: Domain = Domain::Plants;

    fn to_save_data(&self) -> Result<Vec<PlantSaveData>, SaveError> {
        Ok(self
            .plants
            .iter()
            .map(|p| PlantSaveData {
                position: p.position,
                species_id: p.species_id.clone(),
                growth_stage: p.growth_stage,
            })
            .collect())
    }

    fn apply_save_data(&mut self, data: Option<Vec<PlantSaveData>>) {
        let Some(entries) = data else {
            return;
        };
        self.plants = entries
            .into_iter()
            .map(|p| Plant {
                position: p.position,
                species_id: p.species_id,
                growth_stage: p.growth_stage.min(MAX_GROWTH_STAGE),
            })
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_growth_caps() {
        let mut field = PlantField::default();
        field.plant("moonflower", [1.0, 0.0, 2.0]);
        for _ in 0..10 {
            field.grow();
        }
        assert_eq!(field.plants()[0].growth_stage, MAX_GROWTH_STAGE);
        assert_eq!(field.grow(), 0);
    }

    #[test]
    fn test_apply_clamps_stage() {
        let mut field = PlantField::default();
        field.apply_save_data(Some(vec![PlantSaveData {
            position: [0.0; 3],
            species_id: "thornroot".to_string(),
            growth_stage: 200,
        }]));
        assert_eq!(field.plants()[0].growth_stage, MAX_GROWTH_STAGE);
    }
}
