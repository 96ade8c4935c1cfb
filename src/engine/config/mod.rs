// ABOUTME: Tunable rate constants and grid dimensions for the simulation core
// ABOUTME: Loaded from YAML the same way a scientific workspace config would be

use serde::{Deserialize, Serialize};

/// Metadata for a saved configuration, for collaboration and tracking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigMetadata {
    pub name: String,
    pub author: String,
    pub created: String,
    pub modified: Option<String>,
    pub description: Option<String>,
    pub version: String,
}

impl Default for ConfigMetadata {
    fn default() -> Self {
        Self {
            name: "Default Terraforming Configuration".to_string(),
            author: "Unknown".to_string(),
            created: chrono::Utc::now().to_rfc3339(),
            modified: None,
            description: None,
            version: "1.0".to_string(),
        }
    }
}

/// All tunable rate constants for the simulation core, per the
/// configuration-constants table. Rates are small integer percentages (or
/// tenths of a percent) scaled by the divisors baked into each formula.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub metadata: ConfigMetadata,

    pub grid_width: usize,
    pub grid_height: usize,
    pub depth_unit_mm: i32,

    pub surface_flow_rate: i32,
    pub surface_flow_threshold: i32,
    pub subsurface_flow_rate: i32,
    pub subsurface_flow_threshold: i32,
    pub vertical_seepage_rate: i32,
    pub capillary_rise_rate: i32,
    pub surface_seepage_rate: i32,

    pub rain_wellspring_multiplier: i32,
    pub trench_evap_reduction: i32,
    pub cistern_evap_reduction: i32,
    pub trench_flow_multiplier_pct: i32,

    pub min_bedrock_elevation: i32,

    pub day_length: u32,
    pub heat_min: i32,
    pub heat_max: i32,
    pub moisture_ema_alpha: f64,

    pub humidity_drift: f32,
    pub wind_drift: f32,

    pub rain_interval_min: u32,
    pub rain_interval_max: u32,
    pub rain_duration_min: u32,
    pub rain_duration_max: u32,

    pub trench_slope_drop: i32,

    pub cistern_capacity: i32,
    pub cistern_transfer_rate: i32,
    pub cistern_loss_rate: i32,
    pub cistern_loss_recovery: i32,
    pub condenser_output: i32,
    pub planter_water_requirement: i32,
    pub planter_water_cost: i32,
    pub planter_growth_rate: i32,
    pub planter_growth_threshold: i32,
    pub max_organics_depth: i32,

    pub connectivity_rebuild_frequency_ticks: Option<u32>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            metadata: ConfigMetadata::default(),

            grid_width: 180,
            grid_height: 135,
            depth_unit_mm: 100,

            surface_flow_rate: 50,
            surface_flow_threshold: 1,
            subsurface_flow_rate: 8,
            subsurface_flow_threshold: 1,
            vertical_seepage_rate: 30,
            capillary_rise_rate: 5,
            surface_seepage_rate: 20,

            rain_wellspring_multiplier: 200,
            trench_evap_reduction: 70,
            cistern_evap_reduction: 60,
            trench_flow_multiplier_pct: 150,

            min_bedrock_elevation: -1000,

            day_length: 100,
            heat_min: 60,
            heat_max: 140,
            moisture_ema_alpha: 0.1,

            humidity_drift: 0.01,
            wind_drift: 0.025,

            rain_interval_min: 80,
            rain_interval_max: 240,
            rain_duration_min: 10,
            rain_duration_max: 30,

            trench_slope_drop: 2,

            cistern_capacity: 500,
            cistern_transfer_rate: 20,
            cistern_loss_rate: 2,
            cistern_loss_recovery: 50,
            condenser_output: 5,
            planter_water_requirement: 20,
            planter_water_cost: 10,
            planter_growth_rate: 5,
            planter_growth_threshold: 100,
            max_organics_depth: 20,

            connectivity_rebuild_frequency_ticks: None,
        }
    }
}

impl SimulationConfig {
    pub fn load_from_file(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: SimulationConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &str) -> Result<(), Box<dyn std::error::Error>> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn mark_modified(&mut self) {
        self.metadata.modified = Some(chrono::Utc::now().to_rfc3339());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_authoritative_table() {
        let config = SimulationConfig::default();
        assert_eq!(config.grid_width, 180);
        assert_eq!(config.grid_height, 135);
        assert_eq!(config.surface_flow_rate, 50);
        assert_eq!(config.subsurface_flow_rate, 8);
        assert_eq!(config.vertical_seepage_rate, 30);
        assert_eq!(config.capillary_rise_rate, 5);
    }

    #[test]
    fn roundtrips_through_yaml() {
        let config = SimulationConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let restored: SimulationConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(restored.grid_width, config.grid_width);
        assert_eq!(restored.subsurface_flow_threshold, config.subsurface_flow_threshold);
    }

    #[test]
    fn save_and_load_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let path_str = path.to_str().unwrap();

        let mut config = SimulationConfig::default();
        config.grid_width = 64;
        config.mark_modified();
        config.save_to_file(path_str).unwrap();

        let loaded = SimulationConfig::load_from_file(path_str).unwrap();
        assert_eq!(loaded.grid_width, 64);
        assert!(loaded.metadata.modified.is_some());
    }
}
