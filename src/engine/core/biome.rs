// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jerry Snitselaar and contributors

// ABOUTME: Coarse five-variant biome classification used for evaporation modifiers
// ABOUTME: Grounded on TILE_TYPES; intentionally far simpler than a full Whittaker model

use serde::{Deserialize, Serialize};

/// Biome classification for a single cell, reclassified by the weather
/// system on terrain/moisture change. Exposed materials drive rock/salt;
/// moisture drives the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Biome {
    Dune,
    Flat,
    Wadi,
    Rock,
    Salt,
}

#[derive(Debug, Clone, Copy)]
pub struct BiomeProperties {
    /// Percent evaporation multiplier, combined with heat.
    pub evap: i32,
    /// Percent of evaporation retained (subtracted back), 0..100.
    pub retention: i32,
}

impl Biome {
    pub fn properties(self) -> BiomeProperties {
        match self {
            Biome::Dune => BiomeProperties { evap: 120, retention: 10 },
            Biome::Flat => BiomeProperties { evap: 100, retention: 20 },
            Biome::Wadi => BiomeProperties { evap: 80, retention: 40 },
            Biome::Rock => BiomeProperties { evap: 60, retention: 5 },
            Biome::Salt => BiomeProperties { evap: 140, retention: 0 },
        }
    }

    /// Classify from exposed material and recent moisture, matching the
    /// coarse rules a harness would apply after each weather tick: rock
    /// where soil is gone, wadi where moisture has stayed high, salt on
    /// persistently dry ground with a sandy surface, dune on loose sand,
    /// flat otherwise.
    pub fn classify(exposed_is_bedrock: bool, exposed_is_sand: bool, moisture: f64) -> Self {
        if exposed_is_bedrock {
            Biome::Rock
        } else if moisture > 0.6 {
            Biome::Wadi
        } else if moisture < 0.05 && exposed_is_sand {
            Biome::Salt
        } else if exposed_is_sand {
            Biome::Dune
        } else {
            Biome::Flat
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bedrock_always_classifies_as_rock() {
        assert_eq!(Biome::classify(true, false, 0.9), Biome::Rock);
    }

    #[test]
    fn high_moisture_classifies_as_wadi() {
        assert_eq!(Biome::classify(false, false, 0.8), Biome::Wadi);
    }

    #[test]
    fn dry_sand_classifies_as_salt() {
        assert_eq!(Biome::classify(false, true, 0.01), Biome::Salt);
    }
}
