// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jerry Snitselaar and contributors

// ABOUTME: Soil horizon enum and material property table for the terrain column
// ABOUTME: Grounded on the layered soil model (bedrock..organics) with per-material permeability/porosity

use serde::{Deserialize, Serialize};

/// One unit of depth is 100mm, matching `DEPTH_UNIT_MM` in the configuration constants.
pub const DEPTH_UNIT_MM: i64 = 100;

/// Convert floating point meters to integer depth units.
pub fn elevation_to_units(meters: f64) -> i32 {
    (meters * 1000.0 / DEPTH_UNIT_MM as f64) as i32
}

/// Convert integer depth units to floating point meters.
pub fn units_to_meters(units: i32) -> f64 {
    units as f64 * DEPTH_UNIT_MM as f64 / 1000.0
}

/// Fixed six-layer soil horizon stack, bottom to top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum SoilLayer {
    Bedrock = 0,
    Regolith = 1,
    Subsoil = 2,
    Eluviation = 3,
    Topsoil = 4,
    Organics = 5,
}

/// Number of soil layers per cell (`L` in the data model).
pub const LAYER_COUNT: usize = 6;

/// Layers eligible to hold and move subsurface water, bottom to top.
pub const FLOWABLE_LAYERS: [SoilLayer; 5] = [
    SoilLayer::Regolith,
    SoilLayer::Subsoil,
    SoilLayer::Eluviation,
    SoilLayer::Topsoil,
    SoilLayer::Organics,
];

impl SoilLayer {
    #[inline]
    pub fn index(self) -> usize {
        self as u8 as usize
    }

    pub fn from_index(index: usize) -> Self {
        match index {
            0 => SoilLayer::Bedrock,
            1 => SoilLayer::Regolith,
            2 => SoilLayer::Subsoil,
            3 => SoilLayer::Eluviation,
            4 => SoilLayer::Topsoil,
            5 => SoilLayer::Organics,
            _ => panic!("soil layer index out of range: {index}"),
        }
    }

    /// The layer a falling vertical-seepage step drains into, if any.
    pub fn below(self) -> Option<Self> {
        if self.index() == 0 {
            None
        } else {
            Some(Self::from_index(self.index() - 1))
        }
    }

    /// Default material assigned when a previously-empty layer gains depth.
    pub fn default_material(self) -> Material {
        match self {
            SoilLayer::Bedrock => Material::Bedrock,
            SoilLayer::Regolith => Material::Gravel,
            SoilLayer::Subsoil => Material::Sand,
            SoilLayer::Eluviation => Material::Silt,
            SoilLayer::Topsoil => Material::Dirt,
            SoilLayer::Organics => Material::Humus,
        }
    }
}

/// The fixed material palette. Excavatable soils plus immutable bedrock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Material {
    Bedrock,
    Rock,
    Gravel,
    Sand,
    Dirt,
    Clay,
    Silt,
    Humus,
}

/// Physical properties of one material, all integer percentages.
#[derive(Debug, Clone, Copy)]
pub struct MaterialProperties {
    pub permeability_vertical: i32,
    pub permeability_horizontal: i32,
    pub porosity: i32,
    pub excavatable: bool,
    pub evap_multiplier: i32,
    pub display_color: (u8, u8, u8),
}

impl Material {
    pub fn properties(self) -> &'static MaterialProperties {
        match self {
            Material::Bedrock => &MATERIAL_LIBRARY[0],
            Material::Rock => &MATERIAL_LIBRARY[1],
            Material::Gravel => &MATERIAL_LIBRARY[2],
            Material::Sand => &MATERIAL_LIBRARY[3],
            Material::Dirt => &MATERIAL_LIBRARY[4],
            Material::Clay => &MATERIAL_LIBRARY[5],
            Material::Silt => &MATERIAL_LIBRARY[6],
            Material::Humus => &MATERIAL_LIBRARY[7],
        }
    }
}

/// Single source of truth for all material properties, indexed to match
/// the `Material` variant order above.
pub static MATERIAL_LIBRARY: [MaterialProperties; 8] = [
    MaterialProperties {
        permeability_vertical: 0,
        permeability_horizontal: 0,
        porosity: 0,
        excavatable: false,
        evap_multiplier: 0,
        display_color: (80, 80, 80),
    },
    MaterialProperties {
        permeability_vertical: 5,
        permeability_horizontal: 3,
        porosity: 10,
        excavatable: false,
        evap_multiplier: 90,
        display_color: (120, 120, 110),
    },
    MaterialProperties {
        permeability_vertical: 90,
        permeability_horizontal: 70,
        porosity: 25,
        excavatable: true,
        evap_multiplier: 130,
        display_color: (160, 160, 150),
    },
    MaterialProperties {
        permeability_vertical: 60,
        permeability_horizontal: 40,
        porosity: 35,
        excavatable: true,
        evap_multiplier: 120,
        display_color: (204, 174, 120),
    },
    MaterialProperties {
        permeability_vertical: 30,
        permeability_horizontal: 20,
        porosity: 40,
        excavatable: true,
        evap_multiplier: 100,
        display_color: (150, 120, 90),
    },
    MaterialProperties {
        permeability_vertical: 5,
        permeability_horizontal: 2,
        porosity: 45,
        excavatable: true,
        evap_multiplier: 70,
        display_color: (120, 100, 80),
    },
    MaterialProperties {
        permeability_vertical: 20,
        permeability_horizontal: 15,
        porosity: 42,
        excavatable: true,
        evap_multiplier: 85,
        display_color: (140, 110, 85),
    },
    MaterialProperties {
        permeability_vertical: 40,
        permeability_horizontal: 25,
        porosity: 60,
        excavatable: true,
        evap_multiplier: 60,
        display_color: (60, 50, 40),
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_roundtrip() {
        for n in [-500, -1, 0, 1, 12345] {
            assert_eq!(elevation_to_units(units_to_meters(n)), n);
        }
    }

    #[test]
    fn default_materials_match_spec_mapping() {
        assert_eq!(SoilLayer::Topsoil.default_material(), Material::Dirt);
        assert_eq!(SoilLayer::Regolith.default_material(), Material::Gravel);
        assert_eq!(SoilLayer::Organics.default_material(), Material::Humus);
    }

    #[test]
    fn bedrock_is_impermeable() {
        let props = Material::Bedrock.properties();
        assert_eq!(props.permeability_vertical, 0);
        assert_eq!(props.permeability_horizontal, 0);
        assert!(!props.excavatable);
    }

    #[test]
    fn below_chains_down_to_bedrock() {
        assert_eq!(SoilLayer::Regolith.below(), Some(SoilLayer::Bedrock));
        assert_eq!(SoilLayer::Bedrock.below(), None);
    }
}
