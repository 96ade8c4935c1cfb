// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jerry Snitselaar and contributors

// ABOUTME: Per-cell six-layer soil column storage and the player terrain-editing operations
// ABOUTME: Grounded on the fixed-layer terrain model (original TerrainColumn) generalized to dense grids

use serde::{Deserialize, Serialize};

use super::grid::{Grid2D, LayerGrid};
use super::material::{Material, SoilLayer, LAYER_COUNT};

/// Amount a single dig or raise action moves the exposed layer, in depth units.
pub const DIG_STEP: i32 = 2;

/// Trench geometry mode, named per the player-side dig_trench contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrenchMode {
    Flat,
    SlopeDown,
    SlopeUp,
}

/// What `lower_ground` is allowed to remove once all soil layers are empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LowerLimit {
    /// Stop once bedrock is reached; no-op if soil is already empty.
    SoilOnly,
    /// Soil exhausted: continue into bedrock, subject to `min_bedrock_elevation`.
    Bedrock,
}

/// Outcome of a mutating terrain operation, for the caller to translate into
/// a message-queue entry. The core never raises exceptions across this
/// boundary (see the error taxonomy): refusals and bounds violations are
/// values, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerrainOpOutcome {
    Applied,
    OutOfBounds,
    RefusedBedrockFloor,
    RefusedNothingToDig,
}

/// Dense six-layer soil column storage for the whole grid, plus the
/// derived-property grids (permeability, porosity) kept in sync with the
/// material assignment.
#[derive(Clone, Serialize, Deserialize)]
pub struct Terrain {
    width: usize,
    height: usize,
    bedrock_base: Grid2D<i32>,
    layer_depth: LayerGrid<i32>,
    layer_material: LayerGrid<Option<Material>>,
    permeability_vert: LayerGrid<i32>,
    permeability_horiz: LayerGrid<i32>,
    porosity: LayerGrid<i32>,
    min_bedrock_elevation: i32,
}

impl Terrain {
    /// Build a flat default terrain: constant bedrock base and a typical
    /// desert soil-depth distribution (regolith 30%, subsoil 30%,
    /// eluviation 15%, topsoil 25%, organics empty), matching the
    /// `create_default_terrain` helper this is grounded on.
    pub fn flat(width: usize, height: usize, bedrock_base: i32, total_soil_depth: i32) -> Self {
        let mut terrain = Self {
            width,
            height,
            bedrock_base: Grid2D::new(width, height, bedrock_base),
            layer_depth: LayerGrid::new(LAYER_COUNT, width, height, 0),
            layer_material: LayerGrid::new(LAYER_COUNT, width, height, None),
            permeability_vert: LayerGrid::new(LAYER_COUNT, width, height, 0),
            permeability_horiz: LayerGrid::new(LAYER_COUNT, width, height, 0),
            porosity: LayerGrid::new(LAYER_COUNT, width, height, 0),
            min_bedrock_elevation: -1000,
        };

        let regolith = (total_soil_depth * 30) / 100;
        let subsoil = (total_soil_depth * 30) / 100;
        let eluviation = (total_soil_depth * 15) / 100;
        let topsoil = (total_soil_depth * 25) / 100;

        for (x, y) in terrain.layer_depth.coords() {
            terrain.set_layer_depth_raw(x, y, SoilLayer::Bedrock, 10, None);
            terrain.set_layer_depth_raw(x, y, SoilLayer::Regolith, regolith, Some(Material::Gravel));
            terrain.set_layer_depth_raw(x, y, SoilLayer::Subsoil, subsoil, Some(Material::Sand));
            terrain.set_layer_depth_raw(x, y, SoilLayer::Eluviation, eluviation, Some(Material::Silt));
            terrain.set_layer_depth_raw(x, y, SoilLayer::Topsoil, topsoil, Some(Material::Dirt));
            terrain.set_layer_depth_raw(x, y, SoilLayer::Organics, 0, None);
        }

        terrain
    }

    pub fn width(&self) -> usize {
        self.width
    }
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn set_min_bedrock_elevation(&mut self, floor: i32) {
        self.min_bedrock_elevation = floor;
    }

    fn set_layer_depth_raw(
        &mut self,
        x: usize,
        y: usize,
        layer: SoilLayer,
        depth: i32,
        material: Option<Material>,
    ) {
        let depth = depth.max(0);
        self.layer_depth.set(layer.index(), x, y, depth);
        self.layer_material.set(layer.index(), x, y, material);
        let (pv, ph, po) = match material {
            Some(m) => {
                let p = m.properties();
                (p.permeability_vertical, p.permeability_horizontal, p.porosity)
            }
            None => (0, 0, 0),
        };
        self.permeability_vert.set(layer.index(), x, y, pv);
        self.permeability_horiz.set(layer.index(), x, y, ph);
        self.porosity.set(layer.index(), x, y, po);
    }

    pub fn layer_depth(&self, x: usize, y: usize, layer: SoilLayer) -> i32 {
        *self.layer_depth.get(layer.index(), x, y)
    }

    pub fn layer_material(&self, x: usize, y: usize, layer: SoilLayer) -> Option<Material> {
        *self.layer_material.get(layer.index(), x, y)
    }

    pub fn permeability_vertical(&self, x: usize, y: usize, layer: SoilLayer) -> i32 {
        *self.permeability_vert.get(layer.index(), x, y)
    }

    pub fn permeability_horizontal(&self, x: usize, y: usize, layer: SoilLayer) -> i32 {
        *self.permeability_horiz.get(layer.index(), x, y)
    }

    pub fn porosity(&self, x: usize, y: usize, layer: SoilLayer) -> i32 {
        *self.porosity.get(layer.index(), x, y)
    }

    pub fn bedrock_base(&self, x: usize, y: usize) -> i32 {
        *self.bedrock_base.get(x, y)
    }

    /// Bottom elevation of `layer` at (x, y): bedrock base plus the sum of
    /// every layer strictly below it.
    pub fn layer_bottom(&self, x: usize, y: usize, layer: SoilLayer) -> i32 {
        let mut bottom = self.bedrock_base(x, y);
        for i in 0..layer.index() {
            bottom += self.layer_depth(x, y, SoilLayer::from_index(i));
        }
        bottom
    }

    pub fn layer_top(&self, x: usize, y: usize, layer: SoilLayer) -> i32 {
        self.layer_bottom(x, y, layer) + self.layer_depth(x, y, layer)
    }

    /// Maximum water storage of a layer: `depth * porosity / 100`.
    pub fn max_storage(&self, x: usize, y: usize, layer: SoilLayer) -> i32 {
        (self.layer_depth(x, y, layer) * self.porosity(x, y, layer)) / 100
    }

    /// Sum of bedrock base and every soil layer's depth.
    pub fn total_elevation(&self, x: usize, y: usize) -> i32 {
        let mut elevation = self.bedrock_base(x, y);
        for i in 0..LAYER_COUNT {
            elevation += self.layer_depth(x, y, SoilLayer::from_index(i));
        }
        elevation
    }

    /// Topmost layer with nonzero depth, scanning organics down to
    /// regolith; bedrock if every soil layer is empty.
    pub fn exposed_layer(&self, x: usize, y: usize) -> SoilLayer {
        for layer in [
            SoilLayer::Organics,
            SoilLayer::Topsoil,
            SoilLayer::Eluviation,
            SoilLayer::Subsoil,
            SoilLayer::Regolith,
        ] {
            if self.layer_depth(x, y, layer) > 0 {
                return layer;
            }
        }
        SoilLayer::Bedrock
    }

    pub fn exposed_material(&self, x: usize, y: usize) -> Option<Material> {
        let layer = self.exposed_layer(x, y);
        if layer == SoilLayer::Bedrock {
            None
        } else {
            self.layer_material(x, y, layer)
        }
    }

    /// Add `amount` to a layer's depth, assigning that layer's default
    /// material if it was previously empty.
    fn add_to_layer(&mut self, x: usize, y: usize, layer: SoilLayer, amount: i32) {
        let current = self.layer_depth(x, y, layer);
        let material = if current == 0 {
            Some(layer.default_material())
        } else {
            self.layer_material(x, y, layer)
        };
        self.set_layer_depth_raw(x, y, layer, current + amount, material);
    }

    /// Remove up to `amount` from a layer's depth, clearing the material
    /// string if it becomes empty. Returns the amount actually removed.
    fn remove_from_layer(&mut self, x: usize, y: usize, layer: SoilLayer, amount: i32) -> i32 {
        let current = self.layer_depth(x, y, layer);
        let removed = amount.min(current);
        let new_depth = current - removed;
        let material = if new_depth == 0 {
            None
        } else {
            self.layer_material(x, y, layer)
        };
        self.set_layer_depth_raw(x, y, layer, new_depth, material);
        removed
    }

    /// Remove up to `DIG_STEP` units from the exposed layer. If soil is
    /// exhausted and `limit` allows it, lower `bedrock_base` instead,
    /// subject to the configured floor.
    pub fn lower_ground(&mut self, x: usize, y: usize, limit: LowerLimit) -> TerrainOpOutcome {
        if !self.bedrock_base.in_bounds(x as i64, y as i64) {
            return TerrainOpOutcome::OutOfBounds;
        }

        let exposed = self.exposed_layer(x, y);
        if exposed != SoilLayer::Bedrock {
            self.remove_from_layer(x, y, exposed, DIG_STEP);
            return TerrainOpOutcome::Applied;
        }

        match limit {
            LowerLimit::SoilOnly => TerrainOpOutcome::RefusedNothingToDig,
            LowerLimit::Bedrock => {
                let base = self.bedrock_base(x, y);
                if base - DIG_STEP < self.min_bedrock_elevation {
                    TerrainOpOutcome::RefusedBedrockFloor
                } else {
                    self.bedrock_base.set(x, y, base - DIG_STEP);
                    TerrainOpOutcome::Applied
                }
            }
        }
    }

    /// Add a unit of organics depth, used by a completed planter. Caps at
    /// `config.max_organics_depth`; callers are expected to check that
    /// themselves (this just applies the growth).
    pub fn grow_organics(&mut self, x: usize, y: usize, amount: i32) {
        self.add_to_layer(x, y, SoilLayer::Organics, amount);
    }

    /// Add `DIG_STEP` units to the exposed layer (or regolith if every
    /// soil layer is currently empty).
    pub fn raise_ground(&mut self, x: usize, y: usize) -> TerrainOpOutcome {
        if !self.bedrock_base.in_bounds(x as i64, y as i64) {
            return TerrainOpOutcome::OutOfBounds;
        }
        let exposed = self.exposed_layer(x, y);
        let target = if exposed == SoilLayer::Bedrock {
            SoilLayer::Regolith
        } else {
            exposed
        };
        self.add_to_layer(x, y, target, DIG_STEP);
        TerrainOpOutcome::Applied
    }

    /// Dig a trench at `target`, redistributing the removed material to
    /// the four surrounding cells by priority.
    ///
    /// The four surrounding cells are supplied by the caller
    /// (`backward` = player-side, `forward` = beyond-target,
    /// `perp_a`/`perp_b` = the two cells perpendicular to the dig
    /// direction) since the player→target vector that determines them is
    /// owned by the movement/targeting system outside this core.
    ///
    /// Redistribution priority: (1) raise `forward` up to `backward`'s
    /// elevation, (2) raise whichever of `perp_a`/`perp_b` is lower to
    /// match the higher, (3) split anything left evenly between them.
    /// `SlopeDown`/`SlopeUp` additionally require a drop of
    /// `slope_drop` between backward, target, and forward.
    #[allow(clippy::too_many_arguments)]
    pub fn dig_trench(
        &mut self,
        target: (usize, usize),
        backward: (usize, usize),
        forward: (usize, usize),
        perp_a: (usize, usize),
        perp_b: (usize, usize),
        mode: TrenchMode,
        slope_drop: i32,
    ) -> TerrainOpOutcome {
        if !self.bedrock_base.in_bounds(target.0 as i64, target.1 as i64) {
            return TerrainOpOutcome::OutOfBounds;
        }

        let exposed = self.exposed_layer(target.0, target.1);
        if exposed == SoilLayer::Bedrock {
            return TerrainOpOutcome::RefusedNothingToDig;
        }

        if mode != TrenchMode::Flat {
            let back_elev = self.total_elevation(backward.0, backward.1);
            let target_elev = self.total_elevation(target.0, target.1);
            let fwd_elev = self.total_elevation(forward.0, forward.1);
            let ok = match mode {
                TrenchMode::SlopeDown => {
                    back_elev - target_elev >= slope_drop && target_elev - fwd_elev >= slope_drop
                }
                TrenchMode::SlopeUp => {
                    target_elev - back_elev >= slope_drop && fwd_elev - target_elev >= slope_drop
                }
                TrenchMode::Flat => true,
            };
            if !ok {
                return TerrainOpOutcome::RefusedNothingToDig;
            }
        }

        let mut removed = self.remove_from_layer(target.0, target.1, exposed, DIG_STEP);
        if removed <= 0 {
            return TerrainOpOutcome::RefusedNothingToDig;
        }

        // Priority 1: raise forward up to backward's elevation.
        let back_elev = self.total_elevation(backward.0, backward.1);
        let fwd_elev = self.total_elevation(forward.0, forward.1);
        if fwd_elev < back_elev && removed > 0 {
            let room = (back_elev - fwd_elev).min(removed);
            if room > 0 {
                let fwd_layer = self.exposed_layer(forward.0, forward.1);
                let fwd_layer = if fwd_layer == SoilLayer::Bedrock {
                    SoilLayer::Regolith
                } else {
                    fwd_layer
                };
                self.add_to_layer(forward.0, forward.1, fwd_layer, room);
                removed -= room;
            }
        }

        // Priority 2: raise the lower of the two perpendicular cells to match the higher.
        if removed > 0 {
            let a_elev = self.total_elevation(perp_a.0, perp_a.1);
            let b_elev = self.total_elevation(perp_b.0, perp_b.1);
            let (low, low_elev, high_elev) = if a_elev <= b_elev {
                (perp_a, a_elev, b_elev)
            } else {
                (perp_b, b_elev, a_elev)
            };
            let room = (high_elev - low_elev).min(removed);
            if room > 0 {
                let layer = self.exposed_layer(low.0, low.1);
                let layer = if layer == SoilLayer::Bedrock {
                    SoilLayer::Regolith
                } else {
                    layer
                };
                self.add_to_layer(low.0, low.1, layer, room);
                removed -= room;
            }
        }

        // Priority 3: split whatever remains evenly between the two perpendicular cells.
        if removed > 0 {
            let half = removed / 2;
            let remainder = removed % 2;
            for (i, cell) in [perp_a, perp_b].into_iter().enumerate() {
                let share = half + if i == 0 { remainder } else { 0 };
                if share > 0 {
                    let layer = self.exposed_layer(cell.0, cell.1);
                    let layer = if layer == SoilLayer::Bedrock {
                        SoilLayer::Regolith
                    } else {
                        layer
                    };
                    self.add_to_layer(cell.0, cell.1, layer, share);
                }
            }
        }

        TerrainOpOutcome::Applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exposed_layer_scans_top_down() {
        let terrain = Terrain::flat(3, 3, 0, 60);
        assert_eq!(terrain.exposed_layer(1, 1), SoilLayer::Topsoil);
    }

    #[test]
    fn lower_ground_removes_from_exposed_layer() {
        let mut terrain = Terrain::flat(3, 3, 0, 60);
        let before = terrain.layer_depth(1, 1, SoilLayer::Topsoil);
        let outcome = terrain.lower_ground(1, 1, LowerLimit::SoilOnly);
        assert_eq!(outcome, TerrainOpOutcome::Applied);
        assert_eq!(
            terrain.layer_depth(1, 1, SoilLayer::Topsoil),
            before - DIG_STEP
        );
    }

    #[test]
    fn lower_ground_refuses_bedrock_below_floor() {
        let mut terrain = Terrain::flat(1, 1, -999, 0);
        terrain.set_min_bedrock_elevation(-1000);
        // No soil at all: exposed layer is bedrock immediately.
        let outcome = terrain.lower_ground(0, 0, LowerLimit::Bedrock);
        assert_eq!(outcome, TerrainOpOutcome::Applied);
        assert_eq!(terrain.bedrock_base(0, 0), -1001);
        let outcome = terrain.lower_ground(0, 0, LowerLimit::Bedrock);
        assert_eq!(outcome, TerrainOpOutcome::RefusedBedrockFloor);
    }

    #[test]
    fn raise_ground_assigns_default_material_to_empty_layer() {
        let mut terrain = Terrain::flat(1, 1, 0, 0);
        assert_eq!(terrain.exposed_layer(0, 0), SoilLayer::Bedrock);
        terrain.raise_ground(0, 0);
        assert_eq!(terrain.layer_depth(0, 0, SoilLayer::Regolith), DIG_STEP);
        assert_eq!(
            terrain.layer_material(0, 0, SoilLayer::Regolith),
            Some(Material::Gravel)
        );
    }

    #[test]
    fn dig_trench_clears_material_when_layer_emptied() {
        let mut terrain = Terrain::flat(3, 1, 0, 2); // thin soil so digging empties it
        let outcome = terrain.dig_trench(
            (1, 0),
            (0, 0),
            (2, 0),
            (1, 0),
            (1, 0),
            TrenchMode::Flat,
            0,
        );
        assert_eq!(outcome, TerrainOpOutcome::Applied);
    }

    #[test]
    fn total_elevation_matches_bedrock_plus_layers() {
        let terrain = Terrain::flat(1, 1, 5, 60);
        let mut expected = 5;
        for i in 0..LAYER_COUNT {
            expected += terrain.layer_depth(0, 0, SoilLayer::from_index(i));
        }
        assert_eq!(terrain.total_elevation(0, 0), expected);
    }
}
