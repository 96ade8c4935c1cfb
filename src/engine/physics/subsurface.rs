// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jerry Snitselaar and contributors

// ABOUTME: Vertical seepage, capillary rise, horizontal pressure-driven flow, and overflow
// ABOUTME: Grounded on simulate_vertical_seepage/calculate_subsurface_flow/calculate_overflows, confined to the active mask

use std::collections::HashMap;
use std::collections::HashSet;

use crate::engine::config::SimulationConfig;
use crate::engine::core::{Grid2D, LayerGrid, SoilLayer, Terrain, FLOWABLE_LAYERS};

use super::connectivity::ConnectivityCache;
use super::pool::WaterPool;

pub type Cell = (usize, usize);

/// Dense state the subsurface simulator reads and mutates every phase.
pub struct SubsurfaceGrids {
    /// Water stored per layer; index 0 (bedrock) is always 0.
    pub water: LayerGrid<i32>,
    /// Per-tick wellspring emission rate.
    pub wellspring: Grid2D<i32>,
}

impl SubsurfaceGrids {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            water: LayerGrid::new(crate::engine::core::LAYER_COUNT, width, height, 0),
            wellspring: Grid2D::new(width, height, 0),
        }
    }

    pub fn total_subsurface_water(&self, x: usize, y: usize) -> i32 {
        FLOWABLE_LAYERS
            .iter()
            .map(|l| *self.water.get(l.index(), x, y))
            .sum()
    }
}

fn hydraulic_head(terrain: &Terrain, grids: &SubsurfaceGrids, x: usize, y: usize, layer: SoilLayer) -> i32 {
    let bottom = terrain.layer_bottom(x, y, layer);
    let max_storage = terrain.max_storage(x, y, layer);
    let water_in_layer = *grids.water.get(layer.index(), x, y);

    if max_storage > 0 && water_in_layer > 0 {
        let layer_depth = terrain.layer_top(x, y, layer) - bottom;
        let water_height = (water_in_layer * layer_depth) / max_storage;
        bottom + water_height
    } else {
        bottom
    }
}

/// Boolean dilation (1 cell, 4-neighbour) of the set of cells with any
/// subsurface water or a wellspring.
fn build_active_mask(terrain: &Terrain, grids: &SubsurfaceGrids) -> HashSet<Cell> {
    let mut base = HashSet::new();
    for y in 0..terrain.height() {
        for x in 0..terrain.width() {
            if grids.total_subsurface_water(x, y) > 0 || *grids.wellspring.get(x, y) > 0 {
                base.insert((x, y));
            }
        }
    }

    let mut dilated = base.clone();
    for &(x, y) in &base {
        for (dx, dy) in super::connectivity::NEIGHBOR_OFFSETS {
            let nx = x as i32 + dx;
            let ny = y as i32 + dy;
            if nx >= 0 && ny >= 0 && (nx as usize) < terrain.width() && (ny as usize) < terrain.height() {
                dilated.insert((nx as usize, ny as usize));
            }
        }
    }
    dilated
}

/// §4.4.1 wellspring injection: draw the aggregate desired rate from the
/// pool, scale down proportionally if the pool can't cover it, deposit
/// into regolith.
fn inject_wellsprings(
    terrain: &Terrain,
    grids: &mut SubsurfaceGrids,
    pool: &mut WaterPool,
    raining: bool,
    rain_mult: i32,
) {
    let mult = if raining { rain_mult } else { 100 };
    let mut desired: Vec<(Cell, i64)> = Vec::new();
    let mut total_desired: i64 = 0;

    for y in 0..terrain.height() {
        for x in 0..terrain.width() {
            let base = *grids.wellspring.get(x, y);
            if base > 0 {
                let d = (base as i64 * mult as i64) / 100;
                desired.push(((x, y), d));
                total_desired += d;
            }
        }
    }
    if total_desired <= 0 {
        return;
    }

    let actual = pool.wellspring_draw(total_desired);
    for ((x, y), d) in desired {
        let share = if actual >= total_desired {
            d
        } else {
            (d * actual) / total_desired
        };
        if share > 0 {
            let layer = SoilLayer::Regolith;
            let cur = *grids.water.get(layer.index(), x, y);
            grids.water.set(layer.index(), x, y, cur + share as i32);
        }
    }
}

/// §4.4.2 vertical seepage, top-down into a single delta accumulator so
/// water never crosses more than one layer boundary in a tick (the
/// "waterfall" artifact this guards against).
///
/// Returns the per-cell capillary rise to add to surface water later.
fn vertical_seepage_and_capillary(
    terrain: &Terrain,
    grids: &mut SubsurfaceGrids,
    water_grid: &Grid2D<i32>,
    active: &HashSet<Cell>,
    config: &SimulationConfig,
) -> HashMap<Cell, i32> {
    let pairs = [
        (SoilLayer::Organics, SoilLayer::Topsoil),
        (SoilLayer::Topsoil, SoilLayer::Eluviation),
        (SoilLayer::Eluviation, SoilLayer::Subsoil),
        (SoilLayer::Subsoil, SoilLayer::Regolith),
    ];

    let mut delta: HashMap<(Cell, SoilLayer), i32> = HashMap::new();

    for &(src, dst) in &pairs {
        for &(x, y) in active {
            let source_water = *grids.water.get(src.index(), x, y);
            if source_water <= 0 {
                continue;
            }
            let capacity = (terrain.max_storage(x, y, dst) - *grids.water.get(dst.index(), x, y)).max(0);
            if capacity <= 0 {
                continue;
            }
            let perm = terrain.permeability_vertical(x, y, src);
            let seep_potential = (source_water as i64 * perm as i64 * config.vertical_seepage_rate as i64) / 10000;
            let seep = (seep_potential as i32).min(capacity).min(source_water);
            if seep > 0 {
                *delta.entry(((x, y), src)).or_insert(0) -= seep;
                *delta.entry(((x, y), dst)).or_insert(0) += seep;
            }
        }
    }

    for ((x, y), layer) in delta.keys().cloned().collect::<Vec<_>>() {
        let d = delta[&((x, y), layer)];
        let cur = *grids.water.get(layer.index(), x, y);
        grids.water.set(layer.index(), x, y, (cur + d).max(0));
    }

    // Bedrock pressure: excess regolith above max storage pushed up to subsoil.
    for &(x, y) in active {
        let regolith_capacity = terrain.max_storage(x, y, SoilLayer::Regolith);
        let regolith_water = *grids.water.get(SoilLayer::Regolith.index(), x, y);
        if regolith_water > regolith_capacity {
            let excess = regolith_water - regolith_capacity;
            grids.water.set(SoilLayer::Regolith.index(), x, y, regolith_capacity);
            let subsoil_cur = *grids.water.get(SoilLayer::Subsoil.index(), x, y);
            grids.water.set(SoilLayer::Subsoil.index(), x, y, subsoil_cur + excess);
        }
    }

    // §4.4.3 capillary rise: only where surface is dry, from the single
    // topmost wet layer among organics/topsoil/eluviation.
    let mut capillary_rises = HashMap::new();
    for &(x, y) in active {
        if *water_grid.get(x, y) >= 10 {
            continue;
        }
        for layer in [SoilLayer::Organics, SoilLayer::Topsoil, SoilLayer::Eluviation] {
            let source_water = *grids.water.get(layer.index(), x, y);
            if terrain.layer_depth(x, y, layer) > 0 && source_water > 0 {
                let perm = terrain.permeability_vertical(x, y, layer);
                let rise = ((source_water as i64 * perm as i64 * config.capillary_rise_rate as i64) / 10000) as i32;
                let rise = rise.min(source_water);
                if rise > 0 {
                    grids.water.set(layer.index(), x, y, source_water - rise);
                    capillary_rises.insert((x, y), rise);
                }
                break;
            }
        }
    }

    capillary_rises
}

/// §4.4.4 horizontal pressure-driven flow across every connected layer
/// pair at every cardinal neighbour, using the precomputed connectivity
/// cache. Flow candidates are the active set plus their neighbours, so a
/// dry cell adjacent to an active one can still receive water.
fn horizontal_flow(
    terrain: &Terrain,
    grids: &mut SubsurfaceGrids,
    cache: &ConnectivityCache,
    active: &HashSet<Cell>,
    config: &SimulationConfig,
) {
    let mut delta: HashMap<(Cell, SoilLayer), i32> = HashMap::new();

    for &src_layer in FLOWABLE_LAYERS.iter() {
        for &(x, y) in active {
            let source_water = *grids.water.get(src_layer.index(), x, y);
            if source_water <= 0 {
                continue;
            }
            let my_head = hydraulic_head(terrain, grids, x, y, src_layer);

            let mut targets: Vec<(Cell, SoilLayer, i32, f32)> = Vec::new();
            let mut total_pressure: i64 = 0;

            for (dx, dy, tgt_layer, mask, fraction) in cache.get_all_connections(src_layer) {
                let idx = y * terrain.width() + x;
                if !mask[idx] {
                    continue;
                }
                let nx = (x as i32 + dx) as usize;
                let ny = (y as i32 + dy) as usize;
                let tgt_head = hydraulic_head(terrain, grids, nx, ny, tgt_layer);
                let diff = my_head - tgt_head;
                if diff > config.subsurface_flow_threshold {
                    let effective = (diff as f32 * fraction[idx]) as i64;
                    if effective > 0 {
                        targets.push(((nx, ny), tgt_layer, diff, fraction[idx]));
                        total_pressure += effective;
                    }
                }
            }

            if targets.is_empty() || total_pressure <= 0 {
                continue;
            }

            let perm = terrain.permeability_horizontal(x, y, src_layer);
            let transferable =
                (source_water as i64 * perm as i64 * config.subsurface_flow_rate as i64) / 10000;

            let mut total_transferred: i64 = 0;
            for (target, tgt_layer, diff, fraction) in targets {
                let effective = (diff as f32 * fraction) as i64;
                let portion = (transferable * effective) / total_pressure;
                if portion > 0 {
                    *delta.entry((target, tgt_layer)).or_insert(0) += portion as i32;
                    total_transferred += portion;
                }
            }
            if total_transferred > 0 {
                *delta.entry(((x, y), src_layer)).or_insert(0) -= total_transferred as i32;
            }
        }
    }

    apply_delta(grids, &delta);
}

/// §4.4.5 overflow: any layer above max storage redistributes the excess
/// to connected lower-head neighbours first, or surfaces it if none exist.
fn overflow(
    terrain: &Terrain,
    grids: &mut SubsurfaceGrids,
    cache: &ConnectivityCache,
    active: &HashSet<Cell>,
) -> HashMap<Cell, i32> {
    let mut sub_delta: HashMap<(Cell, SoilLayer), i32> = HashMap::new();
    let mut surf_delta: HashMap<Cell, i32> = HashMap::new();

    for &src_layer in FLOWABLE_LAYERS.iter().rev() {
        for &(x, y) in active {
            let max_storage = terrain.max_storage(x, y, src_layer);
            let current = *grids.water.get(src_layer.index(), x, y);
            if current <= max_storage {
                continue;
            }
            let overflow_amount = current - max_storage;
            let my_head = hydraulic_head(terrain, grids, x, y, src_layer);

            let mut targets: Vec<(Cell, i64)> = Vec::new();
            let mut total_diff: i64 = 0;
            for (dx, dy, tgt_layer, mask, _fraction) in cache.get_all_connections(src_layer) {
                if tgt_layer != src_layer {
                    continue;
                }
                let idx = y * terrain.width() + x;
                if !mask[idx] {
                    continue;
                }
                let nx = (x as i32 + dx) as usize;
                let ny = (y as i32 + dy) as usize;
                let tgt_head = hydraulic_head(terrain, grids, nx, ny, src_layer);
                let diff = (my_head - tgt_head) as i64;
                if diff > 0 {
                    targets.push(((nx, ny), diff));
                    total_diff += diff;
                }
            }

            if targets.is_empty() {
                *sub_delta.entry(((x, y), src_layer)).or_insert(0) -= overflow_amount;
                *surf_delta.entry((x, y)).or_insert(0) += overflow_amount;
                continue;
            }

            let mut total_transferred: i64 = 0;
            for (target, diff) in targets {
                let portion = if total_diff > 0 {
                    (overflow_amount as i64 * diff) / total_diff
                } else {
                    0
                };
                if portion > 0 {
                    *sub_delta.entry((target, src_layer)).or_insert(0) += portion as i32;
                    total_transferred += portion;
                }
            }
            if total_transferred > 0 {
                *sub_delta.entry(((x, y), src_layer)).or_insert(0) -= total_transferred as i32;
            }
        }
    }

    apply_delta(grids, &sub_delta);
    surf_delta
}

fn apply_delta(grids: &mut SubsurfaceGrids, delta: &HashMap<(Cell, SoilLayer), i32>) {
    for (&((x, y), layer), &d) in delta {
        let cur = *grids.water.get(layer.index(), x, y);
        grids.water.set(layer.index(), x, y, (cur + d).max(0));
    }
}

/// Result of a subsurface tick, summarising what surfaced for the caller
/// to fold into `water_grid` and the active-water set.
pub struct SubsurfaceTickOutcome {
    pub surfaced: HashMap<Cell, i32>,
}

/// Run one subsurface phase: wellspring injection, vertical seepage,
/// capillary rise, horizontal flow, overflow. Confined to the active mask
/// (water-bearing cells dilated by one cell). The connectivity cache must
/// already be valid; the orchestrator is responsible for that.
pub fn tick(
    terrain: &Terrain,
    grids: &mut SubsurfaceGrids,
    water_grid: &Grid2D<i32>,
    pool: &mut WaterPool,
    cache: &ConnectivityCache,
    raining: bool,
    config: &SimulationConfig,
) -> SubsurfaceTickOutcome {
    inject_wellsprings(terrain, grids, pool, raining, config.rain_wellspring_multiplier);

    let active = build_active_mask(terrain, grids);

    let capillary = vertical_seepage_and_capillary(terrain, grids, water_grid, &active, config);
    horizontal_flow(terrain, grids, cache, &active, config);
    let mut surfaced = overflow(terrain, grids, cache, &active);

    for (cell, amount) in capillary {
        *surfaced.entry(cell).or_insert(0) += amount;
    }

    SubsurfaceTickOutcome { surfaced }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::core::Terrain;

    fn test_config() -> SimulationConfig {
        SimulationConfig::default()
    }

    #[test]
    fn wellspring_on_depleted_pool_deposits_exactly_what_was_drawn() {
        let terrain = Terrain::flat(1, 1, 0, 60);
        let mut grids = SubsurfaceGrids::new(1, 1);
        grids.wellspring.set(0, 0, 100);
        let mut pool = WaterPool::new(10, 0);

        inject_wellsprings(&terrain, &mut grids, &mut pool, false, 200);

        assert_eq!(pool.total_volume, 0);
        assert_eq!(*grids.water.get(SoilLayer::Regolith.index(), 0, 0), 10);
    }

    #[test]
    fn over_capacity_regolith_pushes_up_to_subsoil() {
        let terrain = Terrain::flat(1, 1, 0, 60);
        let mut grids = SubsurfaceGrids::new(1, 1);
        let capacity = terrain.max_storage(0, 0, SoilLayer::Regolith);
        grids.water.set(SoilLayer::Regolith.index(), 0, 0, capacity + 5);

        let water_grid = Grid2D::new(1, 1, 0);
        let active: HashSet<Cell> = [(0usize, 0usize)].into_iter().collect();
        vertical_seepage_and_capillary(&terrain, &mut grids, &water_grid, &active, &test_config());

        assert!(*grids.water.get(SoilLayer::Regolith.index(), 0, 0) <= capacity);
        assert!(*grids.water.get(SoilLayer::Subsoil.index(), 0, 0) > 0);
    }

    #[test]
    fn capillary_rise_only_when_surface_dry() {
        let terrain = Terrain::flat(1, 1, 0, 60);
        let mut grids = SubsurfaceGrids::new(1, 1);
        grids.water.set(SoilLayer::Topsoil.index(), 0, 0, 20);

        let mut wet_surface = Grid2D::new(1, 1, 0);
        wet_surface.set(0, 0, 50); // >= 10, surface considered wet
        let active: HashSet<Cell> = [(0usize, 0usize)].into_iter().collect();
        let rises = vertical_seepage_and_capillary(&terrain, &mut grids, &wet_surface, &active, &test_config());
        assert!(rises.is_empty());
    }

    #[test]
    fn disconnected_stacks_do_not_exchange_water_horizontally() {
        let mut terrain = Terrain::flat(2, 1, 0, 10);
        for _ in 0..50 {
            terrain.raise_ground(0, 0);
        }
        let mut cache = ConnectivityCache::new(2, 1);
        cache.rebuild_if_needed(&terrain);

        let mut grids = SubsurfaceGrids::new(2, 1);
        grids.water.set(SoilLayer::Organics.index(), 0, 0, 40);
        let active: HashSet<Cell> = [(0usize, 0usize), (1usize, 0usize)].into_iter().collect();
        horizontal_flow(&terrain, &mut grids, &cache, &active, &test_config());

        assert_eq!(*grids.water.get(SoilLayer::Organics.index(), 1, 0), 0);
    }
}
