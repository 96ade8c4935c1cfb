// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jerry Snitselaar and contributors

// ABOUTME: 8-direction surface water flow and surface-to-soil seepage
// ABOUTME: Grounded on simulate_surface_flow/simulate_surface_seepage, collapsed from sub-tile to single-cell resolution

use std::collections::HashMap;

use rand::Rng;

use crate::engine::config::SimulationConfig;
use crate::engine::core::{Grid2D, SoilLayer, Terrain};

use super::pool::WaterPool;

pub const MOORE_OFFSETS: [(i32, i32); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

/// Elevation treated as an infinitely low sink for cells beyond the grid
/// edge, so the flow kernel always finds a downhill direction there.
const EDGE_SINK_LEVEL: i32 = -10_000;

fn surface_level(terrain: &Terrain, water_grid: &Grid2D<i32>, x: usize, y: usize) -> i32 {
    terrain.total_elevation(x, y) + *water_grid.get(x, y)
}

/// §4.5 flow kernel: downhill-only 8-neighbour transfer with probabilistic
/// rounding so sub-unit currents stay mobile. `rng` is the caller-supplied
/// PRNG, the only source of non-determinism in the core.
///
/// Processed direction-major over the 8 `MOORE_OFFSETS` rather than
/// cell-major: each pass refills `random_buffer` with one fresh draw per
/// cell and consumes it immediately, so the whole tick reuses a single
/// preallocated W×H scratch instead of drawing per cell per direction.
pub fn flow(
    terrain: &Terrain,
    water_grid: &mut Grid2D<i32>,
    trench_grid: &Grid2D<u8>,
    pool: &mut WaterPool,
    config: &SimulationConfig,
    random_buffer: &mut Grid2D<f64>,
    rng: &mut impl Rng,
) {
    let width = terrain.width();
    let height = terrain.height();

    let mut diff_sum = Grid2D::<i64>::new(width, height, 0);
    let mut budget = Grid2D::<i64>::new(width, height, 0);
    for y in 0..height {
        for x in 0..width {
            let water = *water_grid.get(x, y);
            if water <= 0 {
                continue;
            }
            let here = surface_level(terrain, water_grid, x, y);

            let mut sum: i64 = 0;
            for (dx, dy) in MOORE_OFFSETS.iter() {
                let nx = x as i32 + dx;
                let ny = y as i32 + dy;
                let neighbour_level = if nx < 0 || ny < 0 || nx as usize >= width || ny as usize >= height {
                    EDGE_SINK_LEVEL
                } else {
                    surface_level(terrain, water_grid, nx as usize, ny as usize)
                };
                sum += (here - neighbour_level).max(0) as i64;
            }
            if sum <= 0 {
                continue;
            }
            diff_sum.set(x, y, sum);

            let mut b = (water as i64 * config.surface_flow_rate as i64) / 100;
            if *trench_grid.get(x, y) != 0 {
                b = (b * config.trench_flow_multiplier_pct as i64) / 100;
            }
            budget.set(x, y, b);
        }
    }

    let mut delta: HashMap<(usize, usize), i32> = HashMap::new();
    let mut edge_total: i64 = 0;

    for (dx, dy) in MOORE_OFFSETS.iter() {
        for v in random_buffer.data_mut() {
            *v = rng.gen::<f64>();
        }

        for y in 0..height {
            for x in 0..width {
                let sum = *diff_sum.get(x, y);
                if sum <= 0 {
                    continue;
                }
                let b = *budget.get(x, y);
                if b <= 0 {
                    continue;
                }

                let here = surface_level(terrain, water_grid, x, y);
                let nx = x as i32 + dx;
                let ny = y as i32 + dy;
                let out_of_bounds = nx < 0 || ny < 0 || nx as usize >= width || ny as usize >= height;
                let neighbour_level = if out_of_bounds {
                    EDGE_SINK_LEVEL
                } else {
                    surface_level(terrain, water_grid, nx as usize, ny as usize)
                };
                let diff = (here - neighbour_level).max(0);
                if diff <= 0 {
                    continue;
                }

                let ideal = (b as f64 * diff as f64) / sum as f64;
                let draw = *random_buffer.get(x, y);
                let flow = (ideal + draw).floor() as i64;
                if flow <= 0 {
                    continue;
                }

                if out_of_bounds {
                    edge_total += flow;
                } else {
                    *delta.entry((nx as usize, ny as usize)).or_insert(0) += flow as i32;
                }
                *delta.entry((x, y)).or_insert(0) -= flow as i32;
            }
        }
    }

    for (&(x, y), &d) in &delta {
        let cur = *water_grid.get(x, y);
        water_grid.set(x, y, (cur + d).max(0));
    }
    if edge_total > 0 {
        pool.edge_runoff(edge_total);
    }
}

/// §4.5 surface → topmost soil seepage, offset from the flow phase.
/// Updates `moisture_grid`'s EMA with total water per cell.
pub fn seep_and_update_moisture(
    terrain: &Terrain,
    water_grid: &mut Grid2D<i32>,
    subsurface_water_total: impl Fn(usize, usize) -> i32,
    seep_target: &mut impl FnMut(usize, usize, SoilLayer, i32),
    moisture_grid: &mut Grid2D<f64>,
    config: &SimulationConfig,
) {
    for y in 0..terrain.height() {
        for x in 0..terrain.width() {
            let water = *water_grid.get(x, y);
            if water > 0 {
                let layer = terrain.exposed_layer(x, y);
                if layer != SoilLayer::Bedrock {
                    let perm = terrain.permeability_vertical(x, y, layer);
                    if perm > 0 {
                        let capacity = terrain.max_storage(x, y, layer);
                        let ideal = (water as i64 * config.surface_seepage_rate as i64 * perm as i64) / 10000;
                        let seep = (ideal as i32).min(capacity).min(water);
                        if seep > 0 {
                            water_grid.set(x, y, water - seep);
                            seep_target(x, y, layer, seep);
                        }
                    }
                }
            }

            let total = *water_grid.get(x, y) as f64 + subsurface_water_total(x, y) as f64;
            let prior = *moisture_grid.get(x, y);
            let alpha = config.moisture_ema_alpha;
            moisture_grid.set(x, y, (1.0 - alpha) * prior + alpha * total);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn flat_grid_with_single_wet_cell_spreads_downhill_only() {
        let terrain = Terrain::flat(3, 3, 0, 0);
        let mut water_grid = Grid2D::new(3, 3, 0);
        water_grid.set(1, 1, 100);
        let trench_grid = Grid2D::new(3, 3, 0u8);
        let mut pool = WaterPool::default();
        let config = SimulationConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut random_buffer = Grid2D::new(3, 3, 0.0);

        flow(
            &terrain,
            &mut water_grid,
            &trench_grid,
            &mut pool,
            &config,
            &mut random_buffer,
            &mut rng,
        );

        assert!(*water_grid.get(1, 1) < 100);
        let spread: i32 = (0..3).map(|y| (0..3).map(|x| *water_grid.get(x, y)).sum::<i32>()).sum();
        assert!(spread <= 100);
    }

    #[test]
    fn edge_runoff_credits_pool_for_water_that_leaves_the_grid() {
        let terrain = Terrain::flat(1, 1, 0, 0);
        let mut water_grid = Grid2D::new(1, 1, 0);
        water_grid.set(0, 0, 1000);
        let trench_grid = Grid2D::new(1, 1, 0u8);
        let mut pool = WaterPool::default();
        let config = SimulationConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut random_buffer = Grid2D::new(1, 1, 0.0);

        for _ in 0..10 {
            flow(
                &terrain,
                &mut water_grid,
                &trench_grid,
                &mut pool,
                &config,
                &mut random_buffer,
                &mut rng,
            );
        }

        assert!(*water_grid.get(0, 0) < 1000);
        assert!(pool.total_volume > 0);
    }

    #[test]
    fn trenched_cell_moves_more_water_than_untrenched() {
        let terrain = Terrain::flat(5, 1, 0, 0);

        let mut plain = Grid2D::new(5, 1, 0);
        plain.set(0, 0, 200);
        let no_trench = Grid2D::new(5, 1, 0u8);
        let mut pool_a = WaterPool::default();
        let config = SimulationConfig::default();
        let mut rng_a = ChaCha8Rng::seed_from_u64(1);
        let mut random_buffer_a = Grid2D::new(5, 1, 0.0);
        flow(
            &terrain,
            &mut plain,
            &no_trench,
            &mut pool_a,
            &config,
            &mut random_buffer_a,
            &mut rng_a,
        );
        let moved_plain = 200 - *plain.get(0, 0);

        let mut trenched = Grid2D::new(5, 1, 0);
        trenched.set(0, 0, 200);
        let mut with_trench = Grid2D::new(5, 1, 0u8);
        with_trench.set(0, 0, 1);
        let mut pool_b = WaterPool::default();
        let mut rng_b = ChaCha8Rng::seed_from_u64(1);
        let mut random_buffer_b = Grid2D::new(5, 1, 0.0);
        flow(
            &terrain,
            &mut trenched,
            &with_trench,
            &mut pool_b,
            &config,
            &mut random_buffer_b,
            &mut rng_b,
        );
        let moved_trenched = 200 - *trenched.get(0, 0);

        assert!(moved_trenched >= moved_plain);
    }
}
