// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jerry Snitselaar and contributors

// ABOUTME: Per-cell surface-water evaporation modulated by heat, humidity, wind, biome, structures
// ABOUTME: Grounded on apply_tile_evaporation, generalized from sub-square iteration to full-cell

use crate::engine::config::SimulationConfig;
use crate::engine::core::{Biome, Grid2D};

use super::atmosphere::AtmosphereGrids;
use super::pool::WaterPool;

/// §4.7: runs every tick over every cell with surface water.
pub fn tick(
    water_grid: &mut Grid2D<i32>,
    biome_grid: &Grid2D<Biome>,
    trench_grid: &Grid2D<u8>,
    has_cistern: impl Fn(usize, usize) -> bool,
    atmosphere: &AtmosphereGrids,
    pool: &mut WaterPool,
    heat: i32,
    config: &SimulationConfig,
) {
    let width = water_grid.width();
    let height = water_grid.height();
    let mut total_evaporated: i64 = 0;

    for y in 0..height {
        for x in 0..width {
            let water = *water_grid.get(x, y);
            if water <= 0 {
                continue;
            }

            let biome = biome_grid.get(x, y).properties();
            let base_evap = (biome.evap * heat) / 100;

            let humidity = *atmosphere.humidity.get(x, y);
            let humidity_mod = 1.5 - humidity as f64;
            let wind_mod = 1.0 + atmosphere.wind_magnitude(x, y) as f64 * 0.3;
            let modifier = humidity_mod * wind_mod;

            let mut evap = (base_evap as f64 * modifier) as i64;

            if *trench_grid.get(x, y) != 0 {
                evap = (evap * config.trench_evap_reduction as i64) / 100;
            }
            if has_cistern(x, y) {
                evap = (evap * config.cistern_evap_reduction as i64) / 100;
            }

            let retention_mod = biome.retention as i64;
            let net_loss = evap - (evap * retention_mod) / 100;
            if net_loss <= 0 {
                continue;
            }

            let removed = net_loss.min(water as i64);
            if removed > 0 {
                water_grid.set(x, y, water - removed as i32);
                total_evaporated += removed;
            }
        }
    }

    if total_evaporated > 0 {
        pool.evaporate(total_evaporated);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dry_cells_are_skipped_and_pool_unchanged() {
        let mut water_grid = Grid2D::new(2, 2, 0);
        let biome_grid = Grid2D::new(2, 2, Biome::Flat);
        let trench_grid = Grid2D::new(2, 2, 0u8);
        let atmosphere = AtmosphereGrids::new(2, 2);
        let mut pool = WaterPool::default();
        let config = SimulationConfig::default();

        tick(&mut water_grid, &biome_grid, &trench_grid, |_, _| false, &atmosphere, &mut pool, 100, &config);

        assert_eq!(pool.atmospheric_reserve, 0);
    }

    #[test]
    fn wet_cell_loses_water_to_pool() {
        let mut water_grid = Grid2D::new(1, 1, 0);
        water_grid.set(0, 0, 100);
        let biome_grid = Grid2D::new(1, 1, Biome::Flat);
        let trench_grid = Grid2D::new(1, 1, 0u8);
        let atmosphere = AtmosphereGrids::new(1, 1);
        let mut pool = WaterPool::default();
        let config = SimulationConfig::default();

        tick(&mut water_grid, &biome_grid, &trench_grid, |_, _| false, &atmosphere, &mut pool, 100, &config);

        assert!(*water_grid.get(0, 0) < 100);
        assert!(pool.atmospheric_reserve > 0);
        assert_eq!(100 - *water_grid.get(0, 0), pool.atmospheric_reserve as i32);
    }

    #[test]
    fn trench_and_cistern_reduce_evaporation() {
        let mut plain = Grid2D::new(1, 1, 0);
        plain.set(0, 0, 100);
        let mut reduced = Grid2D::new(1, 1, 0);
        reduced.set(0, 0, 100);

        let biome_grid = Grid2D::new(1, 1, Biome::Flat);
        let mut trench = Grid2D::new(1, 1, 0u8);
        trench.set(0, 0, 1);
        let no_trench = Grid2D::new(1, 1, 0u8);
        let atmosphere = AtmosphereGrids::new(1, 1);
        let mut pool_plain = WaterPool::default();
        let mut pool_reduced = WaterPool::default();
        let config = SimulationConfig::default();

        tick(&mut plain, &biome_grid, &no_trench, |_, _| false, &atmosphere, &mut pool_plain, 100, &config);
        tick(&mut reduced, &biome_grid, &trench, |_, _| true, &atmosphere, &mut pool_reduced, 100, &config);

        assert!(pool_reduced.atmospheric_reserve < pool_plain.atmospheric_reserve);
    }
}
