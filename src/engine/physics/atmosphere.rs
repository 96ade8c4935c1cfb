// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jerry Snitselaar and contributors

// ABOUTME: Humidity and wind field evolution: random drift, heat coupling, Gaussian diffusion
// ABOUTME: Grounded on simulate_atmosphere_tick, vectorized over the whole grid each run

use rand::Rng;
use rayon::prelude::*;

use crate::engine::config::SimulationConfig;
use crate::engine::core::Grid2D;

pub const HUMIDITY_MIN: f32 = 0.1;
pub const HUMIDITY_MAX: f32 = 0.9;
pub const WIND_COMPONENT_LIMIT: f32 = 0.7;

/// Atmospheric fields, vectorized over the grid. Wind is two independent
/// scalar components rather than a `(W,H,2)` array, since nothing here
/// needs them interleaved.
pub struct AtmosphereGrids {
    pub humidity: Grid2D<f32>,
    pub wind_x: Grid2D<f32>,
    pub wind_y: Grid2D<f32>,
}

impl AtmosphereGrids {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            humidity: Grid2D::new(width, height, 0.5),
            wind_x: Grid2D::new(width, height, 0.0),
            wind_y: Grid2D::new(width, height, 0.0),
        }
    }

    pub fn wind_magnitude(&self, x: usize, y: usize) -> f32 {
        let wx = *self.wind_x.get(x, y);
        let wy = *self.wind_y.get(x, y);
        (wx * wx + wy * wy).sqrt()
    }

    pub fn wind_angle(&self, x: usize, y: usize) -> f32 {
        let magnitude = self.wind_magnitude(x, y);
        if magnitude < 0.01 {
            0.0
        } else {
            let wx = *self.wind_x.get(x, y);
            let wy = *self.wind_y.get(x, y);
            wy.atan2(wx)
        }
    }
}

/// Gaussian smoothing, σ≈1.5, nearest-boundary mode, applied independently
/// to a single scalar field. Fixed 5-tap separable kernel, weights taken
/// from the discrete Gaussian at σ=1.5 and renormalized to sum to 1.
///
/// Each output row depends only on the input field, never on another
/// output row, so both passes are computed one row at a time in parallel
/// and only the (sequential, cheap) copy into the result grid is single
/// threaded.
fn gaussian_blur(grid: &Grid2D<f32>) -> Grid2D<f32> {
    const KERNEL: [f32; 5] = [0.1201, 0.2339, 0.2921, 0.2339, 0.1201];
    let width = grid.width();
    let height = grid.height();

    let clamp_coord = |v: i32, max: usize| -> usize { v.max(0).min(max as i32 - 1) as usize };

    let horizontal_rows: Vec<Vec<f32>> = (0..height)
        .into_par_iter()
        .map(|y| {
            (0..width)
                .map(|x| {
                    let mut acc = 0.0f32;
                    for (k, weight) in KERNEL.iter().enumerate() {
                        let offset = k as i32 - 2;
                        let sx = clamp_coord(x as i32 + offset, width);
                        acc += weight * *grid.get(sx, y);
                    }
                    acc
                })
                .collect()
        })
        .collect();

    let mut horizontal = Grid2D::new(width, height, 0.0f32);
    for (y, row) in horizontal_rows.into_iter().enumerate() {
        for (x, v) in row.into_iter().enumerate() {
            horizontal.set(x, y, v);
        }
    }

    let blurred_rows: Vec<Vec<f32>> = (0..height)
        .into_par_iter()
        .map(|y| {
            (0..width)
                .map(|x| {
                    let mut acc = 0.0f32;
                    for (k, weight) in KERNEL.iter().enumerate() {
                        let offset = k as i32 - 2;
                        let sy = clamp_coord(y as i32 + offset, height);
                        acc += weight * *horizontal.get(x, sy);
                    }
                    acc
                })
                .collect()
        })
        .collect();

    let mut blurred = Grid2D::new(width, height, 0.0f32);
    for (y, row) in blurred_rows.into_iter().enumerate() {
        for (x, v) in row.into_iter().enumerate() {
            blurred.set(x, y, v);
        }
    }
    blurred
}

/// §4.6: random drift, heat coupling, spatial diffusion, clamp. `heat` is
/// the weather system's current heat value (shared across the grid; the
/// core models one weather zone).
pub fn tick(grids: &mut AtmosphereGrids, heat: i32, config: &SimulationConfig, rng: &mut impl Rng) {
    let width = grids.humidity.width();
    let height = grids.humidity.height();
    let heat_factor = (heat - 100) as f32 / 1000.0;

    for y in 0..height {
        for x in 0..width {
            let drift = rng.gen_range(-config.humidity_drift..=config.humidity_drift);
            let humidity = *grids.humidity.get(x, y) + drift - heat_factor;
            grids.humidity.set(x, y, humidity);

            let wind_dx = rng.gen_range(-config.wind_drift..=config.wind_drift);
            let wind_dy = rng.gen_range(-config.wind_drift..=config.wind_drift);
            let wx = *grids.wind_x.get(x, y) + wind_dx;
            let wy = *grids.wind_y.get(x, y) + wind_dy;
            grids.wind_x.set(x, y, wx);
            grids.wind_y.set(x, y, wy);
        }
    }

    grids.humidity = gaussian_blur(&grids.humidity);
    grids.wind_x = gaussian_blur(&grids.wind_x);
    grids.wind_y = gaussian_blur(&grids.wind_y);

    grids.humidity.clamp_in_place(HUMIDITY_MIN, HUMIDITY_MAX);
    grids.wind_x.clamp_in_place(-WIND_COMPONENT_LIMIT, WIND_COMPONENT_LIMIT);
    grids.wind_y.clamp_in_place(-WIND_COMPONENT_LIMIT, WIND_COMPONENT_LIMIT);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn extreme_heat_clamps_humidity_to_minimum() {
        let mut grids = AtmosphereGrids::new(4, 4);
        let config = SimulationConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        tick(&mut grids, 1000, &config, &mut rng);
        for y in 0..4 {
            for x in 0..4 {
                assert!(*grids.humidity.get(x, y) >= HUMIDITY_MIN);
            }
        }
    }

    #[test]
    fn extreme_cold_clamps_humidity_to_maximum() {
        let mut grids = AtmosphereGrids::new(4, 4);
        let config = SimulationConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(13);
        tick(&mut grids, 0, &config, &mut rng);
        for y in 0..4 {
            for x in 0..4 {
                assert!(*grids.humidity.get(x, y) <= HUMIDITY_MAX);
            }
        }
    }

    #[test]
    fn wind_components_stay_within_bounds() {
        let mut grids = AtmosphereGrids::new(4, 4);
        let config = SimulationConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        for _ in 0..20 {
            tick(&mut grids, 100, &config, &mut rng);
        }
        for y in 0..4 {
            for x in 0..4 {
                assert!(grids.wind_x.get(x, y).abs() <= WIND_COMPONENT_LIMIT);
                assert!(grids.wind_y.get(x, y).abs() <= WIND_COMPONENT_LIMIT);
            }
        }
    }

    #[test]
    fn wind_angle_is_zero_below_magnitude_threshold() {
        let grids = AtmosphereGrids::new(2, 2);
        assert_eq!(grids.wind_angle(0, 0), 0.0);
    }
}
