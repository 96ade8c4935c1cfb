// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jerry Snitselaar and contributors

// ABOUTME: Global closed-cycle water accounting (aquifer volume + atmospheric reserve)
// ABOUTME: Grounded on GlobalWaterPool; every operation clamps to non-negative and returns the actual amount transferred

use serde::{Deserialize, Serialize};

/// Two-scalar conservation ledger for the whole simulation's water cycle.
///
/// Wellsprings draw from `total_volume`; edge runoff and unmoved excess
/// return to it. Evaporation moves water into `atmospheric_reserve`; rain
/// draws it back out. Callers must use the returned amount, not the
/// requested one, to preserve conservation when a source is depleted.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct WaterPool {
    pub total_volume: i64,
    pub atmospheric_reserve: i64,
}

impl WaterPool {
    pub fn new(total_volume: i64, atmospheric_reserve: i64) -> Self {
        Self {
            total_volume: total_volume.max(0),
            atmospheric_reserve: atmospheric_reserve.max(0),
        }
    }

    /// Draw from the aquifer for wellspring injection. Returns the amount
    /// actually drawn, which may be less than requested.
    pub fn wellspring_draw(&mut self, amount: i64) -> i64 {
        let actual = amount.max(0).min(self.total_volume);
        self.total_volume -= actual;
        actual
    }

    /// Water that would have left the grid returns to the aquifer.
    pub fn edge_runoff(&mut self, amount: i64) {
        self.total_volume += amount.max(0);
    }

    /// Surface water evaporates into the atmospheric reserve.
    pub fn evaporate(&mut self, amount: i64) {
        self.atmospheric_reserve += amount.max(0);
    }

    /// Draw from the atmospheric reserve for rainfall. Returns the amount
    /// actually available.
    pub fn rain(&mut self, amount: i64) -> i64 {
        let actual = amount.max(0).min(self.atmospheric_reserve);
        self.atmospheric_reserve -= actual;
        actual
    }

    pub fn total_water(&self) -> i64 {
        self.total_volume + self.atmospheric_reserve
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wellspring_draw_clamps_to_available() {
        let mut pool = WaterPool::new(10, 0);
        assert_eq!(pool.wellspring_draw(100), 10);
        assert_eq!(pool.total_volume, 0);
        assert_eq!(pool.wellspring_draw(5), 0);
    }

    #[test]
    fn rain_clamps_to_reserve() {
        let mut pool = WaterPool::new(0, 7);
        assert_eq!(pool.rain(20), 7);
        assert_eq!(pool.atmospheric_reserve, 0);
    }

    #[test]
    fn edge_runoff_and_evaporate_only_add() {
        let mut pool = WaterPool::default();
        pool.edge_runoff(15);
        pool.evaporate(3);
        assert_eq!(pool.total_volume, 15);
        assert_eq!(pool.atmospheric_reserve, 3);
        assert_eq!(pool.total_water(), 18);
    }
}
