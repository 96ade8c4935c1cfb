// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jerry Snitselaar and contributors

// ABOUTME: Precomputed lateral connectivity between soil layers of neighbouring cells
// ABOUTME: Grounded on SubsurfaceConnectivityCache; amortises the elevation-overlap geometry test across ticks

use std::collections::HashMap;

use crate::engine::core::{SoilLayer, Terrain, FLOWABLE_LAYERS};

/// Cardinal neighbour offsets used for lateral connectivity.
pub const NEIGHBOR_OFFSETS: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

type ConnectivityKey = (u8, i32, i32, u8);

/// Cache entry for a single `(src_layer, dx, dy, tgt_layer)` combination:
/// a boolean mask and a contact-fraction grid, both W×H, flattened
/// row-major.
struct ConnectionEntry {
    mask: Vec<bool>,
    fraction: Vec<f32>,
}

/// Statistics for operational introspection, mirroring `get_stats()`.
#[derive(Debug, Clone, Copy)]
pub struct CacheStats {
    pub is_valid: bool,
    pub rebuild_count: u64,
    pub invalidate_count: u64,
    pub ticks_since_rebuild: u32,
    pub num_connections: usize,
    pub memory_estimate_bytes: usize,
}

/// Two cache-management modes: rebuild-on-invalidate only (the default,
/// fastest), or rebuild every `rebuild_frequency_ticks` regardless of
/// invalidation (paranoid/debug mode).
pub struct ConnectivityCache {
    width: usize,
    height: usize,
    connections: HashMap<ConnectivityKey, ConnectionEntry>,
    is_valid: bool,
    rebuild_frequency: Option<u32>,
    ticks_since_rebuild: u32,
    rebuild_count: u64,
    invalidate_count: u64,
}

impl ConnectivityCache {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            connections: HashMap::new(),
            is_valid: false,
            rebuild_frequency: None,
            ticks_since_rebuild: 0,
            rebuild_count: 0,
            invalidate_count: 0,
        }
    }

    /// Enable periodic rebuild mode (paranoid/debug); `None` trusts
    /// explicit invalidation only.
    pub fn set_rebuild_frequency(&mut self, ticks: Option<u32>) {
        self.rebuild_frequency = ticks;
    }

    pub fn needs_rebuild(&self) -> bool {
        if !self.is_valid {
            return true;
        }
        match self.rebuild_frequency {
            Some(freq) => self.ticks_since_rebuild >= freq,
            None => false,
        }
    }

    /// Mark the cache invalid; call after any mutation of `terrain_layers`
    /// or `bedrock_base`.
    pub fn invalidate(&mut self) {
        self.is_valid = false;
        self.invalidate_count += 1;
    }

    /// Advance the periodic-rebuild counter. Call once per subsurface tick.
    pub fn tick(&mut self) {
        if self.rebuild_frequency.is_some() {
            self.ticks_since_rebuild += 1;
        }
    }

    /// Rebuild from current terrain geometry if needed.
    pub fn rebuild_if_needed(&mut self, terrain: &Terrain) {
        if self.needs_rebuild() {
            self.rebuild(terrain);
        }
    }

    fn rebuild(&mut self, terrain: &Terrain) {
        self.connections.clear();

        for &src_layer in FLOWABLE_LAYERS.iter() {
            for (dx, dy) in NEIGHBOR_OFFSETS {
                for &tgt_layer in FLOWABLE_LAYERS.iter() {
                    let mut mask = vec![false; self.width * self.height];
                    let mut fraction = vec![0.0f32; self.width * self.height];
                    let mut any = false;

                    for y in 0..self.height {
                        for x in 0..self.width {
                            let nx = x as i32 + dx;
                            let ny = y as i32 + dy;
                            if nx < 0 || ny < 0 || nx as usize >= self.width || ny as usize >= self.height {
                                continue;
                            }
                            let (nx, ny) = (nx as usize, ny as usize);

                            let src_bot = terrain.layer_bottom(x, y, src_layer);
                            let src_top = terrain.layer_top(x, y, src_layer);
                            let tgt_bot = terrain.layer_bottom(nx, ny, tgt_layer);
                            let tgt_top = terrain.layer_top(nx, ny, tgt_layer);
                            let tgt_depth = terrain.layer_depth(nx, ny, tgt_layer);

                            let can_connect =
                                src_bot < tgt_top && tgt_bot < src_top && tgt_depth > 0;
                            if !can_connect {
                                continue;
                            }

                            let overlap = (src_top.min(tgt_top) - src_bot.max(tgt_bot)).max(0);
                            let src_height = src_top - src_bot;
                            let frac = if src_height > 0 {
                                overlap as f32 / src_height as f32
                            } else {
                                0.0
                            };

                            let idx = y * self.width + x;
                            mask[idx] = true;
                            fraction[idx] = frac;
                            any = true;
                        }
                    }

                    if any {
                        self.connections.insert(
                            (src_layer.index() as u8, dx, dy, tgt_layer.index() as u8),
                            ConnectionEntry { mask, fraction },
                        );
                    }
                }
            }
        }

        self.is_valid = true;
        self.ticks_since_rebuild = 0;
        self.rebuild_count += 1;
    }

    /// Look up cached connectivity for one `(src_layer, dx, dy, tgt_layer)`.
    pub fn get_connectivity(
        &self,
        src_layer: SoilLayer,
        dx: i32,
        dy: i32,
        tgt_layer: SoilLayer,
    ) -> Option<(&[bool], &[f32])> {
        self.connections
            .get(&(src_layer.index() as u8, dx, dy, tgt_layer.index() as u8))
            .map(|entry| (entry.mask.as_slice(), entry.fraction.as_slice()))
    }

    /// All cached connections out of one source layer, as
    /// `(dx, dy, tgt_layer, mask, fraction)`.
    pub fn get_all_connections(
        &self,
        src_layer: SoilLayer,
    ) -> Vec<(i32, i32, SoilLayer, &[bool], &[f32])> {
        self.connections
            .iter()
            .filter(|((src, ..), _)| *src == src_layer.index() as u8)
            .map(|((_, dx, dy, tgt), entry)| {
                (
                    *dx,
                    *dy,
                    SoilLayer::from_index(*tgt as usize),
                    entry.mask.as_slice(),
                    entry.fraction.as_slice(),
                )
            })
            .collect()
    }

    pub fn stats(&self) -> CacheStats {
        let cell_count = self.width * self.height;
        let per_entry_bytes = cell_count * (std::mem::size_of::<bool>() + std::mem::size_of::<f32>());
        CacheStats {
            is_valid: self.is_valid,
            rebuild_count: self.rebuild_count,
            invalidate_count: self.invalidate_count,
            ticks_since_rebuild: self.ticks_since_rebuild,
            num_connections: self.connections.len(),
            memory_estimate_bytes: self.connections.len() * per_entry_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::core::Terrain;

    #[test]
    fn fresh_cache_needs_rebuild() {
        let cache = ConnectivityCache::new(4, 4);
        assert!(cache.needs_rebuild());
    }

    #[test]
    fn rebuild_clears_needs_rebuild_flag() {
        let terrain = Terrain::flat(3, 3, 0, 60);
        let mut cache = ConnectivityCache::new(3, 3);
        cache.rebuild_if_needed(&terrain);
        assert!(!cache.needs_rebuild());
        assert_eq!(cache.stats().rebuild_count, 1);
    }

    #[test]
    fn invalidate_forces_rebuild() {
        let terrain = Terrain::flat(3, 3, 0, 60);
        let mut cache = ConnectivityCache::new(3, 3);
        cache.rebuild_if_needed(&terrain);
        cache.invalidate();
        assert!(cache.needs_rebuild());
    }

    #[test]
    fn identical_flat_columns_connect_at_same_layer() {
        let terrain = Terrain::flat(2, 1, 0, 60);
        let mut cache = ConnectivityCache::new(2, 1);
        cache.rebuild_if_needed(&terrain);

        let (mask, fraction) =
            cache.get_connectivity(SoilLayer::Regolith, 1, 0, SoilLayer::Regolith).unwrap();
        assert!(mask[0]);
        assert!(fraction[0] > 0.99);
    }

    #[test]
    fn disconnected_cliff_yields_no_connection() {
        // Cell (0,0) has a thick regolith stack pushed far above cell (1,0)'s
        // organics top, so nothing should connect between them.
        let mut terrain = Terrain::flat(2, 1, 0, 10);
        for _ in 0..50 {
            terrain.raise_ground(0, 0);
        }
        let mut cache = ConnectivityCache::new(2, 1);
        cache.rebuild_if_needed(&terrain);
        assert!(cache
            .get_connectivity(SoilLayer::Regolith, 1, 0, SoilLayer::Organics)
            .is_none());
    }

    #[test]
    fn periodic_mode_forces_rebuild_after_n_ticks() {
        let terrain = Terrain::flat(2, 2, 0, 40);
        let mut cache = ConnectivityCache::new(2, 2);
        cache.set_rebuild_frequency(Some(3));
        cache.rebuild_if_needed(&terrain);
        for _ in 0..2 {
            cache.tick();
            assert!(!cache.needs_rebuild());
        }
        cache.tick();
        assert!(cache.needs_rebuild());
    }
}
