// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jerry Snitselaar and contributors

// ABOUTME: Flat-memory-layout grid primitives for simulation state
// ABOUTME: Grid2D covers W×H fields; LayerGrid covers the L×W×H soil-layer fields

use serde::{Deserialize, Serialize};

/// Dense W×H grid with row-major flat storage.
///
/// Generalizes the `PhysicsGrid<T>` pattern used elsewhere in this codebase:
/// one contiguous `Vec<T>` instead of nested `Vec<Vec<T>>`, so per-tick scans
/// over the whole grid stay cache-friendly.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Grid2D<T> {
    data: Vec<T>,
    width: usize,
    height: usize,
}

impl<T: Clone> Grid2D<T> {
    pub fn new(width: usize, height: usize, default: T) -> Self {
        Self {
            data: vec![default; width * height],
            width,
            height,
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> &T {
        debug_assert!(
            x < self.width && y < self.height,
            "Grid2D index out of bounds: ({}, {}) for {}x{}",
            x,
            y,
            self.width,
            self.height
        );
        unsafe { self.data.get_unchecked(y * self.width + x) }
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: T) {
        debug_assert!(
            x < self.width && y < self.height,
            "Grid2D index out of bounds: ({}, {}) for {}x{}",
            x,
            y,
            self.width,
            self.height
        );
        unsafe {
            *self.data.get_unchecked_mut(y * self.width + x) = value;
        }
    }

    #[inline]
    pub fn get_mut(&mut self, x: usize, y: usize) -> &mut T {
        debug_assert!(
            x < self.width && y < self.height,
            "Grid2D index out of bounds: ({}, {}) for {}x{}",
            x,
            y,
            self.width,
            self.height
        );
        unsafe { self.data.get_unchecked_mut(y * self.width + x) }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn in_bounds(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    pub fn fill(&mut self, value: T) {
        for item in &mut self.data {
            *item = value.clone();
        }
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.data.iter()
    }

    pub fn iter_coords(&self) -> impl Iterator<Item = (usize, usize, &T)> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| (x, y, self.get(x, y))))
    }
}

impl Grid2D<i32> {
    pub fn sum(&self) -> i64 {
        self.data.iter().map(|&v| v as i64).sum()
    }
}

impl Grid2D<f32> {
    pub fn clamp_in_place(&mut self, lo: f32, hi: f32) {
        for v in &mut self.data {
            *v = v.clamp(lo, hi);
        }
    }

    pub fn min(&self) -> f32 {
        self.data.iter().copied().fold(f32::INFINITY, f32::min)
    }

    pub fn max(&self) -> f32 {
        self.data.iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }
}

/// Dense L×W×H grid with row-major flat storage, one plane per soil layer.
///
/// Layer index is the outermost dimension so a full-layer scan (vertical
/// seepage, the connectivity cache build) walks contiguous memory.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LayerGrid<T> {
    data: Vec<T>,
    layers: usize,
    width: usize,
    height: usize,
}

impl<T: Clone> LayerGrid<T> {
    pub fn new(layers: usize, width: usize, height: usize, default: T) -> Self {
        Self {
            data: vec![default; layers * width * height],
            layers,
            width,
            height,
        }
    }

    #[inline]
    fn index(&self, layer: usize, x: usize, y: usize) -> usize {
        debug_assert!(
            layer < self.layers && x < self.width && y < self.height,
            "LayerGrid index out of bounds: layer {} ({}, {}) for {}x{}x{}",
            layer,
            x,
            y,
            self.layers,
            self.width,
            self.height
        );
        (layer * self.height + y) * self.width + x
    }

    #[inline]
    pub fn get(&self, layer: usize, x: usize, y: usize) -> &T {
        unsafe { self.data.get_unchecked(self.index(layer, x, y)) }
    }

    #[inline]
    pub fn set(&mut self, layer: usize, x: usize, y: usize, value: T) {
        let idx = self.index(layer, x, y);
        unsafe {
            *self.data.get_unchecked_mut(idx) = value;
        }
    }

    #[inline]
    pub fn get_mut(&mut self, layer: usize, x: usize, y: usize) -> &mut T {
        let idx = self.index(layer, x, y);
        unsafe { self.data.get_unchecked_mut(idx) }
    }

    #[inline]
    pub fn layers(&self) -> usize {
        self.layers
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Iterate all (x, y) coordinates within a single layer plane.
    pub fn coords(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| (x, y)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid2d_roundtrip() {
        let mut g = Grid2D::<i32>::new(4, 3, 0);
        g.set(2, 1, 42);
        assert_eq!(*g.get(2, 1), 42);
        assert_eq!(g.width(), 4);
        assert_eq!(g.height(), 3);
    }

    #[test]
    fn grid2d_sum() {
        let mut g = Grid2D::<i32>::new(2, 2, 1);
        g.set(0, 0, 5);
        assert_eq!(g.sum(), 5 + 1 + 1 + 1);
    }

    #[test]
    fn grid2d_bounds_check() {
        let g = Grid2D::<i32>::new(10, 10, 0);
        assert!(g.in_bounds(0, 0));
        assert!(g.in_bounds(9, 9));
        assert!(!g.in_bounds(-1, 0));
        assert!(!g.in_bounds(10, 0));
    }

    #[test]
    fn layer_grid_roundtrip() {
        let mut g = LayerGrid::<i32>::new(6, 5, 5, 0);
        g.set(5, 2, 3, 17);
        assert_eq!(*g.get(5, 2, 3), 17);
        assert_eq!(*g.get(0, 2, 3), 0);
    }

    #[test]
    fn layer_grid_coords_covers_full_plane() {
        let g = LayerGrid::<i32>::new(6, 3, 2, 0);
        let coords: Vec<_> = g.coords().collect();
        assert_eq!(coords.len(), 6);
    }
}
