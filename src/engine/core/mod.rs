// ABOUTME: Core engine foundation - fundamental data structures for the simulation
// ABOUTME: Provides the grid primitives, material model, terrain column storage, and biome classification

pub mod biome;
pub mod grid;
pub mod material;
pub mod terrain;

pub use biome::{Biome, BiomeProperties};
pub use grid::{Grid2D, LayerGrid};
pub use material::{Material, SoilLayer, FLOWABLE_LAYERS, LAYER_COUNT};
pub use terrain::{LowerLimit, Terrain, TerrainOpOutcome, TrenchMode};
