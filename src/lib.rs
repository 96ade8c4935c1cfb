// ABOUTME: Library interface for the aridform terraforming simulation engine
// ABOUTME: Exposes clean public API for external use while keeping internal organization

pub mod engine;

// Re-export key engine components for library users
pub use engine::{Cell, Inventory, SimError, Simulation, SimulationConfig, Structure, Weather};
