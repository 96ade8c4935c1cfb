// ABOUTME: Physics simulation systems for the water cycle kernel
// ABOUTME: Pool accounting, connectivity cache, subsurface/surface/atmosphere/evaporation phases

pub mod atmosphere;
pub mod connectivity;
pub mod evaporation;
pub mod pool;
pub mod subsurface;
pub mod surface;

pub use atmosphere::AtmosphereGrids;
pub use connectivity::ConnectivityCache;
pub use pool::WaterPool;
pub use subsurface::SubsurfaceGrids;
