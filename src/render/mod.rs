//! Pixel production: the rasterizer seam, shared presentation lookups and the CPU reference
//! rasterizer.

pub mod backend;
pub mod cpu;
pub mod palette;
