//! Replay input model: sparse samples, raw event records and match metadata.

/// Typed highlight, kill and decision events converted from raw records.
pub mod events;
/// JSON-facing replay structures.
pub mod model;
