//! Timeline compositor: event lookup, presentation state, and dense frame scheduling.

/// Time/tick lookup structures over event logs.
pub mod index;
/// Dense output-frame scheduling (intro, held battle samples, outro).
pub mod schedule;
/// Forward-only overlay state (highlight, kill flash, captions).
pub mod tracker;
