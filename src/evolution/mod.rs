//! Evolution periods: the longitudinal view of one plant's health.
//!
//! Observations are grouped into consecutive periods of at most 30 days,
//! each period gets an average score and a trend relative to the previous
//! one, and the whole history gets a first-vs-last overall trend.
//! Pure projection: recomputed on every request, never cached or stored.

mod bucket;
mod trend;
mod types;

pub use bucket::*;
pub use trend::*;
pub use types::*;

// ── Tests ──────────────────────────────────────────────────────────────────
