//! Metric Extraction Module
//!
//! Turns one blob of process output into per-signal scalars:
//! - Ordered list of tracked signals, each a regex with one numeric capture
//! - Last match in the output is authoritative
//! - Time values canonicalized to seconds, other units passed through
//! - Empty pattern means "wall-clock time measured around the process"
//!
//! # Architecture
//!
//! ```text
//! output text ──→ ExtractionPattern (last match) ──→ UnitPolicy ──→ Option<f64>
//!                         ↑
//!    wall-clock ──────────┘ (empty pattern)
//! ```

pub mod extractor;
pub mod pattern;
pub mod signals;
pub mod units;

pub use extractor::{output_excerpt, Extraction, MetricExtractor, MissReason};
pub use pattern::{ExtractionPattern, MetricDimension, TrackedSignal};
pub use signals::ProfilerSignal;
pub use units::{TimeUnit, UnitPolicy};
