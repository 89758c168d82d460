//! branchgen – multi-channel branching-probability generator
//!
//! From independently simulated per-channel energy spectra, builds the
//! per-detector, energy-indexed branching-probability tables used for
//! weighted random sampling of "which reaction channel produced this
//! energy", together with the above-threshold yield and ratio bookkeeping
//! derived from the same spectra.
//!
//! Pipeline, per detector (detectors are independent and run in parallel):
//!
//! ```text
//! store ──▶ scale ──▶ aggregate (yields / ratios)
//!    │
//!    └────▶ sampler ──▶ persisted table ──▶ evaluator (validation)
//! ```

pub mod aggregate;
pub mod config;
pub mod data;
pub mod error;
pub mod evaluate;
pub mod pipeline;
pub mod sampler;
pub mod scale;
pub mod style;

pub use aggregate::{aggregate, aggregate_secondary_ratio, integrate_above, subtract_scaled, YieldTable};
pub use config::{GeneratorConfig, SamplingGrid, DEFAULT_SCALE_FACTORS};
pub use data::model::Spectrum;
pub use data::store::{GeneratorStore, HistogramStore, TableFormat};
pub use error::{GenError, Result};
pub use evaluate::BranchingEvaluator;
pub use pipeline::{process_detector, run, DetectorReport, RunSummary};
pub use sampler::{build_branching_table, BranchingTable, ChannelCurve, InterpCurve};
pub use scale::scale;
pub use style::{channel_styles, secondary_style, ChannelStyle};
