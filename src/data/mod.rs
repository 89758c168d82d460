/// Data layer: core types and the keyed histogram store.
///
/// Architecture:
/// ```text
///  ap<ch>.{parquet|json|csv}
///        │
///        ▼
///   ┌──────────┐
///   │  store    │  (detector, channel) key → owned Spectrum
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  model    │  Spectrum: centers + contents, rebin
///   └──────────┘
///        │
///        ▼
///   scale / aggregate / sampler
/// ```

pub mod model;
pub mod store;
