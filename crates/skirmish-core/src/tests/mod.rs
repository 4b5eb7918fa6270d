//! Crate-level test suites.
//!
//! - `helpers`: roster/engine factories shared across suites
//! - `integration`: end-to-end battle scenarios through the public API
//! - `determinism`: seed-reproducibility and engine-wide properties

mod helpers;
