//! Output generation.
//!
//! # Submodules
//!
//! - [`json`]: Writes the aggregated [`Snapshot`](crate::models::Snapshot) to a
//!   single JSON file, atomically
//!
//! # Output Structure
//!
//! ```text
//! web/
//! └── contests.json      # replaced in full on every run
//! ```

pub mod json;
