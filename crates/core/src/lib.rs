#![allow(clippy::result_large_err)]
//! tdeep-core: deep comparison engine.
//!
//! Walks two dynamic [`Value`]s in lock-step and reports every mismatch
//! with the path leading to it. Expected values may embed [`Operator`]s,
//! directly or through anchors, and per-type hooks can override how
//! values are compared.
//!
//! # Public API
//!
//! Key types are re-exported at the crate root for convenience:
//!
//! - [`cmp_deeply()`] / [`eq_deeply()`] -- top-level comparisons
//! - [`deep_value_equal()`] -- the recursive engine, for operators
//! - [`Value`], [`Type`], [`Kind`] -- the dynamic value model
//! - [`Context`], [`Error`], [`Path`] -- traversal state and diagnostics
//! - [`HookRegistry`], [`AnchorRegistry`] -- per-type overrides and anchors
//! - [`Config`] -- comparison settings

pub mod anchors;
pub mod config;
pub mod ctxerr;
pub mod deep;
pub mod error;
pub mod hooks;
pub mod operator;
pub mod operators;
pub mod ordering;
pub mod types;
pub mod value;
pub mod visited;

// ── Convenience re-exports: key types ────────────────────────────────

pub use anchors::AnchorRegistry;
pub use config::Config;
pub use ctxerr::{Context, Error, ErrorKind, ErrorSummary, Location, Path};
pub use error::{BoxError, HookError};
pub use hooks::HookRegistry;
pub use operator::{OpBase, Operator};
pub use types::{FieldDef, Kind, Type};
pub use value::{Complex, Value};
pub use visited::Visited;

// ── Convenience re-exports: entry points ─────────────────────────────

pub use deep::{cmp_deeply, deep_value_equal, deep_value_equal_ok, eq_deeply, eq_deeply_with};
