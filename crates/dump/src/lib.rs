//! # logfit-dump
//!
//! Size-bounded structured dumping: the core of logfit.
//!
//! Data flows one way:
//!
//! ```text
//! Value -> ScalarProjector -> BoundedSerializer (probe)
//!       -> AdaptiveReducer (depth search, substitution) -> bounded string
//! ```
//!
//! The core is synchronous and holds no state across calls; concurrent
//! callers need no coordination as long as each hands in a value nobody
//! mutates during the call.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod projector;
pub mod reducer;
pub mod serializer;

pub use projector::{
    CALLABLE_MARKER, CLASS_KEY, DepthReport, ProjectedValue, ScalarProjector, TYPE_KEY,
    UNKNOWN_MARKER, recursion_marker, resource_marker,
};
pub use reducer::{AdaptiveReducer, Reduction, reduce};
pub use serializer::{BoundedSerializer, measure};

/// Returns the dump crate version.
#[must_use]
pub const fn dump_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
