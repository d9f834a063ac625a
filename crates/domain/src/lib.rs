//! # logfit-domain
//!
//! Domain model for size-bounded record dumping.
//!
//! - **Value** - `Value`, `ValueMap`, `SharedValue`, the `Opaque` capability
//! - **Level** - ordinal severities
//! - **Record** - one structured log event and its JSON ingestion
//! - **Error** - `CapturedError` trees with cause chains
//! - **Policy** - `ReductionPolicy`, the reducer's configuration surface
//!
//! ## Dependency Rules
//!
//! - Depends only on `shared` crate
//! - No infrastructure or adapter dependencies
//! - Pure domain logic with no I/O

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub use logfit_shared::shared_crate_version;

// =============================================================================
// DOMAIN MODULES
// =============================================================================

pub mod error;
pub mod level;
pub mod policy;
pub mod record;
pub mod value;

pub use error::{CapturedError, MAX_CAUSE_DEPTH_MESSAGE, PreviousError, StackFrame};
pub use level::{Level, LevelParseError};
pub use policy::{
    DEFAULT_DEPTH_MARKER, DEFAULT_MAX_DUMP_DEPTH, DEFAULT_MAX_RECORD_LENGTH,
    DEFAULT_MAX_REDUCTION_STEPS, DEFAULT_PLACEHOLDER, DEFAULT_TOO_BIG_FALLBACK, LengthUnit,
    MIN_RECORD_LENGTH, MIN_SKELETON, ReductionPolicy, SubstitutionOrder,
};
pub use record::{DEFAULT_CHANNEL, EXCEPTION_KEY, Record, RecordError};
pub use value::{
    ObjectValue, Opaque, OpaqueKind, SharedValue, Value, ValueMap, normalize_attribute_name,
    opaque_identity,
};

/// Returns the domain crate version.
#[must_use]
pub const fn domain_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

// =============================================================================
// TESTS
// =============================================================================
