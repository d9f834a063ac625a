//! Record processor boundary contract.

use logfit_domain::Record;

/// Enriches or reshapes a record before it is reduced.
///
/// Processors run in registration order and own the record while they run.
pub trait RecordProcessor: Send + Sync {
    /// Stable processor name, used in diagnostics.
    fn name(&self) -> &'static str;

    /// Transform the record.
    fn process(&self, record: Record) -> Record;
}
