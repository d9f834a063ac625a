//! Record gate boundary contract.

use logfit_domain::Record;

/// Decides whether a record reaches the dump core at all.
pub trait RecordGate: Send + Sync {
    /// Returns true when the record should be written.
    fn admits(&self, record: &Record) -> bool;
}

/// Gate that admits every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdmitAll;

impl RecordGate for AdmitAll {
    fn admits(&self, _record: &Record) -> bool {
        true
    }
}
