//! # logfit-ports
//!
//! Port traits for the logfit hexagonal architecture.
//!
//! This crate defines the seams between the dump core and its collaborators:
//! the reduction observer, record processors, and record gates. It depends
//! only on `domain` and `shared`.

/// Returns the ports crate version.
#[must_use]
pub const fn ports_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub mod gate;
pub mod observer;
pub mod processor;

pub use gate::*;
pub use observer::*;
pub use processor::*;

// Re-export domain types used in port signatures, so adapter crates can
// implement ports without naming `logfit-domain` for them.
pub use logfit_domain::{Level, Record};

#[cfg(test)]
mod tests {
    use super::*;
    use logfit_domain::domain_crate_version;
    use logfit_shared::shared_crate_version;

    fn workspace_deps() -> Vec<String> {
        let cargo_toml = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/Cargo.toml"));
        let mut deps = Vec::new();
        let mut in_deps = false;

        for raw_line in cargo_toml.lines() {
            let line = raw_line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            if line.starts_with('[') {
                in_deps = line == "[dependencies]" || line == "[dev-dependencies]";
                continue;
            }
            if in_deps && line.starts_with("logfit-") {
                let key = line.split('=').next().unwrap_or("").trim();
                let name = key.split('.').next().unwrap_or("").trim();
                deps.push(name.to_owned());
            }
        }

        deps
    }

    #[test]
    fn ports_depends_only_on_domain_and_shared() {
        let deps = workspace_deps();
        let allowed = ["logfit-domain", "logfit-shared"];

        for dep in &deps {
            assert!(
                allowed.contains(&dep.as_str()),
                "unexpected dependency found: {dep}"
            );
        }
        for expected in allowed {
            assert!(
                deps.iter().any(|dep| dep == expected),
                "missing dependency: {expected}"
            );
        }
    }

    #[test]
    fn ports_can_use_domain_and_shared() {
        assert!(!ports_crate_version().is_empty());
        assert!(!domain_crate_version().is_empty());
        assert!(!shared_crate_version().is_empty());
    }

    #[test]
    fn default_ports_are_inert() {
        let record = Record::new(Level::Debug, "app", "hi");
        assert!(AdmitAll.admits(&record));

        let report = ReductionReport {
            outcome: ReductionOutcome::Fallback {
                reason: FallbackReason::StepCapExceeded,
            },
            output_length: 36,
            budget: 20,
        };
        NoopObserver.on_reduction(&report);
        assert!(report.outcome.is_fallback());
        assert_eq!(report.outcome.label(), "fallback");
        assert_eq!(FallbackReason::StepCapExceeded.to_string(), "step_cap_exceeded");
    }
}
