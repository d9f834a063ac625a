//! Capture of `std::error::Error` chains into `CapturedError`.

use logfit_domain::CapturedError;
use std::error::Error;

/// Class used when the error's debug form names no type.
pub const UNKNOWN_ERROR_CLASS: &str = "Error";

/// Longest `source()` chain followed.
pub const MAX_CAPTURED_SOURCES: usize = 256;

/// Walk `error` and its `source()` chain into a `CapturedError` tree.
///
/// The class of each link is the leading type name of its `Debug` output
/// (`ParseIntError { .. }` gives `ParseIntError`).
#[must_use]
pub fn capture_std_error(error: &(dyn Error + 'static)) -> CapturedError {
    let mut links = vec![link(error)];
    let mut current = error.source();
    while let Some(source) = current {
        if links.len() > MAX_CAPTURED_SOURCES {
            break;
        }
        links.push(link(source));
        current = source.source();
    }

    let mut captured: Option<CapturedError> = None;
    for link in links.into_iter().rev() {
        captured = Some(match captured {
            Some(cause) => link.caused_by(cause),
            None => link,
        });
    }
    captured.unwrap_or_default()
}

fn link(error: &dyn Error) -> CapturedError {
    CapturedError::new(class_of(error), error.to_string())
}

fn class_of(error: &dyn Error) -> String {
    let debug = format!("{error:?}");
    let class: String = debug
        .chars()
        .take_while(|ch| ch.is_alphanumeric() || *ch == '_' || *ch == ':')
        .collect();
    if class.is_empty() || class.starts_with(|ch: char| ch.is_ascii_digit()) {
        UNKNOWN_ERROR_CLASS.to_owned()
    } else {
        class
    }
}
