//! Release comparison for update decisions.
//!
//! Install tooling reasons in terms of "is this an update", not in terms
//! of manifest internals, so the negated release-equality check gets its
//! own named surface here.

use crate::metadata::{Metadata, MetadataError};

/// Whether `candidate` is a different release than `installed`.
///
/// A candidate is an update exactly when it is not the same release,
/// per [`Metadata::same_as`]. Downgrades count: this decides "different",
/// not "newer", since version strings are opaque.
///
/// # Errors
///
/// As [`Metadata::same_as`], when an identity field the comparison needs
/// is absent from either record.
pub fn is_update(candidate: &Metadata, installed: &Metadata) -> Result<bool, MetadataError> {
    Ok(!candidate.same_as(installed)?)
}
