//! # contract: capabilities the plan builder consumes
//!
//! The walk never runs a tool and never parses tool output itself. It talks to two
//! capabilities instead:
//!
//! - [`MemberLister`]: the ordered member paths of a directory's aggregate archive
//!   (conceptually `ar -t <dir>/built-in.o`).
//! - [`BitcodeExtractor`]: attempt bitcode extraction for one archive and report what
//!   came out of it, including the members that only exist as native (assembly) objects.
//!
//! ## Mocking & Testing
//! Both traits are annotated for `mockall`, so `MockMemberLister` and
//! `MockBitcodeExtractor` are available to tests and, through the default
//! `test-export-mocks` feature, to dependent crates.
//!
//! ## Implementors
//! The CLI crate provides the real adapters (`ar` and `get-bc` backed).

use mockall::automock;
use serde::Serialize;

use crate::error::{ListingError, ToolFailure};

/// What an extraction attempt produced for one aggregate archive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionOutcome {
    /// Path of the aggregate bitcode covering the members that do have bitcode,
    /// relative to the source root. `None` if nothing was produced.
    pub aggregate_bitcode: Option<String>,
    /// Members without an embedded bitcode section, in the order the extractor
    /// reported them. These are linked as-is.
    pub assembly_objects: Vec<String>,
}

impl ExtractionOutcome {
    pub fn is_empty(&self) -> bool {
        self.aggregate_bitcode.is_none() && self.assembly_objects.is_empty()
    }
}

/// Source of archive member listings.
///
/// `base_dir` is either empty (the tree root) or a relative directory ending in `/`.
/// Implementors return the members of that directory's aggregate archive, in archive
/// order, as paths relative to the tree root. A directory without an aggregate archive
/// must be reported as [`ListingError::Unavailable`].
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait MemberLister {
    fn list_members(&self, base_dir: &str) -> Result<Vec<String>, ListingError>;
}

/// Bitcode extraction capability.
///
/// `archive` is the path of an aggregate archive (or static library) relative to the
/// source root. A missing archive is not a failure: it yields an empty outcome.
/// Any tool failure on an existing archive is fatal for the run.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait BitcodeExtractor {
    fn extract(&self, archive: &str) -> Result<ExtractionOutcome, ToolFailure>;
}
