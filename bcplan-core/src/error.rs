use thiserror::Error;

/// Failure to obtain a member listing for a directory.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ListingError {
    /// The directory has no aggregate archive of its own. Recovered by the walk.
    #[error("no aggregate archive at {archive}")]
    Unavailable { archive: String },

    #[error("listing {archive} failed: {detail}")]
    Tool { archive: String, detail: String },
}

/// An external tool exited unsuccessfully or could not be launched.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{tool} failed on {target}: {detail}")]
pub struct ToolFailure {
    pub tool: String,
    pub target: String,
    pub detail: String,
}

/// Errors that abort plan synthesis. There is no partial plan after one of these.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("cannot list members of {dir:?}")]
    Listing {
        dir: String,
        #[source]
        source: ListingError,
    },

    #[error(transparent)]
    ExternalTool(#[from] ToolFailure),
}
