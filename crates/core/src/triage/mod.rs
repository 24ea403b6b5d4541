//! Size triage of fetched artifacts.
//!
//! A located artifact is first renamed to its canonical name inside the
//! holding directory. Artifacts above the size threshold are discarded and
//! their registry lines annotated; the rest are placed in the final store.

mod artifact_triage;
mod error;
mod types;

pub use artifact_triage::ArtifactTriage;
pub use error::TriageError;
pub use types::{TriageOutcome, VideoArtifact};
