//! Builds of the Linux distribution, whose sources are spread over many
//! repositories checked out with `repo`. A build can pin chosen projects to
//! other revisions, which is how a breaking commit is bisected.

mod manifest;
mod workspace;

pub use manifest::{Manifest, Pin, Project};
pub use workspace::{DistroJob, DistroOptions, DOWNLOADS_LINK, MANIFESTS_DIR, MANIFEST_URL};
