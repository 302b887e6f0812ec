//! Where a generated segment lives, locally and at the provider.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Locations of one downloaded artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactLocations {
    /// Path of the downloaded file on this host.
    pub local_path: PathBuf,
    /// URL the provider reported, if any.
    pub remote_url: Option<String>,
}
