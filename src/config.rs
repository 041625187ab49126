use std::path::PathBuf;

use crate::api::{Endpoints, ProjectRefs};
use crate::credentials::ServiceAccountKey;

pub const DEFAULT_COLLECTION: &str = "products";

/// Invocation-wide settings, assembled from CLI flags and environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub credentials_path: PathBuf,
    pub project_id: Option<String>,
    pub expected_project_id: Option<String>,
    pub storage_bucket: Option<String>,
    pub products_collection: String,
    pub endpoints: Endpoints,
}

impl Config {
    /// Resolve project, bucket and collection against the loaded key.
    ///
    /// The bucket defaults to the project's `<project>.appspot.com` bucket.
    pub fn project_refs(&self, key: &ServiceAccountKey) -> ProjectRefs {
        let project_id = self
            .project_id
            .clone()
            .unwrap_or_else(|| key.project_id.clone());
        let bucket = self
            .storage_bucket
            .clone()
            .unwrap_or_else(|| format!("{project_id}.appspot.com"));
        ProjectRefs {
            project_id,
            bucket,
            collection: self.products_collection.clone(),
        }
    }

    /// `Some((expected, actual))` when an expected project is configured and
    /// the effective one differs.
    pub fn project_mismatch<'a>(&'a self, refs: &'a ProjectRefs) -> Option<(&'a str, &'a str)> {
        self.expected_project_id
            .as_deref()
            .filter(|expected| *expected != refs.project_id)
            .map(|expected| (expected, refs.project_id.as_str()))
    }
}
