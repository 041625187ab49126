// Storage module: publicly readable uploads and their URLs.

use std::fs::File;
use std::path::Path;

use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde::Serialize;

use crate::api::ApiClient;
use crate::error::{AdminError, Result};

pub const CACHE_CONTROL: &str = "public, max-age=31536000";
pub const DEFAULT_CONTENT_TYPE: &str = "image/jpeg";

/// Object name for the image at `index` of `product_id`.
pub fn object_path(product_id: &str, index: usize) -> String {
    format!("products/{product_id}-{index}.jpg")
}

/// Public URL of an object, derived without asking the store.
pub fn public_url(base: &str, bucket: &str, object: &str) -> String {
    format!("{}/{}/{}", base.trim_end_matches('/'), bucket, object)
}

pub trait ObjectStore {
    /// Upload `local` as a publicly readable object and return its public URL.
    fn upload_public(&self, local: &Path, object: &str, content_type: &str) -> Result<String>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ObjectMetadata<'a> {
    cache_control: &'a str,
    content_type: &'a str,
}

impl ObjectStore for ApiClient {
    fn upload_public(&self, local: &Path, object: &str, content_type: &str) -> Result<String> {
        let storage = &self.endpoints().storage;
        let bucket = &self.refs().bucket;
        let upload_failed = |reason: String| AdminError::UploadFailed {
            object: object.to_string(),
            reason,
        };

        let file = File::open(local)
            .map_err(|e| upload_failed(format!("opening {}: {e}", local.display())))?;
        let upload = self
            .request(
                Method::POST,
                &format!("{storage}/upload/storage/v1/b/{bucket}/o"),
            )?
            .query(&[
                ("uploadType", "media"),
                ("name", object),
                ("predefinedAcl", "publicRead"),
            ])
            .header(CONTENT_TYPE, content_type)
            .body(file);
        self.send(upload).map_err(|e| upload_failed(e.to_string()))?;

        let metadata = self
            .request(
                Method::PATCH,
                &format!(
                    "{storage}/storage/v1/b/{bucket}/o/{}",
                    urlencoding::encode(object)
                ),
            )?
            .json(&ObjectMetadata {
                cache_control: CACHE_CONTROL,
                content_type,
            });
        self.send(metadata)
            .map_err(|e| upload_failed(format!("setting metadata: {e}")))?;

        Ok(public_url(storage, bucket, object))
    }
}
