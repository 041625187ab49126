// Migration module: moving externally hosted product images into managed storage.
//
// Every image URL is classified on its own. Hosted images are left alone,
// blocked hosts are left for the operator, and everything else is
// downloaded and re-uploaded. A product is written back once, with its full
// image sequence, and only when at least one entry changed.

use std::io::Write;

use crate::catalog::{Catalog, Product};
use crate::error::{AdminError, Result};
use crate::fetch::ImageFetcher;
use crate::storage::{object_path, ObjectStore, DEFAULT_CONTENT_TYPE};

/// Substrings marking a URL that already lives in managed storage.
pub const HOSTED_MARKERS: &[&str] = &["firebasestorage.googleapis.com", "storage.googleapis.com"];

/// Substrings marking hosts that refuse server-side fetches.
pub const BLOCKED_MARKERS: &[&str] = &["pinimg.com", "pinterest.com"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageClass {
    Hosted,
    Blocked,
    Fetchable,
}

pub fn classify(url: &str) -> ImageClass {
    if HOSTED_MARKERS.iter().any(|m| url.contains(m)) {
        ImageClass::Hosted
    } else if BLOCKED_MARKERS.iter().any(|m| url.contains(m)) {
        ImageClass::Blocked
    } else {
        ImageClass::Fetchable
    }
}

#[derive(Debug)]
pub enum ImageOutcome {
    AlreadyHosted,
    Blocked,
    Migrated { new_url: String },
    Failed { error: AdminError },
}

/// What happened to one product.
#[derive(Debug)]
pub struct ProductReport<'a> {
    pub product: &'a Product,
    pub outcomes: Vec<ImageOutcome>,
    pub written: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MigrationSummary {
    pub migrated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub products_updated: usize,
    pub empty_products: usize,
}

impl MigrationSummary {
    fn record(&mut self, outcome: &ImageOutcome) {
        match outcome {
            ImageOutcome::AlreadyHosted => {}
            ImageOutcome::Blocked => self.skipped += 1,
            ImageOutcome::Migrated { .. } => self.migrated += 1,
            ImageOutcome::Failed { .. } => self.failed += 1,
        }
    }
}

/// Download `url` and re-host it as `products/<id>-<index>.jpg`.
///
/// The download buffer is a temp file owned by this call; it is removed when
/// the call returns, whatever the outcome.
pub fn rehost_image(
    store: &dyn ObjectStore,
    fetcher: &ImageFetcher,
    product_id: &str,
    index: usize,
    url: &str,
) -> Result<String> {
    let mut buffer = tempfile::Builder::new()
        .prefix(&format!("{product_id}-{index}-"))
        .suffix(".jpg")
        .tempfile()?;
    let fetched = fetcher.download(url, buffer.as_file_mut())?;
    buffer.as_file_mut().flush()?;
    tracing::debug!(url, bytes = fetched.bytes, "downloaded image");

    let content_type = fetched
        .content_type
        .as_deref()
        .filter(|ct| ct.starts_with("image/"))
        .unwrap_or(DEFAULT_CONTENT_TYPE);
    let new_url = store.upload_public(buffer.path(), &object_path(product_id, index), content_type)?;
    buffer.close()?;
    Ok(new_url)
}

/// Process one product and return the new image sequence with per-image
/// outcomes. Positions are preserved; failed images keep their old URL.
fn migrate_images(
    store: &dyn ObjectStore,
    fetcher: &ImageFetcher,
    product: &Product,
) -> (Vec<String>, Vec<ImageOutcome>) {
    let mut images = Vec::with_capacity(product.images.len());
    let mut outcomes = Vec::with_capacity(product.images.len());

    for (index, url) in product.images.iter().enumerate() {
        let outcome = match classify(url) {
            ImageClass::Hosted => ImageOutcome::AlreadyHosted,
            ImageClass::Blocked => ImageOutcome::Blocked,
            ImageClass::Fetchable => match rehost_image(store, fetcher, &product.id, index, url) {
                Ok(new_url) => ImageOutcome::Migrated { new_url },
                Err(error) => {
                    tracing::warn!(product = %product.id, index, %error, "image migration failed");
                    ImageOutcome::Failed { error }
                }
            },
        };
        match &outcome {
            ImageOutcome::Migrated { new_url } => images.push(new_url.clone()),
            _ => images.push(url.clone()),
        }
        outcomes.push(outcome);
    }
    (images, outcomes)
}

/// Migrate every product in the catalog, one image at a time.
///
/// `on_product` sees each product's report as soon as it is committed. A
/// failure to write a product back aborts the run; per-image failures do not.
pub fn migrate_catalog<F>(
    catalog: &dyn Catalog,
    store: &dyn ObjectStore,
    fetcher: &ImageFetcher,
    mut on_product: F,
) -> Result<MigrationSummary>
where
    F: FnMut(&ProductReport<'_>),
{
    let products = catalog.list_products()?;
    let mut summary = MigrationSummary::default();

    for product in &products {
        if product.images.is_empty() {
            summary.empty_products += 1;
            on_product(&ProductReport {
                product,
                outcomes: Vec::new(),
                written: false,
            });
            continue;
        }

        let (images, outcomes) = migrate_images(store, fetcher, product);
        outcomes.iter().for_each(|o| summary.record(o));

        let changed = images != product.images;
        if changed {
            catalog.update_images(&product.id, &images)?;
            summary.products_updated += 1;
        }
        on_product(&ProductReport {
            product,
            outcomes,
            written: changed,
        });
    }
    Ok(summary)
}

/// A product with images on blocked hosts, with each image's position in the
/// product's sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockedProduct {
    pub id: String,
    pub name: String,
    pub images: Vec<(usize, String)>,
}

/// Read-only scan for images that need manual handling.
pub fn list_blocked(catalog: &dyn Catalog) -> Result<Vec<BlockedProduct>> {
    Ok(catalog
        .list_products()?
        .into_iter()
        .filter_map(|p| {
            let images: Vec<(usize, String)> = p
                .images
                .into_iter()
                .enumerate()
                .filter(|(_, url)| classify(url) == ImageClass::Blocked)
                .collect();
            (!images.is_empty()).then_some(BlockedProduct {
                id: p.id,
                name: p.name,
                images,
            })
        })
        .collect())
}
