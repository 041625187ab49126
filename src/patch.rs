// Patch module: manual correction of a single product image.

use crate::catalog::Catalog;
use crate::error::{AdminError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePatch {
    pub product_name: String,
    pub old_url: String,
    pub new_url: String,
}

/// Replace the image at `index` and write the full sequence back.
///
/// `new_url` is trusted as-is; nothing is fetched.
pub fn update_product_image(
    catalog: &dyn Catalog,
    product_id: &str,
    index: i64,
    new_url: &str,
) -> Result<ImagePatch> {
    let product = catalog
        .get_product(product_id)?
        .ok_or_else(|| AdminError::ProductNotFound(product_id.to_string()))?;

    let mut images = product.images;
    let slot = usize::try_from(index)
        .ok()
        .filter(|i| *i < images.len())
        .ok_or(AdminError::InvalidImageIndex {
            index,
            len: images.len(),
        })?;

    let old_url = std::mem::replace(&mut images[slot], new_url.to_string());
    catalog.update_images(product_id, &images)?;
    tracing::debug!(product = product_id, index, "image replaced");

    Ok(ImagePatch {
        product_name: product.name,
        old_url,
        new_url: new_url.to_string(),
    })
}
