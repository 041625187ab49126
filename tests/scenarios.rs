// End-to-end runs of the procedures against in-memory services, with a
// local HTTP server standing in for external image hosts.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;

use storefront_admin::accounts::{self, Account, AccountDirectory, Claims, Identifier};
use storefront_admin::catalog::{Catalog, Product};
use storefront_admin::fetch::ImageFetcher;
use storefront_admin::migrate::{self, MigrationSummary};
use storefront_admin::patch;
use storefront_admin::storage::ObjectStore;
use storefront_admin::{AdminError, Result};

#[derive(Default)]
struct Directory {
    accounts: RefCell<HashMap<String, Account>>,
}

impl AccountDirectory for Directory {
    fn find_by_uid(&self, uid: &str) -> Result<Account> {
        self.accounts
            .borrow()
            .get(uid)
            .cloned()
            .ok_or_else(|| AdminError::AccountNotFound(uid.into()))
    }

    fn find_by_email(&self, email: &str) -> Result<Account> {
        self.accounts
            .borrow()
            .values()
            .find(|a| a.email.as_deref() == Some(email))
            .cloned()
            .ok_or_else(|| AdminError::AccountNotFound(email.into()))
    }

    fn set_custom_claims(&self, uid: &str, claims: &Claims) -> Result<()> {
        let mut accounts = self.accounts.borrow_mut();
        let account = accounts
            .get_mut(uid)
            .ok_or_else(|| AdminError::AccountNotFound(uid.into()))?;
        account.custom_claims = Some(claims.clone());
        Ok(())
    }
}

struct Products {
    items: RefCell<Vec<Product>>,
    writes: RefCell<usize>,
}

impl Products {
    fn new(items: Vec<Product>) -> Self {
        Self {
            items: RefCell::new(items),
            writes: RefCell::new(0),
        }
    }

    fn images(&self, id: &str) -> Vec<String> {
        self.items
            .borrow()
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.images.clone())
            .unwrap_or_default()
    }

    fn writes(&self) -> usize {
        *self.writes.borrow()
    }
}

impl Catalog for Products {
    fn list_products(&self) -> Result<Vec<Product>> {
        Ok(self.items.borrow().clone())
    }

    fn get_product(&self, id: &str) -> Result<Option<Product>> {
        Ok(self.items.borrow().iter().find(|p| p.id == id).cloned())
    }

    fn update_images(&self, id: &str, images: &[String]) -> Result<()> {
        let mut items = self.items.borrow_mut();
        let product = items
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| AdminError::ProductNotFound(id.into()))?;
        product.images = images.to_vec();
        *self.writes.borrow_mut() += 1;
        Ok(())
    }
}

struct Bucket;

impl ObjectStore for Bucket {
    fn upload_public(&self, _local: &Path, object: &str, _content_type: &str) -> Result<String> {
        Ok(format!("https://storage.googleapis.com/shop.appspot.com/{object}"))
    }
}

fn product(id: &str, images: &[&str]) -> Product {
    Product {
        id: id.into(),
        name: format!("Product {id}"),
        images: images.iter().map(|s| s.to_string()).collect(),
    }
}

#[test]
fn granting_then_checking_an_unclaimed_account_passes() {
    let dir = Directory::default();
    dir.accounts.borrow_mut().insert(
        "u1".into(),
        Account {
            uid: "u1".into(),
            email: Some("u1@shop.example".into()),
            custom_claims: None,
        },
    );

    assert!(!accounts::check_admin(&dir, "u1").unwrap().granted);
    accounts::grant_admin(&dir, &Identifier::parse("u1").unwrap()).unwrap();
    assert!(accounts::check_admin(&dir, "u1").unwrap().granted);
}

#[test]
fn hosted_and_blocked_images_are_left_alone() {
    let images = ["https://storage.googleapis.com/b/x.jpg", "https://i.pinimg.com/y.jpg"];
    let catalog = Products::new(vec![product("p1", &images)]);

    let summary =
        migrate::migrate_catalog(&catalog, &Bucket, &ImageFetcher::new().unwrap(), |_| {})
            .unwrap();

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.migrated, 0);
    assert_eq!(catalog.writes(), 0);
    assert_eq!(catalog.images("p1"), images);
}

#[test]
fn unreachable_image_is_counted_as_failed_without_a_write() {
    let mut server = mockito::Server::new();
    server.mock("GET", "/z.jpg").with_status(404).create();
    let url = format!("{}/z.jpg", server.url());
    let catalog = Products::new(vec![product("p2", &[url.as_str()])]);

    let summary =
        migrate::migrate_catalog(&catalog, &Bucket, &ImageFetcher::new().unwrap(), |_| {})
            .unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(catalog.writes(), 0);
    assert_eq!(catalog.images("p2"), vec![url]);
}

#[test]
fn patching_past_the_end_is_rejected() {
    let catalog = Products::new(vec![product("p3", &["a", "b"])]);
    let err = patch::update_product_image(&catalog, "p3", 5, "url").unwrap_err();
    assert!(matches!(err, AdminError::InvalidImageIndex { index: 5, len: 2 }));
    assert_eq!(catalog.writes(), 0);
}

#[test]
fn rerunning_migration_on_mixed_sequences_is_idempotent() {
    let mut server = mockito::Server::new();
    server
        .mock("GET", "/fresh.jpg")
        .with_status(200)
        .with_body("img")
        .expect(1)
        .create();
    server.mock("GET", "/broken.jpg").with_status(500).create();
    let fresh = format!("{}/fresh.jpg", server.url());
    let broken = format!("{}/broken.jpg", server.url());

    let catalog = Products::new(vec![product(
        "mix",
        &[
            "https://storage.googleapis.com/shop.appspot.com/products/mix-0.jpg",
            "https://i.pinimg.com/pin.jpg",
            fresh.as_str(),
            broken.as_str(),
        ],
    )]);
    let fetcher = ImageFetcher::new().unwrap();

    let first = migrate::migrate_catalog(&catalog, &Bucket, &fetcher, |_| {}).unwrap();
    assert_eq!(
        first,
        MigrationSummary {
            migrated: 1,
            skipped: 1,
            failed: 1,
            products_updated: 1,
            empty_products: 0,
        }
    );
    let after_first = catalog.images("mix");
    assert_eq!(
        after_first[2],
        "https://storage.googleapis.com/shop.appspot.com/products/mix-2.jpg"
    );
    assert_eq!(after_first[3], broken);

    let second = migrate::migrate_catalog(&catalog, &Bucket, &fetcher, |_| {}).unwrap();
    assert_eq!(second.migrated, 0);
    assert_eq!(second.skipped, 1);
    assert_eq!(second.failed, 1);
    assert_eq!(second.products_updated, 0);
    assert_eq!(catalog.writes(), 1);
    assert_eq!(catalog.images("mix"), after_first);
}
