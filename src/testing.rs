// Test fakes: in-memory stand-ins for the account, catalog and storage services.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::accounts::{Account, AccountDirectory, Claims};
use crate::catalog::{Catalog, Product};
use crate::error::{AdminError, Result};
use crate::storage::ObjectStore;

pub fn product(id: &str, images: &[&str]) -> Product {
    Product {
        id: id.to_string(),
        name: format!("Product {id}"),
        images: images.iter().map(|s| s.to_string()).collect(),
    }
}

#[derive(Default)]
pub struct FakeDirectory {
    accounts: RefCell<HashMap<String, Account>>,
    writes: RefCell<Vec<(String, Claims)>>,
}

impl FakeDirectory {
    pub fn with_account(uid: &str, email: &str, claims: Option<Claims>) -> Self {
        let dir = Self::default();
        dir.accounts.borrow_mut().insert(
            uid.to_string(),
            Account {
                uid: uid.to_string(),
                email: Some(email.to_string()),
                custom_claims: claims,
            },
        );
        dir
    }

    pub fn writes(&self) -> Vec<(String, Claims)> {
        self.writes.borrow().clone()
    }
}

impl AccountDirectory for FakeDirectory {
    fn find_by_uid(&self, uid: &str) -> Result<Account> {
        self.accounts
            .borrow()
            .get(uid)
            .cloned()
            .ok_or_else(|| AdminError::AccountNotFound(uid.to_string()))
    }

    fn find_by_email(&self, email: &str) -> Result<Account> {
        self.accounts
            .borrow()
            .values()
            .find(|a| a.email.as_deref() == Some(email))
            .cloned()
            .ok_or_else(|| AdminError::AccountNotFound(email.to_string()))
    }

    fn set_custom_claims(&self, uid: &str, claims: &Claims) -> Result<()> {
        let mut accounts = self.accounts.borrow_mut();
        let account = accounts
            .get_mut(uid)
            .ok_or_else(|| AdminError::AccountNotFound(uid.to_string()))?;
        account.custom_claims = Some(claims.clone());
        self.writes
            .borrow_mut()
            .push((uid.to_string(), claims.clone()));
        Ok(())
    }
}

pub struct FakeCatalog {
    products: RefCell<Vec<Product>>,
    writes: RefCell<Vec<(String, Vec<String>)>>,
}

impl FakeCatalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self {
            products: RefCell::new(products),
            writes: RefCell::new(Vec::new()),
        }
    }

    pub fn writes(&self) -> Vec<(String, Vec<String>)> {
        self.writes.borrow().clone()
    }
}

impl Catalog for FakeCatalog {
    fn list_products(&self) -> Result<Vec<Product>> {
        Ok(self.products.borrow().clone())
    }

    fn get_product(&self, id: &str) -> Result<Option<Product>> {
        Ok(self.products.borrow().iter().find(|p| p.id == id).cloned())
    }

    fn update_images(&self, id: &str, images: &[String]) -> Result<()> {
        let mut products = self.products.borrow_mut();
        let product = products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| AdminError::ProductNotFound(id.to_string()))?;
        product.images = images.to_vec();
        self.writes
            .borrow_mut()
            .push((id.to_string(), images.to_vec()));
        Ok(())
    }
}

/// A recorded upload. The body is read at upload time, since the local file
/// is gone afterwards.
#[derive(Debug, Clone)]
pub struct Upload {
    pub local_path: PathBuf,
    pub object: String,
    pub content_type: String,
    pub body: Vec<u8>,
}

#[derive(Default)]
pub struct FakeStore {
    uploads: RefCell<Vec<Upload>>,
    fail: bool,
}

impl FakeStore {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn url_for(object: &str) -> String {
        format!("https://storage.googleapis.com/fake-bucket/{object}")
    }

    pub fn uploads(&self) -> Vec<Upload> {
        self.uploads.borrow().clone()
    }
}

impl ObjectStore for FakeStore {
    fn upload_public(&self, local: &Path, object: &str, content_type: &str) -> Result<String> {
        // Attempts are recorded even when they fail.
        self.uploads.borrow_mut().push(Upload {
            local_path: local.to_path_buf(),
            object: object.to_string(),
            content_type: content_type.to_string(),
            body: std::fs::read(local)?,
        });
        if self.fail {
            return Err(AdminError::UploadFailed {
                object: object.to_string(),
                reason: "HTTP 403".into(),
            });
        }
        Ok(Self::url_for(object))
    }
}
