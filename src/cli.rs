use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::api::Endpoints;
use crate::config::{Config, DEFAULT_COLLECTION};
use crate::credentials::discover_key_path;

#[derive(Parser, Debug)]
#[command(
    name = "storefront-admin",
    version,
    about = "Administrative tasks for the storefront backend"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Log request-level detail to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Service account key file
    #[arg(long, global = true, env = "GOOGLE_APPLICATION_CREDENTIALS")]
    pub credentials: Option<PathBuf>,

    /// Project to operate on (default: the key's project_id)
    #[arg(long, global = true, env = "FIREBASE_PROJECT_ID")]
    pub project: Option<String>,

    /// Project the app actually uses; a mismatch is warned about up front
    #[arg(long, global = true, env = "EXPECTED_PROJECT_ID")]
    pub expected_project: Option<String>,

    /// Storage bucket (default: <project>.appspot.com)
    #[arg(long, global = true, env = "STORAGE_BUCKET")]
    pub bucket: Option<String>,

    /// Collection holding product records
    #[arg(long, global = true, env = "PRODUCTS_COLLECTION", default_value = DEFAULT_COLLECTION)]
    pub collection: String,
}

impl GlobalArgs {
    pub fn to_config(&self) -> Config {
        Config {
            credentials_path: discover_key_path(self.credentials.as_deref()),
            project_id: self.project.clone(),
            expected_project_id: self.expected_project.clone(),
            storage_bucket: self.bucket.clone(),
            products_collection: self.collection.clone(),
            endpoints: Endpoints::default(),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Grant the admin claim to an account, by UID or email
    SetClaim {
        /// Account UID, or an email address (anything containing '@')
        identifier: Option<String>,

        /// Default account when no identifier is given
        #[arg(long, env = "ADMIN_UID")]
        uid: Option<String>,
    },
    /// Report whether the configured account carries the admin claim
    CheckClaim {
        #[arg(long, env = "ADMIN_UID")]
        uid: String,
    },
    /// Grant the admin claim and read it straight back
    SetAndVerify {
        #[arg(long, env = "ADMIN_UID")]
        uid: String,
    },
    /// Move externally hosted product images into storage
    MigrateImages {
        /// Only list products with images on blocked hosts
        #[arg(short, long)]
        list: bool,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Replace a single product image URL
    #[command(allow_negative_numbers = true)]
    UpdateProductImage {
        product_id: String,
        /// Zero-based position in the product's image list
        image_index: String,
        new_url: String,
    },
}
