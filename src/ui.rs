// UI layer: the operator-facing side of each procedure. Every handler runs
// one procedure against the shared `ApiClient`, prints human-readable status
// and returns the process exit code.

use std::io::IsTerminal;
use std::process::ExitCode;

use crossterm::style::Stylize;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};

use crate::accounts::{self, Account, ClaimCheck, Identifier};
use crate::api::ApiClient;
use crate::config::Config;
use crate::error::AdminError;
use crate::fetch::ImageFetcher;
use crate::migrate::{self, ImageOutcome, MigrationSummary, ProductReport};
use crate::patch;

const RULE_WIDTH: usize = 70;

pub const UPDATE_USAGE: &str = "\
Usage: storefront-admin update-product-image <productId> <imageIndex> <newUrl>

Example:
  storefront-admin update-product-image M9zIWUL0D8IZLwT0K7Lo 0 \"https://storage.googleapis.com/...\"

Arguments:
  productId   - The document ID of the product
  imageIndex  - Index of the image to update (0 for first image, 1 for second, etc.)
  newUrl      - The new storage URL

To get the product IDs with images that need manual migration, run:
  storefront-admin migrate-images --list";

fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

fn print_error(err: &AdminError) {
    eprintln!("\n{} {}", "ERROR:".red().bold(), err);
}

/// Extra guidance for the mistakes operators actually make.
fn print_account_guidance(err: &AdminError, project_id: &str) {
    match err {
        AdminError::AccountNotFound(who) => {
            eprintln!("\nUser {who} not found in project {project_id}.");
            eprintln!("This usually means one of:");
            eprintln!("  - the credentials file belongs to a DIFFERENT project");
            eprintln!("  - the user does not exist yet; create it first or check the identifier");
        }
        AdminError::InvalidIdentifier(..) => {
            eprintln!("   UIDs are non-empty strings of at most 128 characters;");
            eprintln!("   emails need a local part and a domain.");
        }
        _ => {}
    }
}

/// Failures while building the client, before any procedure ran.
pub fn print_startup_error(err: &AdminError) {
    print_error(err);
    if let AdminError::CredentialsMissing { .. } = err {
        eprintln!("   Download a service account key from the console");
        eprintln!("   (Project Settings > Service Accounts > Generate New Private Key),");
        eprintln!("   save it as serviceAccountKey.json or pass --credentials <PATH>.");
    }
}

/// Show which project this run touches, and shout if it is not the one the
/// app uses.
pub fn print_project_banner(config: &Config, api: &ApiClient) {
    println!("Project ID: {}", api.project_id());
    if let Some((expected, actual)) = config.project_mismatch(api.refs()) {
        tracing::warn!(expected, actual, "project mismatch");
        eprintln!(
            "\n{} the app uses project {expected}, but these credentials target {actual}.",
            "WARNING:".yellow().bold()
        );
        eprintln!("   You probably have the WRONG service account key.\n");
    }
}

fn print_claims(account: &Account) {
    match &account.custom_claims {
        Some(claims) => println!(
            "Custom Claims: {}",
            serde_json::Value::Object(claims.clone())
        ),
        None => println!("Custom Claims: none (no claims set)"),
    }
}

fn print_sign_in_steps() {
    println!("\nNext steps:");
    println!("1. Sign OUT of the app completely");
    println!("2. Sign IN again (forces a token refresh)");
    println!("3. Confirm the app's token now carries admin: true");
}

/// `set-claim <identifier>`
pub fn handle_set_claim(api: &ApiClient, raw: &str) -> ExitCode {
    let result = Identifier::parse(raw).and_then(|id| {
        println!("\nSetting admin claim for: {} ({})\n", id.as_str(), id.kind());
        let found = accounts::resolve(api, &id)?;
        println!(
            "Found user: {} (UID: {})",
            found.email.as_deref().unwrap_or("<no email>"),
            found.uid
        );
        accounts::grant_admin_to(api, found)
    });

    match result {
        Ok(account) => {
            println!(
                "\n{} Admin claim set for UID: {}",
                "SUCCESS!".green().bold(),
                account.uid
            );
            println!("   Email: {}", account.email.as_deref().unwrap_or("<no email>"));
            print_claims(&account);
            print_sign_in_steps();
            println!(
                "4. If the claim still reads null, check that project {} is the app's project",
                api.project_id()
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            print_error(&err);
            print_account_guidance(&err, api.project_id());
            ExitCode::FAILURE
        }
    }
}

fn print_check(check: &ClaimCheck) {
    println!(
        "User Email: {}",
        check.account.email.as_deref().unwrap_or("<no email>")
    );
    println!("User UID: {}", check.account.uid);
    print_claims(&check.account);
    println!("\n{}", rule());
}

/// `check-claim`
pub fn handle_check_claim(api: &ApiClient, uid: &str) -> ExitCode {
    println!("\nChecking admin claim status...\n");
    match accounts::check_admin(api, uid) {
        Ok(check) => {
            print_check(&check);
            if check.granted {
                println!("{} ADMIN CLAIM IS SET", "PASS".green().bold());
                print_sign_in_steps();
            } else {
                println!("{} ADMIN CLAIM IS NOT SET", "FAIL".red().bold());
                println!("\nTo fix this, run:");
                println!("  storefront-admin set-claim {uid}");
                println!("\nOR run the combined command:");
                println!("  storefront-admin set-and-verify --uid {uid}");
            }
            println!("{}\n", rule());
            ExitCode::SUCCESS
        }
        Err(err) => {
            print_error(&err);
            print_account_guidance(&err, api.project_id());
            ExitCode::FAILURE
        }
    }
}

/// `set-and-verify`
pub fn handle_set_and_verify(api: &ApiClient, uid: &str) -> ExitCode {
    println!("\nSetting admin claim...\n");
    println!("Target UID: {uid}");
    match accounts::grant_and_verify(api, uid) {
        Ok(check) => {
            println!("\nClaim written. Verifying...\n");
            print_check(&check);
            if check.granted {
                println!("{} Admin claim verified immediately", "PASS".green().bold());
                print_sign_in_steps();
            } else {
                println!(
                    "{} Claim not visible immediately after setting",
                    "FAIL".red().bold()
                );
                println!("\nPossible causes:");
                println!("1. Wrong project: this run used {}", api.project_id());
                println!("2. Wrong UID: this run used {uid}");
                println!("\nRun check-claim to look again.");
            }
            println!("{}\n", rule());
            ExitCode::SUCCESS
        }
        Err(err) => {
            print_error(&err);
            print_account_guidance(&err, api.project_id());
            ExitCode::FAILURE
        }
    }
}

/// Print above the progress bar, or plainly when the bar is hidden.
fn say(pb: &ProgressBar, line: impl AsRef<str>) {
    if pb.is_hidden() {
        println!("{}", line.as_ref());
    } else {
        pb.println(line);
    }
}

fn print_product_report(pb: &ProgressBar, report: &ProductReport<'_>) {
    let p = report.product;
    say(pb, format!("\nProcessing: {} ({})", p.name, p.id));
    if p.images.is_empty() {
        say(pb, "   No images found");
        return;
    }
    for (i, outcome) in report.outcomes.iter().enumerate() {
        let n = i + 1;
        let line = match outcome {
            ImageOutcome::AlreadyHosted => format!("   Image {n} already in storage"),
            ImageOutcome::Blocked => format!(
                "   {} Image {n} is on a blocked host - skipping (manual download required)",
                "SKIP".yellow()
            ),
            ImageOutcome::Migrated { new_url } => format!(
                "   {} Image {n} migrated\n      New URL: {new_url}",
                "OK".green()
            ),
            ImageOutcome::Failed { error } => {
                format!("   {} Failed to migrate image {n}: {error}", "FAIL".red())
            }
        };
        say(pb, line);
    }
    if report.written {
        say(pb, "   Updated product document");
    }
}

fn print_summary(summary: &MigrationSummary) {
    println!("\n\nMigration Summary:");
    println!("   Migrated: {} images", summary.migrated);
    println!("   Skipped:  {} images (blocked hosts)", summary.skipped);
    println!("   Failed:   {} images", summary.failed);
    println!("   Products updated: {}", summary.products_updated);
    if summary.empty_products > 0 {
        println!("   Products without images: {}", summary.empty_products);
    }
    println!("\nMigration complete!");
    println!("\nRun \"storefront-admin migrate-images --list\" to see URLs that need manual migration.");
}

/// Ask before rewriting the catalog, unless told not to or not interactive.
fn confirm_migration(api: &ApiClient, assume_yes: bool) -> std::io::Result<bool> {
    if assume_yes || !std::io::stdin().is_terminal() {
        return Ok(true);
    }
    Confirm::new()
        .with_prompt(format!(
            "Migrate all product images in project {}?",
            api.project_id()
        ))
        .default(false)
        .interact()
}

/// `migrate-images`
pub fn handle_migrate(api: &ApiClient, assume_yes: bool) -> ExitCode {
    match confirm_migration(api, assume_yes) {
        Ok(true) => {}
        Ok(false) => {
            println!("Aborted, nothing changed.");
            return ExitCode::SUCCESS;
        }
        Err(err) => {
            eprintln!("{} {err}", "ERROR:".red().bold());
            return ExitCode::FAILURE;
        }
    }

    println!("Starting image migration...\n");
    println!("Note: images on blocked hosts are listed for manual migration.\n");

    let fetcher = match ImageFetcher::new() {
        Ok(f) => f,
        Err(err) => {
            print_error(&err);
            return ExitCode::FAILURE;
        }
    };
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner} {pos} products processed {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );

    let result = migrate::migrate_catalog(api, api, &fetcher, |report| {
        print_product_report(&pb, report);
        pb.inc(1);
    });
    pb.finish_and_clear();

    match result {
        Ok(summary) => {
            print_summary(&summary);
            ExitCode::SUCCESS
        }
        Err(err) => {
            print_error(&err);
            ExitCode::FAILURE
        }
    }
}

/// `migrate-images --list`
pub fn handle_list_blocked(api: &ApiClient) -> ExitCode {
    println!("Listing all image URLs on blocked hosts...\n");
    let blocked = match migrate::list_blocked(api) {
        Ok(b) => b,
        Err(err) => {
            print_error(&err);
            return ExitCode::FAILURE;
        }
    };
    if blocked.is_empty() {
        println!("{} No blocked images found!", "OK".green());
        return ExitCode::SUCCESS;
    }

    println!("Found {} products with blocked images:\n", blocked.len());
    for (n, product) in blocked.iter().enumerate() {
        println!("{}. {} (ID: {})", n + 1, product.name, product.id);
        for (index, url) in &product.images {
            println!("   Image index {index}: {url}");
        }
        println!();
    }
    println!("\nThese hosts refuse direct server-side downloads.");
    println!("Download these images manually and upload them to storage.");
    println!("Then run: storefront-admin update-product-image <productId> <imageIndex> <newUrl>");
    ExitCode::SUCCESS
}

/// `update-product-image`. Failures of the update itself are reported but
/// still exit 0.
pub fn handle_update_image(api: &ApiClient, product_id: &str, index: i64, new_url: &str) -> ExitCode {
    match patch::update_product_image(api, product_id, index, new_url) {
        Ok(p) => {
            println!("{} Updated product: {}", "OK".green(), p.product_name);
            println!("   Old URL: {}", p.old_url);
            println!("   New URL: {}", p.new_url);
        }
        Err(AdminError::ProductNotFound(id)) => {
            println!("{} Product {id} not found", "FAIL".red());
        }
        Err(err @ AdminError::InvalidImageIndex { .. }) => {
            println!("{} {err}", "FAIL".red());
        }
        Err(err) => print_error(&err),
    }
    ExitCode::SUCCESS
}

/// Parse the raw index argument; anything but an integer is a usage error.
pub fn parse_image_index(raw: &str) -> Result<i64, AdminError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| AdminError::Argument("Image index must be a number".into()))
}
