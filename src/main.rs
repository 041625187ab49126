// Entrypoint for the admin CLI.
// - Keeps `main` small: parse arguments, build the API client once and hand
//   it to the matching handler in `ui`.
// - Argument problems are reported before credentials are touched; missing
//   credentials are reported before any remote call.

use std::process::ExitCode;

use anyhow::anyhow;
use clap::Parser;
use storefront_admin::api::ApiClient;
use storefront_admin::cli::{Cli, Command};
use storefront_admin::ui;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!(e))
}

fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
            e.print()?;
            return Ok(code);
        }
    };
    init_tracing(cli.verbose)?;

    // Resolve every argument-level decision up front.
    let set_claim_target = match &cli.command {
        Command::SetClaim { identifier, uid } => match identifier.clone().or_else(|| uid.clone()) {
            Some(target) => Some(target),
            None => {
                eprintln!("No account given: pass an identifier or set ADMIN_UID / --uid");
                return Ok(ExitCode::FAILURE);
            }
        },
        _ => None,
    };
    let image_index = match &cli.command {
        Command::UpdateProductImage { image_index, .. } => match ui::parse_image_index(image_index) {
            Ok(index) => Some(index),
            Err(err) => {
                println!("{err}");
                println!("\n{}", ui::UPDATE_USAGE);
                return Ok(ExitCode::FAILURE);
            }
        },
        _ => None,
    };

    let config = cli.global.to_config();
    let api = match ApiClient::connect(&config) {
        Ok(api) => api,
        Err(err) => {
            ui::print_startup_error(&err);
            return Ok(ExitCode::FAILURE);
        }
    };
    ui::print_project_banner(&config, &api);

    let code = match &cli.command {
        Command::SetClaim { .. } => {
            ui::handle_set_claim(&api, set_claim_target.as_deref().unwrap_or_default())
        }
        Command::CheckClaim { uid } => ui::handle_check_claim(&api, uid),
        Command::SetAndVerify { uid } => ui::handle_set_and_verify(&api, uid),
        Command::MigrateImages { list: true, .. } => ui::handle_list_blocked(&api),
        Command::MigrateImages { list: false, yes } => ui::handle_migrate(&api, *yes),
        Command::UpdateProductImage {
            product_id,
            new_url,
            ..
        } => ui::handle_update_image(&api, product_id, image_index.unwrap_or_default(), new_url),
    };
    Ok(code)
}
