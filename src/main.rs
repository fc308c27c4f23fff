// Headless driver for the uploader core. The desktop shell links the library
// directly; this binary is for inspecting a local profile from a terminal.

use anyhow::{bail, Context, Result};
use r2_uploader::{config, logging, AppContext};
use std::path::PathBuf;

const USAGE: &str =
    "usage: r2-uploader <stage PATH...|preview PATH|history [LIMIT]|settings|buckets>";

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = logging::init_logging() {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let mut args = std::env::args().skip(1);
    let Some(command) = args.next() else {
        bail!(USAGE);
    };

    config::ensure_app_dir().context("Failed to create application directory")?;
    let db_path = config::get_db_path()?;
    let ctx = AppContext::open(&db_path)
        .with_context(|| format!("Failed to open database at {}", db_path.display()))?;

    match command.as_str() {
        "stage" => {
            let paths: Vec<PathBuf> = args.map(PathBuf::from).collect();
            if paths.is_empty() {
                bail!(USAGE);
            }
            let report = ctx.add_paths(paths).await;
            for failure in &report.failures {
                eprintln!("skipped {}: {}", failure.path.display(), failure.message);
            }
            println!("{}", serde_json::to_string_pretty(&ctx.staged_items()?)?);
        }
        "preview" => {
            let path = args.next().map(PathBuf::from).context(USAGE)?;
            println!("{}", ctx.preview(&path).await?);
        }
        "history" => {
            let limit = match args.next() {
                Some(limit) => limit.parse::<usize>().context("LIMIT must be a number")?,
                None => 20,
            };
            println!("{}", serde_json::to_string_pretty(&ctx.history(limit).await?)?);
        }
        "settings" => {
            let output = serde_json::json!({
                "app": ctx.settings.app_settings()?,
                "proxyType": ctx.settings.proxy_settings()?.proxy_type,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        "buckets" => {
            println!("{}", serde_json::to_string_pretty(&ctx.list_buckets()?)?);
        }
        other => bail!("unknown command '{}'\n{}", other, USAGE),
    }

    Ok(())
}
