use anyhow::{Context as AnyhowContext, Result};
use chdb::{ClickhouseClient, list_instances};
use colored::Colorize;

use crate::Context;
use crate::config::Config;
use crate::ui;

pub fn run(ctx: &Context, json: bool) -> Result<()> {
    // Listing only needs connection settings, so a missing file is fine
    let config = if ctx.config_path.exists() {
        Config::load(&ctx.config_path)?
    } else {
        log::debug!("No config at {}; using client defaults", ctx.config_path.display());
        Config::default()
    };
    let client = ClickhouseClient::new(config.client);

    let databases = list_instances(&client)
        .with_context(|| format!("Could not list databases through {}", client.program()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&databases)?);
        return Ok(());
    }

    ui::header("Databases");
    for db in &databases {
        let engine = if db.engine_kind().is_some() {
            db.engine.normal()
        } else {
            db.engine.dimmed()
        };
        println!(
            "  {:<30} {:<12} {}",
            db.name,
            engine,
            ui::plural(db.tables, "table").dimmed()
        );
    }
    println!();
    ui::kv("Total", &databases.len().to_string());

    Ok(())
}
