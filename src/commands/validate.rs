use anyhow::{Result, bail};
use chdb::{ClickhouseClient, Ensure};

use crate::Context;
use crate::config::Config;
use crate::ui;

pub fn run(ctx: &Context) -> Result<()> {
    ui::header("Validating Config");
    ui::kv("File", &ctx.config_path.display().to_string());

    let config = Config::load(&ctx.config_path)?;

    let problems = config.problems();
    if !problems.is_empty() {
        for (name, error) in &problems {
            ui::error(&format!("{name}: {error}"));
        }
        bail!("{} invalid declarations", problems.len());
    }

    let decls = config.declarations()?;
    println!();
    for decl in &decls {
        match decl.ensure() {
            Ensure::Present => ui::dim(&decl.redacted_create_statement()),
            Ensure::Absent if decl.force() => ui::dim(&format!("{} (force)", decl.drop_statement())),
            Ensure::Absent => ui::dim(&decl.drop_statement()),
        }
    }

    let client = ClickhouseClient::new(config.client);
    if !client.is_available() {
        ui::warn(&format!("{} could not be started", client.program()));
    }

    println!();
    ui::success(&format!("{} databases declared", decls.len()));
    Ok(())
}
