pub mod declarative;
pub mod list;
pub mod validate;

use anyhow::{Context as AnyhowContext, Result};
use chdb::{ClickhouseClient, ReconcileContext, Reconciler};

use crate::Context;
use crate::config::Config;

/// Load the config file and build the client it describes
pub fn load(ctx: &Context) -> Result<(Config, ClickhouseClient)> {
    let config = Config::load(&ctx.config_path)?;
    let client = ClickhouseClient::new(config.client.clone());
    Ok((config, client))
}

/// Discover the server and pair it with the declarations
pub fn prefetch(
    config: &Config,
    client: &ClickhouseClient,
    target: Option<&str>,
) -> Result<ReconcileContext> {
    let decls = config.declarations()?;
    let pass = Reconciler::new(client)
        .prefetch(decls)
        .with_context(|| format!("Could not read databases through {}", client.program()))?;
    Ok(pass.filter_by_target(target))
}
