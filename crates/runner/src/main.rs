use std::path::PathBuf;

use anyhow::Context;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    depotwatch_observability::init();

    let orders_file = std::env::var_os(depotwatch_runner::ENV_ORDERS_FILE)
        .or_else(|| std::env::args_os().nth(1))
        .map(PathBuf::from)
        .with_context(|| {
            format!(
                "no orders file: set {} or pass a path",
                depotwatch_runner::ENV_ORDERS_FILE
            )
        })?;

    let config = depotwatch_exceptions::EngineConfig::from_env()
        .context("invalid engine configuration")?;

    let report = depotwatch_runner::run(&config, &orders_file).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
