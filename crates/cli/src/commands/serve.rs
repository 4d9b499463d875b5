//! `pricelens serve`: Start the HTTP query endpoint.

use anyhow::Context;
use pricelens_config::AppConfig;

pub async fn run(port_override: Option<u16>) -> anyhow::Result<()> {
    let mut config = AppConfig::load().context("Failed to load config")?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("🔎 PriceLens Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Model:     {}", pricelens_providers::model_for(&config));
    if let Some(path) = &config.catalog.fixture_path {
        println!("   Catalog:   fixture {}", path.display());
    } else {
        println!("   Catalog:   AWS Price List ({})", config.catalog.endpoint_region);
    }

    pricelens_gateway::start(config).await?;

    Ok(())
}
