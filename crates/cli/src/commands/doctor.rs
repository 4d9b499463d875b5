//! `pricelens doctor`: Check configuration, credentials, and reachability.

use pricelens_config::AppConfig;

pub async fn run() -> anyhow::Result<()> {
    println!("🩺 PriceLens Doctor");
    println!("===================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("  ✅ Config file found: {}", config_path.display());
    } else {
        println!("  ⚠️  No config file, using defaults (run `pricelens onboard`)");
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  1 issue found. Fix the config and re-run.");
            return Ok(());
        }
    };

    match pricelens_providers::build_from_config(&config) {
        Ok(provider) => match provider.health_check().await {
            Ok(true) => println!("  ✅ Completion service reachable ({})", provider.name()),
            Ok(false) => {
                println!("  ❌ Completion service not healthy ({})", provider.name());
                issues += 1;
            }
            Err(e) => {
                println!("  ❌ Completion service unreachable: {e}");
                issues += 1;
            }
        },
        Err(e) => {
            println!("  ❌ Completion service not configured: {e}");
            issues += 1;
        }
    }

    match pricelens_catalog::build_from_config(&config.catalog) {
        Ok(catalog) => match catalog.health_check().await {
            Ok(true) => println!("  ✅ Price catalog reachable ({})", catalog.name()),
            Ok(false) => {
                println!("  ❌ Price catalog not healthy ({})", catalog.name());
                issues += 1;
            }
            Err(e) => {
                println!("  ❌ Price catalog unreachable: {e}");
                issues += 1;
            }
        },
        Err(e) => {
            println!("  ❌ Price catalog not configured: {e}");
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
