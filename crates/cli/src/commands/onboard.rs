//! `pricelens onboard`: First-time setup.

use pricelens_config::AppConfig;

pub async fn run() -> anyhow::Result<()> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("🔎 PriceLens — First-Time Setup");
    println!("===============================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("✅ Created config.toml at: {}", config_path.display());
    println!("\n📝 Next steps:");
    println!("   1. Set api_key (or OPENAI_API_KEY) for the completion service");
    println!("   2. Set AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY for the price list");
    println!("   3. Run: pricelens doctor");
    println!("   4. Run: pricelens ask \"t2.micro linux in Tokyo\"\n");

    Ok(())
}
