use clap::{Parser, Subcommand};

use crate::config::gateways::GatewaysConfig;
use crate::config::Config;

#[derive(Parser)]
#[command(name = "paygate-core")]
#[command(about = "Paygate Core - Payment Gateway Router", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Database management commands
    #[command(subcommand)]
    Db(DbCommands),

    /// Configuration validation
    Config,
}

#[derive(Subcommand)]
pub enum DbCommands {
    /// Run database migrations
    Migrate,
}

pub async fn handle_db_migrate(config: &Config) -> anyhow::Result<()> {
    let pool = crate::db::create_pool(config).await?;

    tracing::info!("Running database migrations...");
    crate::db::run_migrations(&pool).await?;

    println!("✓ Database migrations completed");
    Ok(())
}

pub async fn handle_config_validate(config: &Config) -> anyhow::Result<()> {
    tracing::info!("Validating configuration...");

    println!("Configuration:");
    println!("  Server Port: {}", config.server_port);
    println!("  Database URL: {}", mask_password(&config.database_url));
    println!(
        "  Redis URL: {}",
        config
            .redis_url
            .as_deref()
            .map(mask_password)
            .unwrap_or_else(|| "(not set, events are logged)".to_string())
    );
    println!("  Gateway Config: {}", config.gateway_config_path.display());
    println!("  Public Base URL: {}", config.public_base_url);

    if let Ok(gateways) = GatewaysConfig::load(&config.gateway_config_path) {
        println!("  Gateways: {}", gateways.gateways.keys().cloned().collect::<Vec<_>>().join(", "));
        println!("  Countries: {}", gateways.countries.keys().cloned().collect::<Vec<_>>().join(", "));
    }

    let report = crate::startup::validate_environment(config).await;
    report.print();
    if !report.is_valid() {
        anyhow::bail!("Configuration is invalid");
    }

    tracing::info!("Configuration is valid");
    println!("✓ Configuration is valid");
    Ok(())
}

fn mask_password(url: &str) -> String {
    if let Some(at_pos) = url.rfind('@') {
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            if let Some(slash_pos) = url[..colon_pos].rfind("//") {
                let prefix = &url[..slash_pos + 2];
                let user = &url[slash_pos + 2..colon_pos];
                let suffix = &url[at_pos..];
                return format!("{}{}:****{}", prefix, user, suffix);
            }
        }
    }
    url.to_string()
}
