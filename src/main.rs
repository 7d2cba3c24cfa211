use clap::Parser;
use dotenvy::dotenv;
use meal_cost_analyzer::{
    cli::{self, Cli, CliContext},
    config::{self, seed},
    errors::Result,
    store,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible); stdout is reserved for command output
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    let args = Cli::parse();

    // 3. Load the application configuration
    let app_config = config::load_app_configuration(args.config.as_deref())
        .inspect_err(|e| error!("Failed to load configuration: {}", e))?;

    // 4. Open the selected store
    let store = store::open_store(&app_config)
        .await
        .inspect(|_| info!("Store opened successfully."))
        .inspect_err(|e| error!("Failed to open store: {}", e))?;

    // 5. Seed catalog entries from config (only names not already present)
    seed::seed_catalog(store.as_ref(), &app_config.ingredients)
        .await
        .inspect_err(|e| error!("Failed to seed catalog: {}", e))?;

    // 6. Run the command
    let ctx = CliContext::new(app_config, store);
    let output = cli::run(&ctx, args.command)
        .await
        .inspect_err(|e| error!("Command failed: {}", e))?;

    print!("{output}");
    if !output.ends_with('\n') {
        println!();
    }
    Ok(())
}
