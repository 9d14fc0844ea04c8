use clap::Parser;
use hubspot_etl::config::params::RunConfig;
use hubspot_etl::config::toml_config::TomlConfig;
use hubspot_etl::core::dispatcher::{object_query, RetrievalMode};
use hubspot_etl::core::fetcher::{Endpoint, HubSpotClient};
use hubspot_etl::core::ConfigProvider;
use hubspot_etl::utils::{logger, validation::Validate};
use hubspot_etl::{EtlEngine, HubSpotPipeline, LocalStorage};

#[derive(Parser)]
#[command(name = "toml-etl")]
#[command(about = "HubSpot ETL driven by a TOML configuration file")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "hubspot-etl.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Override the HubSpot object type from config
    #[arg(long)]
    object: Option<String>,

    /// Dry run - show what would be requested without calling HubSpot
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    logger::init_cli_logger_with_level(args.verbose, config.log_level());

    tracing::info!("🚀 Starting TOML-based HubSpot ETL");
    tracing::info!("📁 Loaded configuration from: {}", args.config);

    // 命令列覆蓋設定
    if let Some(object) = &args.object {
        config.params.hubspot_object = Some(object.clone());
        tracing::info!("🔧 HubSpot object overridden to: {}", object);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("✅ Configuration loaded and validated successfully");
    let run = RunConfig::try_from(config.custom_params())?;

    display_config_summary(&config, &run, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No requests will be sent");
        perform_dry_run(&config, &run)?;
        return Ok(());
    }

    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let storage = LocalStorage::new(config.output_path().to_string());
    let pipeline = HubSpotPipeline::new(storage, config)?;
    let engine = EtlEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run().await {
        Ok(report) => {
            tracing::info!("✅ ETL process completed successfully!");
            println!("✅ ETL process completed successfully!");
            println!("📊 Rows: {}  Columns: {}", report.rows, report.columns.len());
            println!("📁 Output saved to: {}", report.output_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ ETL process failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            let exit_code = e.severity().exit_code();
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

fn display_config_summary(config: &TomlConfig, run: &RunConfig, args: &Args) {
    println!("📋 Configuration Summary:");
    println!(
        "  Pipeline: {} v{}",
        config.pipeline.name,
        config.pipeline.version.as_deref().unwrap_or("-")
    );
    println!("  Source: {}", config.base_url());
    println!("  Object: {}", run.object_kind);
    println!("  Output: {}", config.output_path());
    let formats: Vec<String> = config.output_formats().iter().map(|f| f.to_string()).collect();
    println!("  Formats: {}", formats.join(", "));
    println!("  Max Pages: {}", config.max_pages());

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

fn perform_dry_run(config: &TomlConfig, run: &RunConfig) -> Result<(), Box<dyn std::error::Error>> {
    let client = HubSpotClient::from_config(config)?;
    let mode = run.retrieval_mode();

    println!("🔍 Dry Run Analysis:");
    println!();
    println!("📡 Requests:");
    match mode {
        RetrievalMode::Properties => {
            println!("  GET {}", client.url(Endpoint::Properties(&run.object_kind)));
        }
        RetrievalMode::Pipelines => {
            println!("  GET {}", client.url(Endpoint::Pipelines(&run.object_kind)));
        }
        RetrievalMode::Owners => {
            println!("  GET {}", client.url(Endpoint::Owners));
        }
        RetrievalMode::Objects => {
            println!("  GET {}", client.url(Endpoint::Properties(&run.object_kind)));
            println!("  GET {}", client.url(Endpoint::Objects(&run.object_kind)));
            let query = object_query(run, run.properties.as_deref());
            for (key, value) in query.as_pairs() {
                println!("    {}={}", key, value);
            }
            if run.include_all_properties {
                println!("    properties=<every property in the catalog>");
            }
        }
    }

    println!();
    println!("⚙️ Processing Mode:");
    println!("  Retrieval: {:?}", mode);
    println!("  Flatten: {:?}", run.flatten_mode());

    println!();
    println!("✅ Dry run analysis complete. Use --verbose for more details during actual run.");
    Ok(())
}
