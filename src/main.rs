use clap::Parser;
use purchase_tagger::adapters::mailchimp::verify_credentials;
use purchase_tagger::config::cli::{Command, SyncArgs, VerifyArgs};
use purchase_tagger::domain::ports::SettingsStore;
use purchase_tagger::utils::error::SyncError;
use purchase_tagger::utils::{logger, validation::Validate};
use purchase_tagger::{
    CliConfig, InMemoryTagMetadata, OrderMetaNameResolver, OrderTagSync, SyncReport, TomlSettings,
};

async fn run_sync(args: &SyncArgs) -> Result<SyncReport, SyncError> {
    let settings = TomlSettings::from_file(&args.settings)?;
    let tags = match &args.tags {
        Some(path) => InMemoryTagMetadata::from_file(path)?,
        None => InMemoryTagMetadata::new(),
    };
    let order = args.load_order()?;
    let event = args.status_change(&order);
    let connector = args.connection.connector()?;

    tracing::debug!("Loaded {} tag mappings", tags.len());

    let mut sync = OrderTagSync::new(&connector, &settings, &order, &tags);
    if args.overrides_names() {
        sync = sync.with_name_resolver(OrderMetaNameResolver::new(
            args.first_name_meta.clone(),
            args.last_name_meta.clone(),
        ));
    }

    let outcome = sync.handle(&event).await;
    Ok(SyncReport::new(order.id, outcome))
}

async fn run_verify(args: &VerifyArgs) -> Result<(), SyncError> {
    let api_key = match &args.api_key {
        Some(key) => key.clone(),
        None => TomlSettings::from_file(&args.settings)?
            .get("api_key")
            .ok_or_else(|| SyncError::MissingConfigError {
                field: "api_key".to_string(),
            })?,
    };

    let client = args.connection.connector()?.connect_with_key(api_key.trim())?;
    tracing::info!("Verifying API key against {}", client.base_url());

    for audience in verify_credentials(&client).await? {
        println!("{}\t{}", audience.id, audience.name);
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let config = CliConfig::parse();

    if config.json_logs {
        logger::init_json_logger(config.verbose);
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting purchase-tagger CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(e.exit_code());
    }

    let result = match &config.command {
        Command::Sync(args) => run_sync(args).await.and_then(|report| {
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }),
        Command::Verify(args) => run_verify(args).await,
    };

    if let Err(e) = result {
        tracing::error!("❌ Command failed: {} (Severity: {:?})", e, e.severity());
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());

        std::process::exit(e.exit_code());
    }
}
