use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use waqti::config::Command;
use waqti::domain::model::{Identity, ServiceListing};
use waqti::utils::error::ErrorSeverity;
use waqti::utils::{logger, validation::Validate};
use waqti::{
    App, AppConfig, Catalog, CliConfig, LocalStorage, Registration, Result, SessionManager,
    SupabaseClient, WaqtiError,
};

const IDENTITY_WAIT_SECS: u64 = 5;

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    // 設定檔不存在時改用環境變數
    let config = load_config(&cli.config);

    match &config {
        Some(config) if config.json_logs() => {
            logger::init_json_logger(cli.verbose, config.logging.level.as_deref())
        }
        Some(config) => logger::init_cli_logger(cli.verbose, config.logging.level.as_deref()),
        None => logger::init_cli_logger(cli.verbose, None),
    }

    tracing::info!("Starting waqti CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    if let Err(e) = run(cli, config).await {
        tracing::error!(
            "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 1,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 3,
            ErrorSeverity::Critical => 4,
        };
        std::process::exit(exit_code);
    }
}

fn load_config(path: &str) -> Option<AppConfig> {
    if Path::new(path).exists() {
        match AppConfig::from_file(path) {
            Ok(config) => return Some(config),
            Err(e) => {
                eprintln!("❌ Failed to load config file '{}': {}", path, e);
                std::process::exit(1);
            }
        }
    }
    AppConfig::from_env().ok()
}

async fn load_catalog(config: Option<&AppConfig>) -> Result<Catalog> {
    match config.and_then(|c| c.catalog_path()) {
        Some(path) => {
            tracing::info!("📁 Loading catalog from: {}", path);
            Catalog::from_json_file(path).await
        }
        None => Ok(Catalog::builtin()),
    }
}

async fn run(cli: CliConfig, config: Option<AppConfig>) -> Result<()> {
    let catalog = load_catalog(config.as_ref()).await?;

    match cli.command {
        Command::Services(filters) => {
            let criteria = filters.to_criteria()?;
            let results = catalog.filter(&criteria);
            if results.is_empty() {
                println!("No services found. Try adjusting your filters or search terms.");
            }
            for listing in results {
                print_listing(listing);
            }
            Ok(())
        }
        Command::Popular { limit } => {
            for listing in catalog.popular(limit) {
                print_listing(listing);
            }
            Ok(())
        }
        Command::Show { id } => match catalog.get(&id) {
            Some(listing) => {
                print_listing(listing);
                println!("    {}", listing.description);
                Ok(())
            }
            None => Err(WaqtiError::validation(format!("No service with id '{}'", id))),
        },
        Command::Locations => {
            for location in catalog.locations() {
                println!("{}", location);
            }
            Ok(())
        }
        command => {
            let config = config.ok_or_else(|| WaqtiError::MissingConfigError {
                field: "backend (config file or WAQTI_BACKEND_URL / WAQTI_ANON_KEY)".to_string(),
            })?;
            config.validate()?;
            run_session_command(command, config, catalog).await
        }
    }
}

async fn run_session_command(command: Command, config: AppConfig, catalog: Catalog) -> Result<()> {
    let storage = LocalStorage::new(config.session_path());
    let backend = Arc::new(SupabaseClient::new(config, storage)?);
    let session = SessionManager::new(Arc::clone(&backend), backend);
    let mut app = App::start(session, catalog).await;

    let result = match command {
        Command::Login { email, password } => match app.submit_login(&email, &password).await {
            Ok(()) => {
                report_identity(wait_for_identity(&app).await);
                Ok(())
            }
            Err(e) => Err(e),
        },
        Command::Register {
            name,
            email,
            password,
            phone,
        } => {
            let registration = Registration {
                name,
                email,
                password,
                phone,
            };
            match app.submit_register(&registration).await {
                Ok(()) => {
                    match app.current_identity() {
                        Some(identity) => report_identity(Some(identity)),
                        None => println!("✅ Account created. Confirm your email, then log in."),
                    }
                    Ok(())
                }
                Err(e) => Err(e),
            }
        }
        Command::Logout => {
            let result = app.logout().await;
            println!("👋 Signed out");
            result
        }
        Command::Whoami => {
            match app.current_identity() {
                Some(identity) => report_identity(Some(identity)),
                None => println!("Not signed in"),
            }
            Ok(())
        }
        _ => Ok(()),
    };

    app.shutdown();
    result
}

/// The listener fills in the identity once the provider confirms the session.
async fn wait_for_identity<A, P>(app: &App<A, P>) -> Option<Identity>
where
    A: waqti::core::IdentityProvider + 'static,
    P: waqti::core::ProfileStore + 'static,
{
    let mut rx = app.session().watch_identity();
    let waited = tokio::time::timeout(
        std::time::Duration::from_secs(IDENTITY_WAIT_SECS),
        rx.wait_for(|identity| identity.is_some()),
    )
    .await;

    match waited {
        Ok(Ok(identity)) => identity.clone(),
        _ => {
            tracing::warn!("⚠️ Signed in, but the member profile did not load in time");
            None
        }
    }
}

fn report_identity(identity: Option<Identity>) {
    match identity {
        Some(identity) => println!(
            "✅ Signed in as {} <{}> | balance: {} hours | member since {}",
            identity.name,
            identity.email,
            identity.balance,
            identity.joined_at.format("%Y-%m-%d")
        ),
        None => println!("✅ Signed in"),
    }
}

fn print_listing(listing: &ServiceListing) {
    let hours = if listing.hourly_rate == 1 { "Hour" } else { "Hours" };
    println!(
        "[{}] {} | {} | {} {} | {}/5 ({}) | {} | by {}",
        listing.id,
        listing.title,
        listing.category,
        listing.hourly_rate,
        hours,
        listing.rating,
        listing.reviews,
        listing.location,
        listing.provider.name
    );
}
