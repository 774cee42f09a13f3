use clap::{Parser, Subcommand};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use baby_bot::application::errors::{BotError, ConfigError};
use baby_bot::application::messaging::{Dispatcher, ValueParser};
use baby_bot::application::services::CommandService;
use baby_bot::domain::traits::{Bot, Store};
use baby_bot::infrastructure::adapters::{ConsoleAdapter, TelegramAdapter};
use baby_bot::infrastructure::config::{Config, StoreKind};
use baby_bot::infrastructure::database::SqliteStore;
use baby_bot::infrastructure::keepalive::{self, KeepAlive};
use baby_bot::infrastructure::storage::MemoryStore;
use baby_bot::VERSION;

#[derive(Parser)]
#[command(name = "baby-bot")]
#[command(about = "Chat bot that tracks measurements and reports the change", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Telegram bot token (overrides config and environment)
    #[arg(short, long)]
    token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot
    Run,
    /// Show version
    Version,
    /// Generate default config
    InitConfig,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run => {
            if let Err(e) = run(&cli.config, cli.token) {
                tracing::error!("{}", e);
                std::process::exit(1);
            }
        }
        Commands::Version => {
            println!("baby-bot v{}", VERSION);
        }
        Commands::InitConfig => {
            if let Err(e) = init_config() {
                eprintln!("{}", e);
                std::process::exit(1);
            }
        }
    }
}

fn run(config_path: &str, token_override: Option<String>) -> Result<(), BotError> {
    let config = load_config(config_path, token_override);
    init_logging(config.as_ref().map(|c| c.debug).unwrap_or(false));
    let config = config?;

    tracing::info!("Started baby-bot version {}", VERSION);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| BotError::Internal(format!("Failed to start runtime: {}", e)))?;
    let result = rt.block_on(run_bot(config));

    tracing::info!("Finished!");
    result
}

fn init_logging(debug: bool) {
    let level = if debug { tracing::Level::DEBUG } else { tracing::Level::INFO };

    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(level.into()),
        )
        .init();
}

/// Defaults, then the YAML file if present, then environment, then CLI
fn load_config(path: &str, token_override: Option<String>) -> Result<Config, ConfigError> {
    let mut config = if Path::new(path).exists() {
        Config::load(path)?
    } else {
        Config::default()
    };

    config.apply_env()?;

    if let Some(token) = token_override {
        config.telegram.token = Some(token);
    }

    config.validate()?;
    Ok(config)
}

async fn run_bot(config: Config) -> Result<(), BotError> {
    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone());

    let keep_alive = KeepAlive::from_config(&config.keep_alive).spawn(cancel.clone());
    let store = make_store(&config)?;
    let commands = CommandService::with_defaults();

    match config.telegram.token.clone() {
        Some(token) => {
            let mut bot = TelegramAdapter::new(token, config.telegram.proxy.as_deref(), config.bot.poll_timeout_secs)?;

            if let Err(e) = bot.delete_webhook().await {
                tracing::warn!("Failed to remove webhook: {}", e);
            }
            bot.fetch_bot_info().await?;
            tracing::info!("Bot started: @{}", bot.bot_info().username);

            if let Err(e) = bot.register_commands(&commands.descriptions()).await {
                tracing::warn!("Failed to register commands: {}", e);
            }

            run_dispatcher(commands, store, bot, &config, cancel.clone()).await;
        }
        None => {
            tracing::warn!("TELEGRAM_TOKEN is not set, running console bot (dev mode)");
            run_dispatcher(commands, store, ConsoleAdapter::new(), &config, cancel.clone()).await;
        }
    }

    // The loop may also end on its own, e.g. console EOF
    cancel.cancel();
    keepalive::join(keep_alive).await;

    Ok(())
}

async fn run_dispatcher<B: Bot>(
    commands: CommandService,
    store: Arc<dyn Store>,
    bot: B,
    config: &Config,
    cancel: CancellationToken,
) {
    let mut dispatcher = Dispatcher::new(commands, ValueParser::new(), store, bot)
        .with_store_timeout(config.store_timeout());
    dispatcher.run(cancel).await;
}

fn make_store(config: &Config) -> Result<Arc<dyn Store>, BotError> {
    match config.store.kind {
        StoreKind::Sqlite => {
            let store = SqliteStore::open(&config.store.path)?;
            tracing::info!("Database initialized at {}", config.store.path.display());
            Ok(Arc::new(store))
        }
        StoreKind::Memory => {
            tracing::warn!("Using in-memory store, measurements are lost on exit");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

fn spawn_signal_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        tracing::info!("Interrupt signal received");
        cancel.cancel();
    });
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut term, mut quit) = match (signal(SignalKind::terminate()), signal(SignalKind::quit())) {
        (Ok(term), Ok(quit)) => (term, quit),
        _ => {
            tracing::warn!("Failed to install unix signal handlers, only ctrl-c stops the bot");
            ctrl_c().await;
            return;
        }
    };

    loop {
        tokio::select! {
            _ = ctrl_c() => return,
            _ = term.recv() => return,
            _ = quit.recv() => tracing::info!("SIGQUIT detected"),
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    ctrl_c().await;
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to install ctrl-c handler: {}", e);
        std::future::pending::<()>().await;
    }
}

fn init_config() -> Result<(), ConfigError> {
    let yaml = Config::default().to_yaml()?;
    println!("{}", yaml);
    println!("\nSave this to config.yaml and adjust as needed.");
    Ok(())
}
