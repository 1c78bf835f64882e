use clap::{Parser, Subcommand};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use ircbus_bot::application::services::BotService;
use ircbus_bot::infrastructure::bus::TcpBus;
use ircbus_bot::infrastructure::config::Config;
use ircbus_bot::infrastructure::watcher::TouchWatcher;
use ircbus_bot::modules::{builtin, shared_registry, BotCtx, ModuleManager};

#[derive(Parser)]
#[command(name = "ircbus-bot")]
#[command(about = "Run chat bot modules behind a pubsub message bus", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot
    Run {
        /// Msgbus server address (overrides config)
        #[arg(short, long)]
        server: Option<String>,

        /// Msgbus server port (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Bot identity on the bus (overrides config)
        #[arg(short, long)]
        name: Option<String>,

        /// Reload a module when its config file is modified
        #[arg(long)]
        touch_reload: bool,

        /// Increase logging level
        #[arg(long)]
        debug: bool,
    },
    /// Show version
    Version,
    /// Generate default config
    InitConfig,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let debug = matches!(cli.command, Commands::Run { debug: true, .. });
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    match cli.command {
        Commands::Run {
            server,
            port,
            name,
            touch_reload,
            ..
        } => {
            run_bot(cli.config, server, port, name, touch_reload);
        }
        Commands::Version => {
            println!("ircbus-bot v{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::InitConfig => {
            init_config(&cli.config);
        }
    }
}

fn run_bot(
    config_path: String,
    server: Option<String>,
    port: Option<u16>,
    name: Option<String>,
    touch_reload: bool,
) {
    // Load config
    let mut config = if std::path::Path::new(&config_path).exists() {
        Config::load(&config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}, using defaults", e);
            Config::default()
        })
    } else {
        Config::default()
    };

    if let Some(server) = server {
        config.bus.host = server;
    }
    if let Some(port) = port {
        config.bus.port = port;
    }
    if let Some(name) = name {
        config.bot.name = name;
    }

    info!("Starting ircbus-bot as '{}'", config.bot.name);

    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let (reload_tx, reload_rx) = mpsc::unbounded_channel();

    let ctx = Arc::new(BotCtx::new(
        config.bot.name.as_str(),
        &config.bot.datadir,
        config.bus.topic_prefix.as_str(),
        outbound_tx,
        reload_tx.clone(),
    ));

    // Load modules in config
    let manager = ModuleManager::new(builtin::catalog(), shared_registry(), ctx.clone());
    for module in &config.modules {
        if let Err(e) = manager.load(module) {
            warn!("Failed to load module '{}': {}", module, e);
        }
    }

    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(async {
        if touch_reload {
            let mut watcher = TouchWatcher::new(reload_tx);
            for module in &config.modules {
                if let Some(path) = ctx.config_path(module) {
                    watcher.watch(module, path);
                }
            }
            watcher.spawn();
        }

        let transport = match TcpBus::connect(&config.bus.host, config.bus.port).await {
            Ok(transport) => transport,
            Err(e) => {
                error!(
                    "Failed to connect to msgbus at {}:{}: {}",
                    config.bus.host, config.bus.port, e
                );
                return;
            }
        };

        let mut service = BotService::new(transport, manager, ctx, outbound_rx, reload_rx);
        if let Err(e) = service.run().await {
            error!("Bot terminated: {}", e);
        }
    });
}

fn init_config(path: &str) {
    if std::path::Path::new(path).exists() {
        eprintln!("Config file already exists: {}", path);
        return;
    }
    match serde_yaml::to_string(&Config::default()) {
        Ok(yaml) => match std::fs::write(path, yaml) {
            Ok(()) => println!("Wrote default config to {}", path),
            Err(e) => eprintln!("Failed to write {}: {}", path, e),
        },
        Err(e) => eprintln!("Failed to serialize default config: {}", e),
    }
}
