use clap::{Parser, Subcommand};
use lib::llm::GeminiClient;
use lib::webhook::IntentRequest;

#[derive(Parser)]
#[command(name = "collegebot")]
#[command(about = "College chatbot webhook", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and a default config.json.
    Init {
        /// Config file path (default: COLLEGEBOT_CONFIG_PATH or ~/.collegebot/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Run the fulfillment webhook (GET / health, POST /webhook). GEMINI_API_KEY and PORT override the config file.
    Serve {
        /// Config file path (default: COLLEGEBOT_CONFIG_PATH or ~/.collegebot/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// HTTP port (default from PORT, config, or 3000)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Answer one message locally, exactly as the webhook would, and print the response JSON.
    Ask {
        /// Config file path (default: COLLEGEBOT_CONFIG_PATH or ~/.collegebot/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// Intent display name (default: the configured fallback intent)
        #[arg(long, short)]
        intent: Option<String>,

        /// The user's message
        message: String,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("collegebot {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Serve { config, port }) => {
            if let Err(e) = run_serve(config, port).await {
                log::error!("server failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Ask {
            config,
            intent,
            message,
        }) => {
            if let Err(e) = run_ask(config, intent, message).await {
                log::error!("ask failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(lib::config::default_config_path);
    let dir = lib::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

async fn run_serve(
    config_path: Option<std::path::PathBuf>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let (config, _) = lib::config::load_config(config_path)?;
    let mut config = lib::config::apply_env_overrides(config);
    if let Some(p) = port {
        config.server.port = p;
    }
    log::info!(
        "starting webhook on {}:{}",
        config.server.bind,
        config.server.port
    );
    lib::webhook::run_server(config).await
}

async fn run_ask(
    config_path: Option<std::path::PathBuf>,
    intent: Option<String>,
    message: String,
) -> anyhow::Result<()> {
    let (config, _) = lib::config::load_config(config_path)?;
    let config = lib::config::apply_env_overrides(config);
    let gemini = GeminiClient::new(&config.gemini)?;
    let intent = intent.unwrap_or_else(|| config.routing.fallback_intent.clone());
    let req = IntentRequest::new(intent, message);
    let reply = lib::webhook::fulfill(&req, &config, &gemini).await;
    println!("{}", serde_json::to_string_pretty(&reply)?);
    Ok(())
}
