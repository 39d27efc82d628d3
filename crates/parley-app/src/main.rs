use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use parley_ai::AiBridge;
use parley_app::{command::HELP, session::FileSessionStore, App, Command, Config};
use parley_store::ChatService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::load()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    // Initialize logging
    init_logging(&config);

    tracing::info!("Starting Parley");

    let service = ChatService::new();
    service.seed().await;

    let bridge = AiBridge::from_api_key(config.gemini_api_key.clone(), config.ai.clone().into())?;
    if bridge.is_enabled() {
        tracing::info!(model = %bridge.config().model, "AI features enabled");
    }

    let sessions = Arc::new(FileSessionStore::new(&config.session.path));
    let mut app = App::new(service, bridge, sessions, config.typing.idle_timeout());

    let mut stdout = tokio::io::stdout();
    let greeting = match app.restore().await {
        Some(welcome) => format!("{}\n{}", welcome, HELP),
        None => format!("Log in with /login <user-id>. Users:\n{}", app.execute(Command::Users(None)).await?),
    };
    print(&mut stdout, &greeting).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    app.shutdown().await;
                    break;
                };
                let command = Command::parse(&line);
                let quit = command == Command::Quit;
                match app.execute(command).await {
                    Ok(output) => print(&mut stdout, &output).await?,
                    Err(e) => print(&mut stdout, &format!("Error: {:#}", e)).await?,
                }
                if quit {
                    break;
                }
            }
            Some(chats) = app.next_update() => {
                match app.apply_update(chats).await {
                    Ok(notices) => {
                        for notice in notices {
                            print(&mut stdout, &format!("* {}", notice)).await?;
                        }
                    }
                    Err(e) => tracing::warn!("Failed to apply chat update: {:#}", e),
                }
            }
        }
    }

    tracing::info!("Parley stopped");
    Ok(())
}

async fn print(stdout: &mut tokio::io::Stdout, text: &str) -> anyhow::Result<()> {
    if text.is_empty() {
        return Ok(());
    }
    stdout.write_all(text.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await?;
    Ok(())
}

fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    // stdout belongs to the REPL
    match config.logging.format.as_str() {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }
}
