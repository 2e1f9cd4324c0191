use std::process::ExitCode;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use gator::{build_registry, CommandContext, Config, Database, HttpFeedParser, Result, Session};

#[tokio::main]
async fn main() -> ExitCode {
    let mut args = std::env::args().skip(1);
    let Some(command) = args.next() else {
        eprintln!("usage: gator <command> [args...]");
        eprintln!("run `gator help` for the list of commands");
        return ExitCode::FAILURE;
    };
    let args: Vec<String> = args.collect();

    // Load configuration
    let config = match Config::load_from_env().and_then(|c| c.validate().map(|_| c)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Initialize logging
    if let Err(e) = gator::logging::init(&config.logging) {
        eprintln!("Failed to initialize file logging: {e}");
        gator::logging::init_console_only(&config.logging.level);
    }

    match run(config, &command, &args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if e.is_fatal() {
                error!("Fatal: {}", e);
            }
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config, command: &str, args: &[String]) -> Result<()> {
    let session_path = config.session.resolved_path();
    let session = Session::load(&session_path)?;
    debug!("Session loaded from {:?}", session_path);

    let db_url = config
        .db_url_override
        .clone()
        .unwrap_or_else(|| session.db_url().to_string());
    let db = Database::open(&db_url).await?;

    let parser = Arc::new(HttpFeedParser::new(&config.fetcher)?);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, shutting down");
            on_signal.cancel();
        }
    });

    let registry = build_registry();
    let ctx = CommandContext::new(db.clone(), session, parser, config).with_cancel(cancel);
    let result = registry.run(&ctx, command, args).await;

    db.close().await;
    result
}
