//! Nova decision ledger Server Entry Point

use clap::Parser;
use nova_ledger::cli::{serve::ServeArgs, verify, Cli, Commands};
use nova_ledger::config::ServerConfig;
use nova_ledger::db::ledger::SqliteLedgerStore;
use nova_ledger::db::migrations::{database_file, initialize_database};
use nova_ledger::lock::LedgerLock;
use nova_ledger::{logging, server, AppState};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Verify(args)) => {
            init_cli_logging();
            let code = match verify::execute(&args).await {
                Ok(report) => match verify::print_report(&report, args.json) {
                    Ok(code) => code,
                    Err(e) => fail(e),
                },
                Err(e) => fail(e),
            };
            std::process::exit(code);
        }
        Some(Commands::Token(args)) => {
            init_cli_logging();
            match nova_ledger::cli::token::execute(&args) {
                Ok(token) => println!("{}", token),
                Err(e) => fail(e),
            }
        }
        Some(Commands::Serve(args)) => run_server(args).await,
        None => run_server(ServeArgs::from_env()).await,
    }
}

fn init_cli_logging() {
    if let Err(e) = logging::init_cli() {
        eprintln!("Error: failed to initialize logging: {}", e);
        std::process::exit(1);
    }
}

fn fail(e: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", e);
    std::process::exit(1);
}

async fn run_server(args: ServeArgs) {
    if let Err(e) = logging::init() {
        fail(format!("failed to initialize logging: {}", e));
    }

    let config = match ServerConfig::from_args(args.host, args.port) {
        Ok(config) => config,
        Err(e) => fail(e),
    };

    info!(
        "Nova ledger v{} starting (append mode: {})",
        env!("CARGO_PKG_VERSION"),
        config.writer.mode
    );

    let _lock = match database_file(&config.database_url) {
        Ok(Some(path)) => match LedgerLock::acquire(&path) {
            Ok(lock) => Some(lock),
            Err(e) => fail(e),
        },
        Ok(None) => None,
        Err(e) => fail(e),
    };

    let pool = match initialize_database(&config.database_url).await {
        Ok(pool) => pool,
        Err(e) => fail(e),
    };
    info!("Ledger database ready: {}", config.database_url);

    let store = Arc::new(SqliteLedgerStore::new(pool.clone()));
    let state = AppState::new(store, &config);

    if let Err(e) = server::run(state, &config.bind_addr(), server::shutdown_signal()).await {
        fail(e);
    }

    pool.close().await;
}
