use actix_web::{App, HttpServer, web};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::{error, info};

mod api;
use crate::api::{
    error::ServiceError,
    health::health_config,
    job::{dto::JobListResponse, handlers::job_config, models::JobQuery, JobQueryEngine, JobService},
    user::{handlers::user_config, models::RegistrationView, RegistrationTracker, UserService},
    validation,
    wallet::wallet_config,
};
mod chain;
use crate::chain::{
    pubkey::Pubkey,
    rpc::RpcClient,
    transaction::{RpcTransactionSubmitter, TransactionSubmitter},
};
mod config;
mod logging;
mod shutdown;
mod wallet;
use crate::wallet::{Caller, IdentityProvider, WalletSession};
mod worker;
use crate::shutdown::ShutdownCoordinator;
use crate::worker::RegistrationWatcher;

#[derive(Parser)]
#[command(name = "freelance-gateway")]
#[command(about = "HTTP gateway for the on-chain freelancing marketplace", long_about = None)]
struct Cli {
    /// JSON-RPC endpoint, overrides RPC_URL
    #[arg(long, global = true, value_name = "URL")]
    rpc_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (default)
    Serve {
        /// Port for the HTTP API, overrides PORT
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Query jobs once and print them as JSON
    Jobs {
        /// `all`, `my` or a client address
        #[arg(long, default_value = "all")]
        client: String,

        /// `all` or a freelancer address
        #[arg(long, default_value = "all")]
        freelancer: String,

        /// `all` or a job status
        #[arg(long, default_value = "all")]
        status: String,

        /// Maximum number of jobs; zero or negative means no limit
        #[arg(long, allow_negative_numbers = true)]
        limit: Option<i64>,

        /// Query as this identity without a keypair
        #[arg(long = "as", value_name = "ADDRESS")]
        identity: Option<Pubkey>,
    },

    /// Check whether the configured wallet has a user profile
    Whoami,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let cli = Cli::parse();

    // Load configuration from environment
    let mut config = config::Config::from_env()
        .expect("Failed to load configuration");
    if let Some(rpc_url) = cli.rpc_url {
        config.rpc_url = rpc_url;
    }

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.port = port;
            }
            serve(config).await
        }
        Commands::Jobs { client, freelancer, status, limit, identity } => {
            logging::init_console();
            let query = JobQuery {
                client: Some(client),
                freelancer: Some(freelancer),
                status: Some(status),
                limit,
            };
            exit_on_error(print_jobs(&config, query, identity).await);
            Ok(())
        }
        Commands::Whoami => {
            logging::init_console();
            exit_on_error(print_registration(&config).await);
            Ok(())
        }
    }
}

async fn serve(config: config::Config) -> std::io::Result<()> {
    let config::Config {
        rpc_url,
        program_id,
        wallet_keypair,
        wallet_autoconnect,
        bind_addr,
        port,
        max_payload_size,
        rpc_timeout,
        confirm_timeout,
        log_dir,
    } = config;

    logging::init(&log_dir)
        .expect("Failed to initialize logging");

    let rpc = Arc::new(RpcClient::new(&rpc_url, program_id, rpc_timeout)
        .expect("Failed to build RPC client"));
    let wallet = Arc::new(WalletSession::load(wallet_keypair.as_deref(), wallet_autoconnect)
        .expect("Failed to load wallet keypair"));

    info!("Starting freelance-gateway");
    info!("Configuration loaded successfully:");
    info!("  - RPC endpoint: {}", rpc_url);
    info!("  - Program: {}", rpc.program_id());
    info!("  - Wallet: {}", match wallet.current_identity() {
        Some(identity) => identity.to_string(),
        None if wallet.has_keypair() => "loaded, not connected".to_string(),
        None => "none (read-only)".to_string(),
    });
    info!("  - Max payload size: {} bytes", max_payload_size);
    info!("  - Confirmation timeout: {:?}", confirm_timeout);

    let submitter: Arc<dyn TransactionSubmitter> =
        Arc::new(RpcTransactionSubmitter::new(rpc.clone(), confirm_timeout));
    let engine = Arc::new(JobQueryEngine::new(rpc.clone()));
    let tracker = Arc::new(RegistrationTracker::new(wallet.clone(), rpc.clone(), program_id));

    let job_service = web::Data::new(JobService::new(engine.clone(), submitter.clone(), program_id));
    let user_service = web::Data::new(UserService::new(rpc.clone(), submitter, tracker.clone(), program_id));
    let rpc_data = web::Data::from(rpc);
    let engine_data = web::Data::from(engine);
    let wallet_data = web::Data::from(wallet.clone());

    // Create shutdown channel for graceful shutdown
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    // Keep the registration state in step with the wallet
    let watcher = RegistrationWatcher::new(tracker);
    let identity_rx = wallet.subscribe();
    let watcher_handle = tokio::spawn(async move {
        watcher.run(identity_rx, shutdown_rx).await;
    });
    info!("Spawned registration watcher");

    let server = HttpServer::new(move || {
        // Configure payload size limits globally
        let payload_config = web::PayloadConfig::default()
            .limit(max_payload_size);

        App::new()
            .app_data(rpc_data.clone())
            .app_data(engine_data.clone())
            .app_data(job_service.clone())
            .app_data(user_service.clone())
            .app_data(wallet_data.clone())
            .app_data(payload_config) // Global payload size limit
            .app_data(validation::json_config()) // Global validation config
            .app_data(validation::query_config())
            .configure(health_config) // Health check endpoints
            .configure(job_config)
            .configure(user_config)
            .configure(wallet_config)
    });

    info!("Server starting on http://{}:{}", bind_addr, port);

    // Bind and start the server
    let server = server
        .bind((bind_addr.as_str(), port))?
        .run();

    // Get server handle for graceful shutdown
    let server_handle = server.handle();

    // Spawn server in background
    let server_task = tokio::spawn(server);

    // Create shutdown coordinator and wait for shutdown signal
    let coordinator = ShutdownCoordinator::new(server_handle, server_task, shutdown_tx)
        .with_worker("registration-watcher", watcher_handle);

    coordinator.wait_for_shutdown().await
}

async fn print_jobs(config: &config::Config, query: JobQuery, identity: Option<Pubkey>) -> Result<(), ServiceError> {
    let rpc = Arc::new(connect_rpc(config)?);

    let caller = match identity {
        Some(identity) => Caller::read_only(identity),
        None => load_wallet(config)?.caller(),
    };

    let criteria = query.into_criteria()?;
    let jobs = JobQueryEngine::new(rpc).query_jobs(&caller, &criteria).await?;
    print_json(&JobListResponse::from(jobs));
    Ok(())
}

async fn print_registration(config: &config::Config) -> Result<(), ServiceError> {
    let rpc = Arc::new(connect_rpc(config)?);
    let wallet = Arc::new(load_wallet(config)?);

    let tracker = RegistrationTracker::new(wallet, rpc, config.program_id);
    let status = tracker.refresh().await;
    print_json(&RegistrationView::from(status));
    Ok(())
}

fn connect_rpc(config: &config::Config) -> Result<RpcClient, ServiceError> {
    RpcClient::new(&config.rpc_url, config.program_id, config.rpc_timeout)
        .map_err(|e| ServiceError::RemoteFetch(e.to_string()))
}

// One-shot commands always connect the configured keypair.
fn load_wallet(config: &config::Config) -> Result<WalletSession, ServiceError> {
    WalletSession::load(config.wallet_keypair.as_deref(), true)
        .map_err(|e| ServiceError::WalletUnavailable(e.to_string()))
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => error!("Failed to render output: {}", e),
    }
}

// Reported on stderr only, not through tracing.
fn exit_on_error(result: Result<(), ServiceError>) {
    if let Err(e) = result {
        eprintln!("{}", failure_line(&e));
        std::process::exit(1);
    }
}

fn failure_line(e: &ServiceError) -> String {
    format!("error: {}", e)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_line_is_prefixed_once() {
        let line = failure_line(&ServiceError::Unauthenticated);
        assert!(line.starts_with("error: "));
        assert_eq!(line.matches("error: ").count(), 1);
    }

    #[test]
    fn cli_parses_jobs_command() {
        let cli = Cli::try_parse_from(["freelance-gateway", "jobs", "--client", "my", "--limit", "-1"]).unwrap();
        match cli.command {
            Some(Commands::Jobs { client, limit, .. }) => {
                assert_eq!(client, "my");
                assert_eq!(limit, Some(-1));
            }
            _ => panic!("expected jobs command"),
        }
    }
}
