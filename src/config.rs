use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::chain::pubkey::Pubkey;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// JSON-RPC endpoint of the cluster
    /// Default: https://api.devnet.solana.com
    pub rpc_url: String,

    /// Address of the freelancing program
    pub program_id: Pubkey,

    /// Solana CLI keypair file (JSON array of 64 bytes)
    pub wallet_keypair: Option<PathBuf>,

    /// Connect the wallet on startup when a keypair is configured
    pub wallet_autoconnect: bool,

    pub bind_addr: String,
    pub port: u16,

    /// Maximum payload size for all requests (in bytes)
    /// Default: 1MB (1024 * 1024)
    pub max_payload_size: usize,

    /// Per-request HTTP timeout for RPC calls
    pub rpc_timeout: Duration,

    /// How long to wait for a sent transaction to be confirmed
    pub confirm_timeout: Duration,

    pub log_dir: String,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Required environment variables:
    /// - PROGRAM_ID: base58 address of the freelancing program
    ///
    /// Optional environment variables:
    /// - RPC_URL (default: https://api.devnet.solana.com)
    /// - WALLET_KEYPAIR: path to a keypair file (default: none, read-only mode)
    /// - WALLET_AUTOCONNECT (default: true)
    /// - BIND_ADDR (default: 127.0.0.1), PORT (default: 8080)
    /// - MAX_PAYLOAD_SIZE: Maximum request payload size in bytes (default: 1048576 = 1MB)
    /// - RPC_TIMEOUT_SECS (default: 30), CONFIRM_TIMEOUT_SECS (default: 60)
    /// - LOG_DIR (default: logs)
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if it exists
        dotenv::dotenv().ok();

        let program_id = env::var("PROGRAM_ID")
            .map_err(|_| "PROGRAM_ID must be set in .env file or environment".to_string())?
            .parse::<Pubkey>()
            .map_err(|e| format!("PROGRAM_ID is not a valid address: {}", e))?;

        let rpc_url = env::var("RPC_URL").unwrap_or_else(|_| "https://api.devnet.solana.com".to_string());

        let wallet_keypair = env::var("WALLET_KEYPAIR")
            .ok()
            .filter(|path| !path.is_empty())
            .map(PathBuf::from);

        Ok(Config {
            rpc_url,
            program_id,
            wallet_keypair,
            wallet_autoconnect: parse_or("WALLET_AUTOCONNECT", true),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_or("PORT", 8080),
            max_payload_size: parse_or("MAX_PAYLOAD_SIZE", 1024 * 1024), // Default: 1MB
            rpc_timeout: Duration::from_secs(parse_or("RPC_TIMEOUT_SECS", 30)),
            confirm_timeout: Duration::from_secs(parse_or("CONFIRM_TIMEOUT_SECS", 60)),
            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
        })
    }
}

/// Parse an optional variable, falling back to `default` when unset or unparseable.
fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
