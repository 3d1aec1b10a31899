use solana_sdk::signer::keypair::{read_keypair, Keypair};
use solana_sdk::signer::Signer;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

use crate::chain::pubkey::Pubkey;
use crate::chain::transaction::WalletSigner;

#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("failed to read keypair file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed keypair file: {0}")]
    Malformed(String),

    #[error("no keypair configured")]
    NoKeypair,
}

/// Identity of whoever drives an operation, plus its signing capability if any.
#[derive(Clone, Default)]
pub struct Caller {
    identity: Option<Pubkey>,
    signer: Option<Arc<WalletSigner>>,
}

impl Caller {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn read_only(identity: Pubkey) -> Self {
        Self {
            identity: Some(identity),
            signer: None,
        }
    }

    pub fn with_signer(signer: Arc<WalletSigner>) -> Self {
        Self {
            identity: Some(signer.pubkey()),
            signer: Some(signer),
        }
    }

    pub fn identity(&self) -> Option<Pubkey> {
        self.identity
    }

    pub fn signer(&self) -> Option<&WalletSigner> {
        self.signer.as_deref()
    }
}

/// Source of the connected wallet identity.
pub trait IdentityProvider: Send + Sync {
    fn current_identity(&self) -> Option<Pubkey>;

    fn is_connected(&self) -> bool {
        self.current_identity().is_some()
    }

    fn caller(&self) -> Caller;

    /// Fires on every connect and disconnect.
    fn subscribe(&self) -> watch::Receiver<Option<Pubkey>>;
}

/// Wallet backed by a local keypair that can be connected and disconnected at runtime.
pub struct WalletSession {
    keypair: Option<Arc<Keypair>>,
    connected: watch::Sender<Option<Pubkey>>,
}

impl WalletSession {
    pub fn new(keypair: Option<Keypair>, autoconnect: bool) -> Self {
        let keypair = keypair.map(Arc::new);
        let initial = keypair
            .as_ref()
            .filter(|_| autoconnect)
            .map(|key| key.pubkey());
        let (connected, _) = watch::channel(initial);

        Self { keypair, connected }
    }

    pub fn load(path: Option<&Path>, autoconnect: bool) -> Result<Self, WalletError> {
        let keypair = match path {
            Some(path) => {
                let contents = std::fs::read_to_string(path)?;
                let key = parse_keypair(&contents)?;
                info!(identity = %key.pubkey(), "wallet keypair loaded");
                Some(key)
            }
            None => None,
        };
        Ok(Self::new(keypair, autoconnect))
    }

    pub fn connect(&self) -> Result<Pubkey, WalletError> {
        let key = self.keypair.as_ref().ok_or(WalletError::NoKeypair)?;
        let identity = key.pubkey();
        self.connected.send_replace(Some(identity));
        info!(%identity, "wallet connected");
        Ok(identity)
    }

    pub fn disconnect(&self) {
        if self.connected.send_replace(None).is_some() {
            info!("wallet disconnected");
        }
    }

    pub fn has_keypair(&self) -> bool {
        self.keypair.is_some()
    }
}

impl IdentityProvider for WalletSession {
    fn current_identity(&self) -> Option<Pubkey> {
        *self.connected.borrow()
    }

    fn caller(&self) -> Caller {
        match (self.current_identity(), &self.keypair) {
            (Some(_), Some(key)) => Caller::with_signer(key.clone()),
            _ => Caller::anonymous(),
        }
    }

    fn subscribe(&self) -> watch::Receiver<Option<Pubkey>> {
        self.connected.subscribe()
    }
}

/// Solana CLI keypair file: JSON array of 64 bytes, secret key followed by public key.
pub fn parse_keypair(contents: &str) -> Result<Keypair, WalletError> {
    read_keypair(&mut contents.as_bytes()).map_err(|e| WalletError::Malformed(e.to_string()))
}
