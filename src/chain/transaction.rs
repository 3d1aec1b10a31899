use async_trait::async_trait;
use solana_sdk::hash::Hash;
use solana_sdk::instruction::Instruction;
use solana_sdk::message::Message;
use solana_sdk::signer::{Signer, SignerError};
use solana_sdk::transaction::Transaction;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use super::rpc::RpcClient;
use super::store::StoreError;

/// Signing capability that can be shared across request handlers.
pub type WalletSigner = dyn Signer + Send + Sync;

#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    #[error(transparent)]
    Rpc(#[from] StoreError),

    #[error("failed to encode transaction: {0}")]
    Encoding(String),

    #[error("failed to sign transaction: {0}")]
    Signing(#[from] SignerError),

    #[error("transaction {signature} failed: {reason}")]
    Failed { signature: String, reason: String },

    #[error("transaction {signature} not confirmed within {timeout:?}")]
    Timeout { signature: String, timeout: Duration },
}

impl From<std::io::Error> for TransactionError {
    fn from(e: std::io::Error) -> Self {
        TransactionError::Encoding(e.to_string())
    }
}

/// Sends a signed state change and waits until the cluster confirms it.
#[async_trait]
pub trait TransactionSubmitter: Send + Sync {
    /// Returns the base58 transaction signature once confirmed.
    async fn submit(&self, instruction: Instruction, signer: &WalletSigner) -> Result<String, TransactionError>;
}

pub struct RpcTransactionSubmitter {
    rpc: Arc<RpcClient>,
    confirm_timeout: Duration,
    poll_interval: Duration,
}

impl RpcTransactionSubmitter {
    pub fn new(rpc: Arc<RpcClient>, confirm_timeout: Duration) -> Self {
        Self {
            rpc,
            confirm_timeout,
            poll_interval: Duration::from_millis(500),
        }
    }

    async fn await_confirmation(&self, signature: &str) -> Result<(), TransactionError> {
        let deadline = Instant::now() + self.confirm_timeout;

        loop {
            match self.rpc.get_signature_status(signature).await? {
                Some(status) if status.err.is_some() => {
                    let reason = status.err.map(|e| e.to_string()).unwrap_or_default();
                    warn!(signature, %reason, "transaction failed on chain");
                    return Err(TransactionError::Failed {
                        signature: signature.to_string(),
                        reason,
                    });
                }
                Some(status) if status.is_confirmed() => return Ok(()),
                _ => debug!(signature, "waiting for confirmation"),
            }

            if Instant::now() >= deadline {
                return Err(TransactionError::Timeout {
                    signature: signature.to_string(),
                    timeout: self.confirm_timeout,
                });
            }
            sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl TransactionSubmitter for RpcTransactionSubmitter {
    async fn submit(&self, instruction: Instruction, signer: &WalletSigner) -> Result<String, TransactionError> {
        let program_id = instruction.program_id;
        let blockhash = self.rpc.get_latest_blockhash().await?;
        let transaction = sign_transaction(instruction, signer, blockhash)?;
        let wire = bincode::serialize(&transaction).map_err(|e| TransactionError::Encoding(e.to_string()))?;

        let signature = self.rpc.send_transaction(&wire).await?;
        info!(%signature, program = %program_id, "transaction sent");

        self.await_confirmation(&signature).await?;
        info!(%signature, "transaction confirmed");
        Ok(signature)
    }
}

/// Single-instruction transaction with the wallet as fee payer and only signer.
pub fn sign_transaction(
    instruction: Instruction,
    signer: &WalletSigner,
    blockhash: Hash,
) -> Result<Transaction, TransactionError> {
    let payer = signer.pubkey();
    let message = Message::new(&[instruction], Some(&payer));
    let mut transaction = Transaction::new_unsigned(message);

    let signers: [&dyn Signer; 1] = [signer];
    transaction.try_sign(&signers[..], blockhash)?;
    Ok(transaction)
}
