use async_trait::async_trait;
use serde::Serialize;

use super::accounts::AccountSchema;
use super::pubkey::Pubkey;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("rpc transport error: {0}")]
    Transport(String),

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("malformed rpc response: {0}")]
    Malformed(String),
}

/// Byte-equality predicate evaluated by the remote store: the account's data
/// at `offset` must equal the decoded `bytes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemcmpConstraint {
    pub offset: usize,
    /// base58-encoded expected bytes
    pub bytes: String,
}

impl MemcmpConstraint {
    pub fn identity(offset: usize, key: &Pubkey) -> Self {
        Self {
            offset,
            bytes: key.to_string(),
        }
    }

    pub fn raw(offset: usize, bytes: &[u8]) -> Self {
        Self {
            offset,
            bytes: bs58::encode(bytes).into_string(),
        }
    }

    /// Local evaluation, used where the store has no native filtering.
    #[cfg(test)]
    pub fn matches(&self, data: &[u8]) -> bool {
        let Ok(expected) = bs58::decode(&self.bytes).into_vec() else {
            return false;
        };
        data.get(self.offset..self.offset + expected.len())
            .is_some_and(|window| window == expected.as_slice())
    }
}

/// Raw account data together with its address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyedAccount {
    pub address: Pubkey,
    pub data: Vec<u8>,
}

/// Read access to the program's accounts.
#[async_trait]
pub trait RemoteAccountStore: Send + Sync {
    /// All accounts of `schema` satisfying every constraint. An empty
    /// constraint list fetches every account of the schema.
    async fn fetch_all(
        &self,
        schema: AccountSchema,
        constraints: &[MemcmpConstraint],
    ) -> Result<Vec<KeyedAccount>, StoreError>;

    /// The account at `address`, or `None` when it does not exist or is not
    /// an account of `schema`.
    async fn fetch_one(
        &self,
        schema: AccountSchema,
        address: &Pubkey,
    ) -> Result<Option<KeyedAccount>, StoreError>;
}
