use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use solana_sdk::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

use super::accounts::AccountSchema;
use super::pubkey::Pubkey;
use super::store::{KeyedAccount, MemcmpConstraint, RemoteAccountStore, StoreError};

const COMMITMENT: &str = "confirmed";

#[derive(Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Deserialize)]
struct RpcKeyedAccount {
    pubkey: String,
    account: RpcAccount,
}

#[derive(Deserialize)]
struct RpcAccount {
    /// `[payload, encoding]`
    data: (String, String),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcBlockhash {
    blockhash: String,
}

/// Status of a sent transaction as reported by `getSignatureStatuses`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureStatus {
    pub err: Option<Value>,
    pub confirmation_status: Option<String>,
}

impl SignatureStatus {
    pub fn is_confirmed(&self) -> bool {
        matches!(self.confirmation_status.as_deref(), Some("confirmed") | Some("finalized"))
    }
}

/// JSON-RPC client for the cluster hosting the freelancing program.
pub struct RpcClient {
    http: reqwest::Client,
    url: String,
    program_id: Pubkey,
    next_id: AtomicU64,
}

impl RpcClient {
    pub fn new(url: &str, program_id: Pubkey, timeout: Duration) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            url: url.to_string(),
            program_id,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, StoreError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(method, id, "rpc request");

        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let response: Value = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?
            .error_for_status()
            .map_err(|e| StoreError::Transport(e.to_string()))?
            .json()
            .await
            .map_err(|e| StoreError::Malformed(e.to_string()))?;

        unwrap_response(response)
    }

    pub async fn get_health(&self) -> Result<(), StoreError> {
        let _: String = self.call("getHealth", json!([])).await?;
        Ok(())
    }

    pub async fn get_latest_blockhash(&self) -> Result<Hash, StoreError> {
        let response: WithContext<RpcBlockhash> = self
            .call("getLatestBlockhash", json!([{ "commitment": COMMITMENT }]))
            .await?;
        response
            .value
            .blockhash
            .parse::<Hash>()
            .map_err(|e| StoreError::Malformed(format!("blockhash: {}", e)))
    }

    /// Submit a signed wire transaction, returning its base58 signature.
    pub async fn send_transaction(&self, wire: &[u8]) -> Result<String, StoreError> {
        self.call(
            "sendTransaction",
            json!([
                BASE64.encode(wire),
                { "encoding": "base64", "preflightCommitment": COMMITMENT }
            ]),
        )
        .await
    }

    pub async fn get_signature_status(&self, signature: &str) -> Result<Option<SignatureStatus>, StoreError> {
        let response: WithContext<Vec<Option<SignatureStatus>>> = self
            .call("getSignatureStatuses", json!([[signature]]))
            .await?;
        Ok(response.value.into_iter().next().flatten())
    }
}

#[async_trait]
impl RemoteAccountStore for RpcClient {
    async fn fetch_all(
        &self,
        schema: AccountSchema,
        constraints: &[MemcmpConstraint],
    ) -> Result<Vec<KeyedAccount>, StoreError> {
        let params = json!([
            self.program_id.to_string(),
            {
                "commitment": COMMITMENT,
                "encoding": "base64",
                "filters": memcmp_filters(schema, constraints),
            }
        ]);

        let accounts: Vec<RpcKeyedAccount> = self.call("getProgramAccounts", params).await?;
        debug!(schema = schema.name(), count = accounts.len(), "fetched program accounts");

        accounts.into_iter().map(into_keyed_account).collect()
    }

    async fn fetch_one(
        &self,
        schema: AccountSchema,
        address: &Pubkey,
    ) -> Result<Option<KeyedAccount>, StoreError> {
        let response: WithContext<Option<RpcAccount>> = self
            .call(
                "getAccountInfo",
                json!([address.to_string(), { "commitment": COMMITMENT, "encoding": "base64" }]),
            )
            .await?;

        let Some(account) = response.value else {
            return Ok(None);
        };

        let data = decode_data(account)?;
        if !schema.matches(&data) {
            debug!(%address, schema = schema.name(), "account exists but is not of the requested schema");
            return Ok(None);
        }

        Ok(Some(KeyedAccount {
            address: *address,
            data,
        }))
    }
}

/// Schema discriminator first, then the caller's constraints.
fn memcmp_filters(schema: AccountSchema, constraints: &[MemcmpConstraint]) -> Vec<Value> {
    let discriminator = MemcmpConstraint::raw(0, &schema.discriminator());

    std::iter::once(&discriminator)
        .chain(constraints)
        .map(|c| json!({ "memcmp": c }))
        .collect()
}

fn unwrap_response<T: DeserializeOwned>(response: Value) -> Result<T, StoreError> {
    let envelope: RpcResponse<T> =
        serde_json::from_value(response).map_err(|e| StoreError::Malformed(e.to_string()))?;

    if let Some(error) = envelope.error {
        return Err(StoreError::Rpc {
            code: error.code,
            message: error.message,
        });
    }

    envelope
        .result
        .ok_or_else(|| StoreError::Malformed("response has neither result nor error".to_string()))
}

fn decode_data(account: RpcAccount) -> Result<Vec<u8>, StoreError> {
    let (payload, encoding) = account.data;
    if encoding != "base64" {
        return Err(StoreError::Malformed(format!("unexpected account encoding {}", encoding)));
    }
    BASE64
        .decode(payload)
        .map_err(|e| StoreError::Malformed(format!("account data: {}", e)))
}

fn into_keyed_account(raw: RpcKeyedAccount) -> Result<KeyedAccount, StoreError> {
    let address = raw
        .pubkey
        .parse::<Pubkey>()
        .map_err(|e| StoreError::Malformed(format!("account address: {}", e)))?;

    Ok(KeyedAccount {
        address,
        data: decode_data(raw.account)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_lead_with_schema_discriminator() {
        let client = Pubkey::new_from_array([1u8; 32]);
        let filters = memcmp_filters(AccountSchema::Job, &[MemcmpConstraint::identity(8, &client)]);

        assert_eq!(filters.len(), 2);
        assert_eq!(filters[0]["memcmp"]["offset"], 0);
        assert_eq!(
            filters[0]["memcmp"]["bytes"],
            bs58::encode(AccountSchema::Job.discriminator()).into_string()
        );
        assert_eq!(filters[1], json!({ "memcmp": { "offset": 8, "bytes": client.to_string() } }));
    }

    #[test]
    fn rpc_error_is_surfaced() {
        let response = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": { "code": -32602, "message": "Invalid params" }
        });
        let err = unwrap_response::<Value>(response).unwrap_err();
        assert!(matches!(err, StoreError::Rpc { code: -32602, .. }));
    }

    #[test]
    fn empty_envelope_is_malformed() {
        let err = unwrap_response::<Value>(json!({ "jsonrpc": "2.0", "id": 1 })).unwrap_err();
        assert!(matches!(err, StoreError::Malformed(_)));
    }

    #[test]
    fn program_accounts_decode_into_keyed_accounts() {
        let address = Pubkey::new_from_array([3u8; 32]);
        let response = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": [{
                "pubkey": address.to_string(),
                "account": {
                    "data": [BASE64.encode([1u8, 2, 3]), "base64"],
                    "executable": false,
                    "lamports": 1000,
                    "owner": "11111111111111111111111111111111"
                }
            }]
        });

        let raw: Vec<RpcKeyedAccount> = unwrap_response(response).unwrap();
        let accounts: Vec<KeyedAccount> = raw.into_iter().map(into_keyed_account).collect::<Result<_, _>>().unwrap();
        assert_eq!(accounts, vec![KeyedAccount { address, data: vec![1, 2, 3] }]);
    }

    #[test]
    fn non_base64_encoding_is_rejected() {
        let account = RpcAccount {
            data: ("abc".to_string(), "base58".to_string()),
        };
        assert!(matches!(decode_data(account), Err(StoreError::Malformed(_))));
    }

    #[test]
    fn signature_status_confirmation_levels() {
        let status: SignatureStatus =
            serde_json::from_value(json!({ "err": null, "confirmationStatus": "processed" })).unwrap();
        assert!(!status.is_confirmed());

        let status: SignatureStatus =
            serde_json::from_value(json!({ "err": null, "confirmationStatus": "finalized" })).unwrap();
        assert!(status.is_confirmed());
    }
}
