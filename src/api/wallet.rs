use actix_web::{HttpResponse, get, post, web};
use serde::Serialize;

use crate::api::error::ServiceError;
use crate::chain::pubkey::{base58, Pubkey};
use crate::wallet::{IdentityProvider, WalletSession};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WalletResponse {
    connected: bool,
    #[serde(with = "base58::option")]
    identity: Option<Pubkey>,
    has_keypair: bool,
}

impl From<&WalletSession> for WalletResponse {
    fn from(session: &WalletSession) -> Self {
        Self {
            connected: session.is_connected(),
            identity: session.current_identity(),
            has_keypair: session.has_keypair(),
        }
    }
}

#[get("")]
async fn wallet_state(wallet: web::Data<WalletSession>) -> HttpResponse {
    HttpResponse::Ok().json(WalletResponse::from(wallet.get_ref()))
}

#[post("/connect")]
async fn connect(wallet: web::Data<WalletSession>) -> Result<HttpResponse, ServiceError> {
    wallet
        .connect()
        .map_err(|e| ServiceError::WalletUnavailable(e.to_string()))?;
    Ok(HttpResponse::Ok().json(WalletResponse::from(wallet.get_ref())))
}

#[post("/disconnect")]
async fn disconnect(wallet: web::Data<WalletSession>) -> HttpResponse {
    wallet.disconnect();
    HttpResponse::Ok().json(WalletResponse::from(wallet.get_ref()))
}

pub fn wallet_config(config: &mut web::ServiceConfig) {
    config.service(
        web::scope("wallet")
            .service(wallet_state)
            .service(connect)
            .service(disconnect),
    );
}
