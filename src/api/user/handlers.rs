use actix_web::{
    HttpResponse, get, post,
    web::{Data, Path, ServiceConfig, scope},
};
use actix_web_validator::Json;
use tracing::info;

use crate::api::error::ServiceError;
use crate::chain::pubkey::Pubkey;
use crate::wallet::{IdentityProvider, WalletSession};

use super::models::{RegisterUserRequest, RegistrationView};
use super::service::UserService;

/// Registration status of the connected wallet, as last observed
#[get("/me")]
async fn my_registration(service: Data<UserService>) -> HttpResponse {
    HttpResponse::Ok().json(RegistrationView::from(service.tracker().status()))
}

#[post("/me/refresh")]
async fn refresh_registration(service: Data<UserService>) -> HttpResponse {
    let status = service.tracker().refresh().await;
    HttpResponse::Ok().json(RegistrationView::from(status))
}

#[post("")]
async fn register_user(
    service: Data<UserService>,
    wallet: Data<WalletSession>,
    request: Json<RegisterUserRequest>,
) -> Result<HttpResponse, ServiceError> {
    info!("Handler: Registration requested for '{}'", request.name);
    let response = service.register_user(&wallet.caller(), &request).await?;
    Ok(HttpResponse::Created().json(response))
}

#[get("/{address}")]
async fn get_user(
    service: Data<UserService>,
    wallet: Data<WalletSession>,
    address: Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let authority = address
        .parse::<Pubkey>()
        .map_err(|e| ServiceError::InvalidCriteria(format!("user '{}': {}", address, e)))?;

    let profile = service
        .fetch_user_by_address(&wallet.caller(), &authority)
        .await?
        .ok_or(ServiceError::NotFound(authority))?;
    Ok(HttpResponse::Ok().json(profile))
}

pub fn user_config(config: &mut ServiceConfig) {
    config.service(
        scope("users")
            .service(my_registration)
            .service(refresh_registration)
            .service(register_user)
            .service(get_user),
    );
}
