use solana_sdk::signer::Signer;
use std::sync::Arc;
use tracing::{error, info, warn};
use validator::Validate;

use crate::api::error::ServiceError;
use crate::api::validation::describe_errors;
use crate::chain::accounts::{AccountSchema, UserProfile};
use crate::chain::instruction::{self, user_address};
use crate::chain::pubkey::Pubkey;
use crate::chain::store::RemoteAccountStore;
use crate::chain::transaction::{TransactionError, TransactionSubmitter};
use crate::wallet::Caller;

use super::models::{RegisterUserRequest, RegistrationResponse, RegistrationView};
use super::tracker::RegistrationTracker;

/// User service containing profile lookups and registration
pub struct UserService {
    store: Arc<dyn RemoteAccountStore>,
    submitter: Arc<dyn TransactionSubmitter>,
    tracker: Arc<RegistrationTracker>,
    program_id: Pubkey,
}

impl UserService {
    pub fn new(
        store: Arc<dyn RemoteAccountStore>,
        submitter: Arc<dyn TransactionSubmitter>,
        tracker: Arc<RegistrationTracker>,
        program_id: Pubkey,
    ) -> Self {
        Self {
            store,
            submitter,
            tracker,
            program_id,
        }
    }

    pub fn tracker(&self) -> &RegistrationTracker {
        &self.tracker
    }

    /// Create the connected wallet's profile account
    ///
    /// # Business Logic
    /// - Validates the request before touching the network
    /// - Signs and submits `register_user`
    /// - Re-runs the registration check once the transaction is confirmed
    pub async fn register_user(
        &self,
        caller: &Caller,
        request: &RegisterUserRequest,
    ) -> Result<RegistrationResponse, ServiceError> {
        request.validate().map_err(|errors| {
            let message = describe_errors(&errors);
            warn!("Service: Registration rejected: {}", message);
            ServiceError::ValidationError(message)
        })?;
        let signer = caller.signer().ok_or(ServiceError::Unauthenticated)?;

        info!("Service: Registering user '{}' for {}", request.name, signer.pubkey());

        let ix = instruction::register_user(
            &self.program_id,
            &signer.pubkey(),
            &request.name,
            request.is_client,
            request.is_freelancer,
        )
        .map_err(TransactionError::from)?;

        let signature = self.submitter.submit(ix, signer).await?;
        info!("Service: User registered with signature={}", signature);

        let registration = RegistrationView::from(self.tracker.refresh().await);

        Ok(RegistrationResponse {
            message: "User registered successfully".to_string(),
            signature,
            registration,
        })
    }

    /// Profile owned by `authority`, if one has been registered.
    pub async fn fetch_user_by_address(
        &self,
        caller: &Caller,
        authority: &Pubkey,
    ) -> Result<Option<UserProfile>, ServiceError> {
        caller.identity().ok_or(ServiceError::Unauthenticated)?;

        let address = user_address(&self.program_id, authority);

        let account = self
            .store
            .fetch_one(AccountSchema::User, &address)
            .await
            .map_err(|e| {
                error!("Service: Failed to fetch user profile {}: {}", address, e);
                ServiceError::RemoteFetch(e.to_string())
            })?;

        account
            .map(|account| UserProfile::decode(&account.data))
            .transpose()
            .map_err(|e| {
                error!("Service: Undecodable user profile {}: {}", address, e);
                ServiceError::RemoteFetch(e.to_string())
            })
    }
}
