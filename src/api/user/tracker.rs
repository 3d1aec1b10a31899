use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::chain::accounts::{AccountSchema, UserProfile};
use crate::chain::instruction::user_address;
use crate::chain::pubkey::{base58, Pubkey};
use crate::chain::store::RemoteAccountStore;
use crate::wallet::IdentityProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RegistrationState {
    Unknown,
    NotConnected,
    Checking,
    Registered,
    Unregistered,
}

/// Snapshot of the registration check for the connected identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationStatus {
    pub state: RegistrationState,
    #[serde(with = "base58::option")]
    pub identity: Option<Pubkey>,
    pub profile: Option<UserProfile>,
    /// Set when the last check failed. The state is still `Unregistered`.
    pub last_error: Option<String>,
    pub checked_at: Option<DateTime<Utc>>,
}

impl RegistrationStatus {
    fn new(state: RegistrationState, identity: Option<Pubkey>) -> Self {
        Self {
            state,
            identity,
            profile: None,
            last_error: None,
            checked_at: None,
        }
    }

    fn completed(identity: Pubkey, profile: Option<UserProfile>, last_error: Option<String>) -> Self {
        let state = if profile.is_some() {
            RegistrationState::Registered
        } else {
            RegistrationState::Unregistered
        };
        Self {
            state,
            identity: Some(identity),
            profile,
            last_error,
            checked_at: Some(Utc::now()),
        }
    }

    /// `Unregistered` only because the lookup failed.
    pub fn is_indeterminate(&self) -> bool {
        self.state == RegistrationState::Unregistered && self.last_error.is_some()
    }
}

/// Tracks whether the connected identity has a user profile account.
///
/// Every check draws a token from a monotonic counter. A finished check only
/// publishes its outcome if no newer check has been issued since, so the last
/// issued check always wins regardless of completion order.
pub struct RegistrationTracker {
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn RemoteAccountStore>,
    program_id: Pubkey,
    latest: AtomicU64,
    status: watch::Sender<RegistrationStatus>,
}

impl RegistrationTracker {
    pub fn new(identity: Arc<dyn IdentityProvider>, store: Arc<dyn RemoteAccountStore>, program_id: Pubkey) -> Self {
        let (status, _) = watch::channel(RegistrationStatus::new(RegistrationState::Unknown, None));
        Self {
            identity,
            store,
            program_id,
            latest: AtomicU64::new(0),
            status,
        }
    }

    pub fn status(&self) -> RegistrationStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RegistrationStatus> {
        self.status.subscribe()
    }

    /// Re-check the provider's current identity regardless of the current state.
    pub async fn refresh(&self) -> RegistrationStatus {
        let identity = self.identity.current_identity();
        self.check(identity).await
    }

    pub async fn on_identity_changed(&self, identity: Option<Pubkey>) -> RegistrationStatus {
        self.check(identity).await
    }

    async fn check(&self, identity: Option<Pubkey>) -> RegistrationStatus {
        let token = self.latest.fetch_add(1, Ordering::SeqCst) + 1;

        let Some(identity) = identity else {
            self.apply(token, RegistrationStatus::new(RegistrationState::NotConnected, None));
            return self.status();
        };

        self.apply(token, RegistrationStatus::new(RegistrationState::Checking, Some(identity)));
        debug!(token, %identity, "registration check started");

        let outcome = match self.lookup(&identity).await {
            Ok(profile) => RegistrationStatus::completed(identity, profile, None),
            Err(message) => {
                warn!(token, %identity, error = %message, "registration check failed, treating as unregistered");
                RegistrationStatus::completed(identity, None, Some(message))
            }
        };

        if self.apply(token, outcome.clone()) {
            info!(token, %identity, state = ?outcome.state, "registration check finished");
        }
        self.status()
    }

    async fn lookup(&self, identity: &Pubkey) -> Result<Option<UserProfile>, String> {
        let address = user_address(&self.program_id, identity);

        match self.store.fetch_one(AccountSchema::User, &address).await {
            Ok(Some(account)) => UserProfile::decode(&account.data).map(Some).map_err(|e| e.to_string()),
            Ok(None) => Ok(None),
            Err(e) => Err(e.to_string()),
        }
    }

    /// Publish `next` if `token` is still the latest issued. The comparison runs under the
    /// channel's write lock, so it cannot interleave with another publish.
    fn apply(&self, token: u64, next: RegistrationStatus) -> bool {
        self.status.send_if_modified(|current| {
            let latest = self.latest.load(Ordering::SeqCst);
            if latest != token {
                debug!(token, latest, "discarding stale registration result");
                return false;
            }
            *current = next;
            true
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::accounts::fixtures::user;
    use crate::chain::store::fake::FakeAccountStore;
    use crate::chain::store::{KeyedAccount, MemcmpConstraint, StoreError};
    use crate::wallet::fixtures::keypair;
    use crate::wallet::WalletSession;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    const PROGRAM: Pubkey = Pubkey::new_from_array([11u8; 32]);

    type Reply = Result<Option<KeyedAccount>, StoreError>;

    /// Store whose lookups block until the test releases them.
    #[derive(Default)]
    struct GatedStore {
        pending: Mutex<Vec<oneshot::Sender<Reply>>>,
    }

    impl GatedStore {
        fn pending(&self) -> usize {
            self.pending.lock().unwrap().len()
        }

        fn release(&self, index: usize, reply: Reply) {
            let gate = self.pending.lock().unwrap().remove(index);
            gate.send(reply).ok();
        }

        async fn wait_for(&self, count: usize) {
            while self.pending() < count {
                tokio::task::yield_now().await;
            }
        }
    }

    #[async_trait]
    impl RemoteAccountStore for GatedStore {
        async fn fetch_all(&self, _: AccountSchema, _: &[MemcmpConstraint]) -> Result<Vec<KeyedAccount>, StoreError> {
            Ok(Vec::new())
        }

        async fn fetch_one(&self, _: AccountSchema, _: &Pubkey) -> Reply {
            let (tx, rx) = oneshot::channel();
            self.pending.lock().unwrap().push(tx);
            rx.await.unwrap_or_else(|_| Err(StoreError::Transport("gate dropped".to_string())))
        }
    }

    fn wallet(connected: bool) -> Arc<WalletSession> {
        Arc::new(WalletSession::new(Some(keypair(7)), connected))
    }

    fn profile_account(identity: Pubkey) -> KeyedAccount {
        KeyedAccount {
            address: user_address(&PROGRAM, &identity),
            data: user(identity).encode(),
        }
    }

    #[tokio::test]
    async fn starts_unknown() {
        let tracker = RegistrationTracker::new(wallet(true), Arc::new(FakeAccountStore::new()), PROGRAM);
        assert_eq!(tracker.status().state, RegistrationState::Unknown);
    }

    #[tokio::test]
    async fn registered_when_profile_exists() {
        let wallet = wallet(true);
        let identity = wallet.current_identity().unwrap();
        let store = Arc::new(FakeAccountStore::new());
        let account = profile_account(identity);
        store.insert(account.address, account.data);

        let tracker = RegistrationTracker::new(wallet, store, PROGRAM);
        let status = tracker.refresh().await;

        assert_eq!(status.state, RegistrationState::Registered);
        assert_eq!(status.profile.unwrap().name, "ada");
        assert!(status.checked_at.is_some());
    }

    #[tokio::test]
    async fn unregistered_when_profile_absent() {
        let tracker = RegistrationTracker::new(wallet(true), Arc::new(FakeAccountStore::new()), PROGRAM);
        let status = tracker.refresh().await;

        assert_eq!(status.state, RegistrationState::Unregistered);
        assert!(!status.is_indeterminate());
    }

    #[tokio::test]
    async fn fetch_error_is_unregistered_but_indeterminate() {
        let store = Arc::new(FakeAccountStore::new());
        store.fail_with("connection reset");
        let tracker = RegistrationTracker::new(wallet(true), store, PROGRAM);

        let status = tracker.refresh().await;

        assert_eq!(status.state, RegistrationState::Unregistered);
        assert!(status.is_indeterminate());
        assert!(status.last_error.unwrap().contains("connection reset"));
    }

    #[tokio::test]
    async fn disconnect_moves_to_not_connected_without_fetching() {
        let store = Arc::new(FakeAccountStore::new());
        let tracker = RegistrationTracker::new(wallet(false), store.clone(), PROGRAM);

        let status = tracker.refresh().await;

        assert_eq!(status.state, RegistrationState::NotConnected);
        assert_eq!(status.identity, None);
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn later_refresh_wins_over_slower_earlier_one() {
        let wallet = wallet(true);
        let identity = wallet.current_identity().unwrap();
        let store = Arc::new(GatedStore::default());
        let tracker = Arc::new(RegistrationTracker::new(wallet, store.clone(), PROGRAM));

        let first = tokio::spawn({
            let tracker = tracker.clone();
            async move { tracker.refresh().await }
        });
        store.wait_for(1).await;

        let second = tokio::spawn({
            let tracker = tracker.clone();
            async move { tracker.refresh().await }
        });
        store.wait_for(2).await;
        assert_eq!(tracker.status().state, RegistrationState::Checking);

        // second-issued check resolves first: no profile
        store.release(1, Ok(None));
        second.await.unwrap();
        assert_eq!(tracker.status().state, RegistrationState::Unregistered);

        // first-issued check resolves last with a profile and must be ignored
        store.release(0, Ok(Some(profile_account(identity))));
        first.await.unwrap();

        let status = tracker.status();
        assert_eq!(status.state, RegistrationState::Unregistered);
        assert_eq!(status.profile, None);
    }

    #[tokio::test]
    async fn disconnect_during_check_discards_its_result() {
        let wallet = wallet(true);
        let identity = wallet.current_identity().unwrap();
        let store = Arc::new(GatedStore::default());
        let tracker = Arc::new(RegistrationTracker::new(wallet, store.clone(), PROGRAM));

        let check = tokio::spawn({
            let tracker = tracker.clone();
            async move { tracker.on_identity_changed(Some(identity)).await }
        });
        store.wait_for(1).await;

        tracker.on_identity_changed(None).await;
        store.release(0, Ok(Some(profile_account(identity))));
        check.await.unwrap();

        assert_eq!(tracker.status().state, RegistrationState::NotConnected);
    }

    #[tokio::test]
    async fn subscribers_observe_checking_then_result() {
        let tracker = RegistrationTracker::new(wallet(true), Arc::new(FakeAccountStore::new()), PROGRAM);
        let mut updates = tracker.subscribe();

        tracker.refresh().await;

        assert!(updates.has_changed().unwrap());
        assert_eq!(updates.borrow_and_update().state, RegistrationState::Unregistered);
    }

    #[tokio::test]
    async fn status_renders_identity_as_base58() {
        let wallet = wallet(true);
        let identity = wallet.current_identity().unwrap();
        let tracker = RegistrationTracker::new(wallet, Arc::new(FakeAccountStore::new()), PROGRAM);

        let value = serde_json::to_value(tracker.refresh().await).unwrap();
        assert_eq!(value["identity"], serde_json::json!(identity.to_string()));
        assert_eq!(value["state"], "unregistered");
    }
}
