use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::api::user::RegistrationTracker;
use crate::chain::pubkey::Pubkey;

/// Background worker that re-runs the registration check whenever the wallet
/// connects, disconnects or switches identity.
pub struct RegistrationWatcher {
    tracker: Arc<RegistrationTracker>,
}

impl RegistrationWatcher {
    pub fn new(tracker: Arc<RegistrationTracker>) -> Self {
        Self { tracker }
    }

    /// Run until shutdown is signalled or the wallet session is dropped.
    ///
    /// The current identity is checked once on start. Each check runs in its own
    /// task so a slow lookup never delays reacting to the next identity change;
    /// the tracker's request tokens decide which result is kept. Checks still in
    /// flight when the loop ends are aborted before `run` returns.
    pub async fn run(
        &self,
        mut identity_rx: watch::Receiver<Option<Pubkey>>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        info!("Registration watcher started");
        let mut checks = JoinSet::new();

        let initial = *identity_rx.borrow_and_update();
        self.spawn_check(&mut checks, initial);

        loop {
            tokio::select! {
                changed = identity_rx.changed() => {
                    if changed.is_err() {
                        info!("Wallet session closed, registration watcher stopping");
                        break;
                    }
                    let identity = *identity_rx.borrow_and_update();
                    debug!(?identity, "wallet identity changed");
                    self.spawn_check(&mut checks, identity);
                }
                Some(finished) = checks.join_next(), if !checks.is_empty() => {
                    if let Err(e) = finished {
                        warn!("Registration check task failed: {}", e);
                    }
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("Registration watcher received shutdown signal, stopping");
                        break;
                    }
                }
            }
        }

        if !checks.is_empty() {
            debug!(in_flight = checks.len(), "aborting registration checks");
        }
        checks.shutdown().await;
    }

    fn spawn_check(&self, checks: &mut JoinSet<()>, identity: Option<Pubkey>) {
        let tracker = self.tracker.clone();
        checks.spawn(async move {
            tracker.on_identity_changed(identity).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::user::tracker::{RegistrationState, RegistrationStatus};
    use crate::chain::accounts::fixtures::user;
    use crate::chain::accounts::AccountSchema;
    use crate::chain::instruction::user_address;
    use crate::chain::store::fake::FakeAccountStore;
    use crate::chain::store::{KeyedAccount, MemcmpConstraint, RemoteAccountStore, StoreError};
    use crate::wallet::fixtures::keypair;
    use crate::wallet::{IdentityProvider, WalletSession};
    use async_trait::async_trait;
    use solana_sdk::signer::Signer;
    use std::time::Duration;

    const PROGRAM: Pubkey = Pubkey::new_from_array([11u8; 32]);

    /// Store whose single-account lookups never complete.
    struct StalledStore;

    #[async_trait]
    impl RemoteAccountStore for StalledStore {
        async fn fetch_all(&self, _: AccountSchema, _: &[MemcmpConstraint]) -> Result<Vec<KeyedAccount>, StoreError> {
            Ok(Vec::new())
        }

        async fn fetch_one(&self, _: AccountSchema, _: &Pubkey) -> Result<Option<KeyedAccount>, StoreError> {
            std::future::pending().await
        }
    }

    async fn wait_for_state(updates: &mut watch::Receiver<RegistrationStatus>, state: RegistrationState) {
        tokio::time::timeout(Duration::from_secs(5), updates.wait_for(|status| status.state == state))
            .await
            .expect("state not reached in time")
            .expect("tracker dropped");
    }

    #[tokio::test]
    async fn follows_wallet_connection() {
        let identity = keypair(7).pubkey();
        let wallet = Arc::new(WalletSession::new(Some(keypair(7)), false));
        let store = Arc::new(FakeAccountStore::new());
        store.insert(user_address(&PROGRAM, &identity), user(identity).encode());

        let tracker = Arc::new(RegistrationTracker::new(wallet.clone(), store, PROGRAM));
        let mut updates = tracker.subscribe();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let watcher = RegistrationWatcher::new(tracker.clone());
        let identity_rx = wallet.subscribe();
        let handle = tokio::spawn(async move { watcher.run(identity_rx, shutdown_rx).await });

        wait_for_state(&mut updates, RegistrationState::NotConnected).await;

        wallet.connect().unwrap();
        wait_for_state(&mut updates, RegistrationState::Registered).await;

        wallet.disconnect();
        wait_for_state(&mut updates, RegistrationState::NotConnected).await;

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn shutdown_aborts_checks_in_flight() {
        let wallet = Arc::new(WalletSession::new(Some(keypair(7)), true));
        let tracker = Arc::new(RegistrationTracker::new(wallet.clone(), Arc::new(StalledStore), PROGRAM));
        let mut updates = tracker.subscribe();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let watcher = RegistrationWatcher::new(tracker.clone());
        let identity_rx = wallet.subscribe();
        let handle = tokio::spawn(async move { watcher.run(identity_rx, shutdown_rx).await });

        // the initial check is now parked inside the store
        wait_for_state(&mut updates, RegistrationState::Checking).await;

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("watcher did not stop")
            .unwrap();

        // neither the watcher nor any check task still holds the tracker
        assert_eq!(Arc::strong_count(&tracker), 1);
        assert_eq!(tracker.status().state, RegistrationState::Checking);
    }
}
