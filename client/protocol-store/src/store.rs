//! Session and snapshot store

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use siaduan_chain_client::{ProtocolChain, WalletConnector};
use siaduan_common::constants::{network, timing};
use siaduan_common::{Address, ConnectionState, ProtocolSnapshot};

// ============ Configuration ============

/// Store settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// Chain id signing is allowed on
    pub expected_chain_id: u64,
    /// Period of the background refresh
    pub refresh_interval: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            expected_chain_id: network::CHAIN_ID,
            refresh_interval: Duration::from_secs(timing::REFRESH_INTERVAL_SECS),
        }
    }
}

/// Events pushed by the wallet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    /// The exposed account list changed (switch or lock)
    AccountsChanged(Vec<Address>),
    /// The wallet moved to another chain
    ChainChanged(u64),
    /// The wallet dropped the connection
    Disconnected,
}

// ============ Store ============

struct StoreInner<C> {
    config: StoreConfig,
    connection: RwLock<ConnectionState>,
    snapshot: RwLock<Arc<ProtocolSnapshot>>,
    client: RwLock<Option<Arc<C>>>,
    /// Bumped whenever the session is cleared; refreshes started under an
    /// older generation never write
    generation: AtomicU64,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl<C> Drop for StoreInner<C> {
    fn drop(&mut self) {
        if let Some(handle) = self.poller.get_mut().take() {
            handle.abort();
        }
    }
}

/// Wallet session plus the latest protocol snapshot
///
/// Cheap to clone; clones share the same session.
pub struct ProtocolStore<C> {
    inner: Arc<StoreInner<C>>,
}

impl<C> Clone for ProtocolStore<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<C: ProtocolChain> Default for ProtocolStore<C> {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl<C: ProtocolChain> ProtocolStore<C> {
    /// Disconnected store
    pub fn new(config: StoreConfig) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                config,
                connection: RwLock::new(ConnectionState::disconnected()),
                snapshot: RwLock::new(Arc::new(ProtocolSnapshot::default())),
                client: RwLock::new(None),
                generation: AtomicU64::new(0),
                poller: Mutex::new(None),
            }),
        }
    }

    // ============ Accessors ============

    pub fn config(&self) -> StoreConfig {
        self.inner.config
    }

    pub fn connection(&self) -> ConnectionState {
        self.inner.connection.read().clone()
    }

    pub fn snapshot(&self) -> Arc<ProtocolSnapshot> {
        self.inner.snapshot.read().clone()
    }

    /// Client bound to the current session
    pub fn client(&self) -> Option<Arc<C>> {
        self.inner.client.read().clone()
    }

    /// Returns true while the background refresh task is alive
    pub fn is_polling(&self) -> bool {
        self.inner
            .poller
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    // ============ Session ============

    /// Connect through `connector`
    ///
    /// Any previous session is cleared first. On failure the store stays
    /// disconnected and the error is logged, never returned. On success the
    /// snapshot is refreshed once and periodic refresh starts.
    pub async fn connect<W>(&self, connector: &W) -> ConnectionState
    where
        W: WalletConnector<Chain = C>,
    {
        self.clear_session();
        let generation = self.inner.generation.load(Ordering::SeqCst);

        let session = match connector.connect().await {
            Ok(session) => session,
            Err(e) => {
                warn!(code = e.code(), error = %e, "wallet connection failed");
                return ConnectionState::disconnected();
            }
        };

        let state = ConnectionState::connected(
            session.account,
            session.chain_id,
            session.client.signer(),
            self.inner.config.expected_chain_id,
        );
        {
            let mut connection = self.inner.connection.write();
            if self.inner.generation.load(Ordering::SeqCst) != generation {
                debug!("session cleared while connecting; dropping it");
                return connection.clone();
            }
            *self.inner.client.write() = Some(Arc::new(session.client));
            *connection = state.clone();
        }

        if state.is_wrong_network(self.inner.config.expected_chain_id) {
            warn!(
                chain_id = state.chain_id,
                expected = self.inner.config.expected_chain_id,
                "connected on the wrong network; transactions disabled"
            );
        } else {
            info!(account = %session.account, chain_id = state.chain_id, "session started");
        }

        self.refresh().await;
        self.start_polling(generation);
        state
    }

    /// Clear the session: connection, snapshot and polling
    pub fn disconnect(&self) {
        if self.clear_session() {
            info!("session cleared");
        }
    }

    /// React to a wallet-originated event; every kind ends the session
    pub fn handle_wallet_event(&self, event: WalletEvent) {
        match &event {
            WalletEvent::AccountsChanged(accounts) => {
                debug!(accounts = accounts.len(), "wallet accounts changed")
            }
            WalletEvent::ChainChanged(chain_id) => debug!(chain_id, "wallet chain changed"),
            WalletEvent::Disconnected => debug!("wallet disconnected"),
        }
        self.disconnect();
    }

    /// Returns true if a session was active
    fn clear_session(&self) -> bool {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = self.inner.poller.lock().take() {
            handle.abort();
        }
        let was_connected = {
            let mut connection = self.inner.connection.write();
            std::mem::take(&mut *connection).is_connected
        };
        *self.inner.client.write() = None;
        *self.inner.snapshot.write() = Arc::new(ProtocolSnapshot::default());
        was_connected
    }

    // ============ Refresh ============

    /// Re-read balance, vault state and rates concurrently
    ///
    /// Returns true if a new snapshot was stored. A failed read leaves the
    /// previous snapshot untouched; a refresh that outlives its session is
    /// discarded.
    pub async fn refresh(&self) -> bool {
        let generation = self.inner.generation.load(Ordering::SeqCst);
        let owner = self.inner.connection.read().wallet_address;
        let client = self.client();
        let (Some(client), Some(owner)) = (client, owner) else {
            trace!("refresh skipped: not connected");
            return false;
        };

        let reads = tokio::try_join!(
            client.read_balance(owner),
            client.read_vault_state(owner),
            client.read_rates(),
        );
        let (balance, position, rates) = match reads {
            Ok(reads) => reads,
            Err(e) => {
                warn!(code = e.code(), error = %e, "refresh failed; keeping previous snapshot");
                return false;
            }
        };

        let snapshot = ProtocolSnapshot::from_reads(balance, position, rates, unix_millis());
        let mut current = self.inner.snapshot.write();
        if self.inner.generation.load(Ordering::SeqCst) != generation {
            debug!("discarding refresh from a cleared session");
            return false;
        }
        *current = Arc::new(snapshot);
        trace!(balance, shares = position.shares, "snapshot replaced");
        true
    }

    fn start_polling(&self, generation: u64) {
        let inner = Arc::downgrade(&self.inner);
        let period = self.inner.config.refresh_interval;
        let handle = tokio::spawn(poll(inner, generation, period));

        let mut poller = self.inner.poller.lock();
        if self.inner.generation.load(Ordering::SeqCst) != generation {
            handle.abort();
            return;
        }
        if let Some(previous) = poller.replace(handle) {
            previous.abort();
        }
    }
}

/// Background refresh loop; ends when the session or the store goes away
async fn poll<C: ProtocolChain>(inner: Weak<StoreInner<C>>, generation: u64, period: Duration) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let Some(inner) = inner.upgrade() else { break };
        if inner.generation.load(Ordering::SeqCst) != generation {
            break;
        }
        ProtocolStore { inner }.refresh().await;
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
        .max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use siaduan_chain_client::mock::{MockChain, MockConnector, MockRead};
    use siaduan_common::{PoolAllocation, SiaduanError};
    use tokio::time::sleep;

    const USER: Address = Address([0x42; 20]);
    const EXPECTED: u64 = 11_155_111;

    fn store() -> ProtocolStore<MockChain> {
        ProtocolStore::new(StoreConfig {
            expected_chain_id: EXPECTED,
            refresh_interval: Duration::from_secs(10),
        })
    }

    fn funded_chain() -> MockChain {
        let chain = MockChain::new();
        chain.set_balance(USER, 1_000_000_000);
        chain.set_rates(300, 800);
        chain.seed_position(USER, PoolAllocation { pool_a: 60, pool_b: 30, idle: 10 });
        chain
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_refreshes_once_then_polls() {
        let chain = funded_chain();
        let connector = MockConnector::new(chain.clone(), USER, EXPECTED, EXPECTED);
        let store = store();

        let state = store.connect(&connector).await;
        assert!(state.can_sign());
        assert_eq!(chain.balance_reads(), 1);
        assert_eq!(store.snapshot().token_balance, 1_000_000_000);
        assert_eq!(store.snapshot().rates.rate_b, 800);
        assert!(store.is_polling());

        sleep(Duration::from_millis(10_500)).await;
        assert_eq!(chain.balance_reads(), 2);
        sleep(Duration::from_secs(10)).await;
        assert_eq!(chain.balance_reads(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_clears_and_stops_polling() {
        let chain = funded_chain();
        let connector = MockConnector::new(chain.clone(), USER, EXPECTED, EXPECTED);
        let store = store();
        store.connect(&connector).await;

        store.disconnect();
        assert_eq!(store.connection(), ConnectionState::disconnected());
        assert!(store.snapshot().is_empty());
        assert!(store.client().is_none());
        assert!(!store.is_polling());

        let reads = chain.balance_reads();
        sleep(Duration::from_secs(60)).await;
        assert_eq!(chain.balance_reads(), reads);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_read_keeps_previous_snapshot() {
        let chain = funded_chain();
        let connector = MockConnector::new(chain.clone(), USER, EXPECTED, EXPECTED);
        let store = store();
        store.connect(&connector).await;
        let before = store.snapshot();

        chain.set_balance(USER, 5);
        chain.fail_read(MockRead::Allocations);
        sleep(Duration::from_millis(10_500)).await;

        assert_eq!(chain.balance_reads(), 2);
        assert_eq!(store.snapshot(), before);

        chain.clear_read_failures();
        assert!(store.refresh().await);
        assert_eq!(store.snapshot().token_balance, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_outliving_session_is_discarded() {
        let chain = funded_chain();
        let connector = MockConnector::new(chain.clone(), USER, EXPECTED, EXPECTED);
        let store = store();
        store.connect(&connector).await;

        chain.set_read_delay(Some(Duration::from_secs(5)));
        let pending = tokio::spawn({
            let store = store.clone();
            async move { store.refresh().await }
        });
        sleep(Duration::from_secs(1)).await;
        store.disconnect();

        assert!(!pending.await.unwrap());
        assert!(store.snapshot().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wrong_network_connects_without_signer() {
        let chain = funded_chain();
        let connector = MockConnector::new(chain.clone(), USER, 1, EXPECTED);
        let store = store();

        let state = store.connect(&connector).await;
        assert!(state.is_connected);
        assert!(state.is_wrong_network(EXPECTED));
        assert_eq!(state.signing_account, None);
        assert_eq!(store.client().unwrap().signer(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_failure_stays_disconnected() {
        let chain = funded_chain();
        let connector = MockConnector::new(chain.clone(), USER, EXPECTED, EXPECTED);
        connector.fail_with(Some(SiaduanError::Rejected {
            reason: "User rejected the request.".into(),
        }));
        let store = store();

        let state = store.connect(&connector).await;
        assert_eq!(state, ConnectionState::disconnected());
        assert!(!store.is_polling());
        assert_eq!(chain.balance_reads(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wallet_events_end_session() {
        let chain = funded_chain();
        let connector = MockConnector::new(chain, USER, EXPECTED, EXPECTED);
        let store = store();

        for event in [
            WalletEvent::AccountsChanged(vec![]),
            WalletEvent::ChainChanged(1),
            WalletEvent::Disconnected,
        ] {
            store.connect(&connector).await;
            assert!(store.connection().is_connected);
            store.handle_wallet_event(event);
            assert!(!store.connection().is_connected);
            assert!(!store.is_polling());
        }
    }

    #[tokio::test]
    async fn test_refresh_while_disconnected_is_noop() {
        let store = store();
        assert!(!store.refresh().await);
        assert!(store.snapshot().is_empty());
    }
}
