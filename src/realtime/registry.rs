//! Registry of live subscriber connections.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use metrics::gauge;
use tokio::sync::mpsc;

use crate::domain::types::AccountId;
use stormo_api_types::RealtimeFrame;

const METRIC_LIVE_CONNECTIONS: &str = "stormo_live_connections";
const METRIC_LIVE_USERS: &str = "stormo_live_users";

struct Connection {
    conn_id: u64,
    tx: mpsc::UnboundedSender<RealtimeFrame>,
}

type ConnectionMap = DashMap<AccountId, Vec<Connection>>;

/// Result of delivering one frame to one recipient set entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryOutcome {
    /// Connections that accepted the frame.
    pub delivered: usize,
    /// Connections dropped because their channel was closed.
    pub pruned: usize,
}

/// Maps a user id to the set of sockets currently subscribed for that
/// user. A user may hold several concurrent connections (multiple tabs,
/// multiple devices); each one registers its own [`LiveHandle`].
///
/// All mutation happens through this type under the map's per-key entry
/// lock. The fan-out engine never touches the registry directly; it
/// publishes events and the relay worker calls [`Self::deliver_to`] on
/// its behalf.
#[derive(Clone, Default)]
pub struct LiveRegistry {
    connections: Arc<ConnectionMap>,
    next_conn_id: Arc<AtomicU64>,
}

impl LiveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection for `account`. The returned receiver yields
    /// the frames addressed to this connection; dropping the handle
    /// deregisters it.
    pub fn subscribe(
        &self,
        account: AccountId,
    ) -> (LiveHandle, mpsc::UnboundedReceiver<RealtimeFrame>) {
        let conn_id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();

        self.connections
            .entry(account)
            .or_default()
            .push(Connection { conn_id, tx });
        refresh_gauges(&self.connections);

        let handle = LiveHandle {
            account,
            conn_id,
            connections: Arc::clone(&self.connections),
        };
        (handle, rx)
    }

    /// Push a frame to every connection `account` holds. Connections
    /// whose receiving task has gone away are pruned in the same pass;
    /// one dead socket never affects the others.
    pub fn deliver_to(&self, account: AccountId, frame: &RealtimeFrame) -> DeliveryOutcome {
        let outcome = {
            let Entry::Occupied(mut occupied) = self.connections.entry(account) else {
                return DeliveryOutcome::default();
            };
            let conns = occupied.get_mut();
            let before = conns.len();
            conns.retain(|conn| conn.tx.send(frame.clone()).is_ok());
            let delivered = conns.len();
            if conns.is_empty() {
                occupied.remove();
            }
            DeliveryOutcome {
                delivered,
                pruned: before - delivered,
            }
        };
        if outcome.pruned > 0 {
            refresh_gauges(&self.connections);
        }
        outcome
    }

    /// Push a frame to every live connection regardless of user.
    /// Deletions use this: the original fan-out scope cannot be cheaply
    /// recomputed at delete time, so everyone hears about it.
    pub fn deliver_all(&self, frame: &RealtimeFrame) -> DeliveryOutcome {
        let accounts: Vec<AccountId> = self.connections.iter().map(|entry| *entry.key()).collect();
        let mut total = DeliveryOutcome::default();
        for account in accounts {
            let outcome = self.deliver_to(account, frame);
            total.delivered += outcome.delivered;
            total.pruned += outcome.pruned;
        }
        total
    }

    /// Number of live connections across all users.
    pub fn connection_count(&self) -> usize {
        self.connections.iter().map(|entry| entry.value().len()).sum()
    }

    /// Number of distinct users with at least one live connection.
    pub fn user_count(&self) -> usize {
        self.connections.len()
    }
}

/// One registered subscriber connection. Dropping it removes the
/// connection from the registry, clearing the user's slot entirely when
/// this was their last connection.
pub struct LiveHandle {
    account: AccountId,
    conn_id: u64,
    connections: Arc<ConnectionMap>,
}

impl LiveHandle {
    pub fn account(&self) -> AccountId {
        self.account
    }
}

impl Drop for LiveHandle {
    fn drop(&mut self) {
        {
            if let Entry::Occupied(mut occupied) = self.connections.entry(self.account) {
                occupied
                    .get_mut()
                    .retain(|conn| conn.conn_id != self.conn_id);
                if occupied.get().is_empty() {
                    occupied.remove();
                }
            }
        }
        refresh_gauges(&self.connections);
    }
}

fn refresh_gauges(connections: &ConnectionMap) {
    let users = connections.len();
    let conns: usize = connections.iter().map(|entry| entry.value().len()).sum();
    gauge!(METRIC_LIVE_USERS).set(users as f64);
    gauge!(METRIC_LIVE_CONNECTIONS).set(conns as f64);
}
