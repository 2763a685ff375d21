//! Fixed-size connection pool.
//!
//! The pool owns a fixed set of connections created at startup. Callers lease
//! one with [`ConnectionPool::acquire`] and hand it back with
//! [`ConnectionPool::release`]:
//! - Waiting for a free slot is bounded by the acquire timeout
//! - A slot is never leased to two callers at once
//! - Releasing a lease that is not currently out is rejected
//! - `close()` waits for outstanding leases, then closes every connection

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, trace, warn};
use tokio::sync::Semaphore;

use crate::config::POOL_CLOSE_TIMEOUT;
use crate::error_handling::{PoolError, PoolMisuseError};
use crate::storage::connection::BatchConnection;

enum SlotState<C> {
    Free(C),
    Leased { lease_id: u64 },
    Closed,
}

struct Slots<C> {
    states: Vec<SlotState<C>>,
    /// Set by `close()` once it has collected the free connections; leases
    /// returned afterwards are closed instead of being put back.
    shut_down: bool,
}

/// A leased connection. Must be handed back with [`ConnectionPool::release`].
pub struct Lease<C> {
    slot: usize,
    lease_id: u64,
    conn: C,
}

impl<C> Lease<C> {
    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn id(&self) -> u64 {
        self.lease_id
    }
}

impl<C> Deref for Lease<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.conn
    }
}

impl<C> DerefMut for Lease<C> {
    fn deref_mut(&mut self) -> &mut C {
        &mut self.conn
    }
}

/// Fixed-capacity pool of storage connections.
///
/// The semaphore holds one permit per free slot, so waiting callers are woken
/// in FIFO order as leases come back.
pub struct ConnectionPool<C: BatchConnection> {
    slots: Mutex<Slots<C>>,
    available: Semaphore,
    capacity: usize,
    acquire_timeout: Duration,
    close_timeout: Duration,
    closed: AtomicBool,
    next_lease_id: AtomicU64,
    leased: AtomicUsize,
}

impl<C: BatchConnection> ConnectionPool<C> {
    /// Creates a pool over already-open connections.
    ///
    /// The capacity is the number of connections and never changes.
    pub fn new(connections: Vec<C>, acquire_timeout: Duration) -> Self {
        let capacity = connections.len();
        debug!("Connection pool created with {} slot(s)", capacity);
        ConnectionPool {
            slots: Mutex::new(Slots {
                states: connections.into_iter().map(SlotState::Free).collect(),
                shut_down: false,
            }),
            available: Semaphore::new(capacity),
            capacity,
            acquire_timeout,
            close_timeout: POOL_CLOSE_TIMEOUT,
            closed: AtomicBool::new(false),
            next_lease_id: AtomicU64::new(1),
            leased: AtomicUsize::new(0),
        }
    }

    /// Overrides how long `close()` waits for outstanding leases.
    pub fn with_close_timeout(mut self, close_timeout: Duration) -> Self {
        self.close_timeout = close_timeout;
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of connections currently leased out.
    pub fn leased(&self) -> usize {
        self.leased.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn lock_slots(&self) -> MutexGuard<'_, Slots<C>> {
        // Slot bookkeeping is updated in single assignments, so the state is
        // consistent even if a holder panicked.
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Leases a connection, waiting up to the acquire timeout for one to free up.
    ///
    /// # Errors
    ///
    /// - `PoolError::Exhausted` if no slot freed up in time
    /// - `PoolMisuseError::AcquireAfterShutdown` if the pool is closed
    pub async fn acquire(&self) -> Result<Lease<C>, PoolError> {
        if self.is_closed() {
            return Err(PoolMisuseError::AcquireAfterShutdown.into());
        }

        let permit = match tokio::time::timeout(self.acquire_timeout, self.available.acquire()).await
        {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => return Err(PoolMisuseError::AcquireAfterShutdown.into()),
            Err(_) => {
                warn!(
                    "No pooled connection became free within {:?} ({} of {} leased)",
                    self.acquire_timeout,
                    self.leased(),
                    self.capacity
                );
                return Err(PoolError::Exhausted {
                    waited: self.acquire_timeout,
                });
            }
        };

        // close() may have started while we waited; dropping the permit hands
        // it to close().
        if self.is_closed() {
            return Err(PoolMisuseError::AcquireAfterShutdown.into());
        }

        let lease_id = self.next_lease_id.fetch_add(1, Ordering::SeqCst);
        let taken = {
            let mut slots = self.lock_slots();
            slots.states.iter_mut().enumerate().find_map(|(slot, state)| {
                if !matches!(state, SlotState::Free(_)) {
                    return None;
                }
                match std::mem::replace(state, SlotState::Leased { lease_id }) {
                    SlotState::Free(conn) => Some((slot, conn)),
                    other => {
                        *state = other;
                        None
                    }
                }
            })
        };

        let Some((slot, conn)) = taken else {
            // Permits track free slots one to one; getting here is a bookkeeping bug.
            log::error!("Acquired a pool permit but found no free slot");
            return Err(PoolError::Exhausted {
                waited: self.acquire_timeout,
            });
        };

        permit.forget();
        let leased = self.leased.fetch_add(1, Ordering::SeqCst) + 1;
        trace!("Leased slot {slot} (lease {lease_id}, {leased}/{} out)", self.capacity);

        Ok(Lease {
            slot,
            lease_id,
            conn,
        })
    }

    /// Returns a leased connection to its slot and wakes one waiter.
    ///
    /// # Errors
    ///
    /// `PoolMisuseError` if the lease's slot is not currently leased under the
    /// lease's id. That means a double release or a lease the pool never
    /// handed out; the lease's connection is dropped.
    pub async fn release(&self, lease: Lease<C>) -> Result<(), PoolMisuseError> {
        let Lease {
            slot,
            lease_id,
            conn,
        } = lease;

        let to_close = {
            let mut slots = self.lock_slots();
            let shut_down = slots.shut_down;
            let capacity = slots.states.len();
            let Some(state) = slots.states.get_mut(slot) else {
                return Err(PoolMisuseError::UnknownSlot { slot, capacity });
            };
            match state {
                SlotState::Leased { lease_id: current } if *current == lease_id => {}
                _ => return Err(PoolMisuseError::NotLeased { slot, lease_id }),
            }
            if shut_down {
                *state = SlotState::Closed;
                Some(conn)
            } else {
                *state = SlotState::Free(conn);
                None
            }
        };

        self.leased.fetch_sub(1, Ordering::SeqCst);
        match to_close {
            Some(conn) => {
                debug!("Slot {slot} released after shutdown; closing its connection");
                if let Err(e) = conn.close().await {
                    warn!("Failed to close connection for slot {slot}: {e}");
                }
            }
            None => {
                self.available.add_permits(1);
                trace!("Released slot {slot} (lease {lease_id})");
            }
        }
        Ok(())
    }

    /// Shuts the pool down.
    ///
    /// New acquires fail immediately. Outstanding leases get up to the close
    /// timeout to come back so an in-flight flush can finish; then every free
    /// connection is closed. Leases still out at that point are closed when
    /// they are released. Calling `close()` again is a no-op.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let permits = u32::try_from(self.capacity).unwrap_or(u32::MAX);
        match tokio::time::timeout(self.close_timeout, self.available.acquire_many(permits)).await {
            Ok(Ok(all)) => all.forget(),
            Ok(Err(_)) => {}
            Err(_) => warn!(
                "Closing connection pool with {} lease(s) still outstanding after {:?}",
                self.leased(),
                self.close_timeout
            ),
        }
        self.available.close();

        let connections: Vec<C> = {
            let mut slots = self.lock_slots();
            slots.shut_down = true;
            slots
                .states
                .iter_mut()
                .filter_map(|state| match std::mem::replace(state, SlotState::Closed) {
                    SlotState::Free(conn) => Some(conn),
                    leased @ SlotState::Leased { .. } => {
                        *state = leased;
                        None
                    }
                    SlotState::Closed => None,
                })
                .collect()
        };

        let count = connections.len();
        for conn in connections {
            if let Err(e) = conn.close().await {
                warn!("Failed to close pooled connection: {e}");
            }
        }
        debug!("Connection pool closed ({count} connection(s) closed)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_helpers::{MemoryConnection, MemoryStore};
    use std::sync::Arc;

    fn pool(size: usize, store: &Arc<MemoryStore>) -> ConnectionPool<MemoryConnection> {
        let conns = (0..size).map(|_| MemoryConnection::new(store.clone())).collect();
        ConnectionPool::new(conns, Duration::from_millis(200))
    }

    #[tokio::test]
    async fn test_acquire_and_release() {
        let store = MemoryStore::new();
        let pool = pool(2, &store);
        assert_eq!(pool.capacity(), 2);

        let a = pool.acquire().await.unwrap();
        let b = pool.acquire().await.unwrap();
        assert_ne!(a.slot(), b.slot());
        assert_eq!(pool.leased(), 2);

        pool.release(a).await.unwrap();
        pool.release(b).await.unwrap();
        assert_eq!(pool.leased(), 0);
    }

    #[tokio::test]
    async fn test_acquire_times_out_when_exhausted() {
        let store = MemoryStore::new();
        let conns = vec![MemoryConnection::new(store.clone())];
        let pool = ConnectionPool::new(conns, Duration::from_millis(30));

        let held = pool.acquire().await.unwrap();
        match pool.acquire().await {
            Err(PoolError::Exhausted { waited }) => assert_eq!(waited, Duration::from_millis(30)),
            other => panic!("expected exhaustion, got {:?}", other.map(|l| l.slot())),
        }
        pool.release(held).await.unwrap();
        assert!(pool.acquire().await.is_ok());
    }

    #[tokio::test]
    async fn test_release_wakes_waiter() {
        let store = MemoryStore::new();
        let pool = Arc::new(pool(1, &store));

        let held = pool.acquire().await.unwrap();
        let waiter = {
            let pool = pool.clone();
            tokio::spawn(async move { pool.acquire().await.map(|l| l.slot()) })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        pool.release(held).await.unwrap();
        assert_eq!(waiter.await.unwrap().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_double_release_rejected() {
        let store = MemoryStore::new();
        let pool = pool(1, &store);

        let lease = pool.acquire().await.unwrap();
        let duplicate = Lease {
            slot: lease.slot,
            lease_id: lease.lease_id,
            conn: MemoryConnection::new(store.clone()),
        };
        pool.release(lease).await.unwrap();

        let err = pool.release(duplicate).await.unwrap_err();
        assert!(matches!(err, PoolMisuseError::NotLeased { slot: 0, .. }));
        assert_eq!(pool.leased(), 0);
    }

    #[tokio::test]
    async fn test_release_of_never_acquired_lease_rejected() {
        let store = MemoryStore::new();
        let pool = pool(2, &store);

        let forged = Lease {
            slot: 1,
            lease_id: 999,
            conn: MemoryConnection::new(store.clone()),
        };
        assert_eq!(
            pool.release(forged).await.unwrap_err(),
            PoolMisuseError::NotLeased {
                slot: 1,
                lease_id: 999
            }
        );

        let out_of_range = Lease {
            slot: 5,
            lease_id: 1,
            conn: MemoryConnection::new(store.clone()),
        };
        assert_eq!(
            pool.release(out_of_range).await.unwrap_err(),
            PoolMisuseError::UnknownSlot {
                slot: 5,
                capacity: 2
            }
        );
    }

    #[tokio::test]
    async fn test_stale_lease_rejected_after_slot_reused() {
        let store = MemoryStore::new();
        let pool = pool(1, &store);

        let first = pool.acquire().await.unwrap();
        let stale = Lease {
            slot: first.slot,
            lease_id: first.lease_id,
            conn: MemoryConnection::new(store.clone()),
        };
        pool.release(first).await.unwrap();
        let second = pool.acquire().await.unwrap();

        assert!(pool.release(stale).await.is_err());
        assert_eq!(pool.leased(), 1);
        pool.release(second).await.unwrap();
    }

    #[tokio::test]
    async fn test_never_more_leases_than_capacity() {
        let store = MemoryStore::new();
        let pool = Arc::new(
            ConnectionPool::new(
                (0..3).map(|_| MemoryConnection::new(store.clone())).collect(),
                Duration::from_secs(5),
            ),
        );
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..20 {
            let pool = pool.clone();
            let peak = peak.clone();
            handles.push(tokio::spawn(async move {
                let lease = pool.acquire().await.unwrap();
                peak.fetch_max(pool.leased(), Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                pool.release(lease).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(pool.leased(), 0);
    }

    #[tokio::test]
    async fn test_acquire_after_close_is_misuse() {
        let store = MemoryStore::new();
        let pool = pool(2, &store);
        pool.close().await;

        assert!(matches!(
            pool.acquire().await,
            Err(PoolError::Misuse(PoolMisuseError::AcquireAfterShutdown))
        ));
        assert_eq!(store.closed_connections(), 2);
    }

    #[tokio::test]
    async fn test_close_waits_for_outstanding_lease() {
        let store = MemoryStore::new();
        let pool = Arc::new(pool(2, &store));

        let lease = pool.acquire().await.unwrap();
        let releaser = {
            let pool = pool.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(30)).await;
                pool.release(lease).await
            })
        };

        pool.close().await;
        assert!(releaser.await.unwrap().is_ok());
        assert_eq!(store.closed_connections(), 2);
    }

    #[tokio::test]
    async fn test_lease_released_after_close_timeout_is_closed() {
        let store = MemoryStore::new();
        let pool = pool(1, &store).with_close_timeout(Duration::from_millis(10));

        let lease = pool.acquire().await.unwrap();
        pool.close().await;
        assert_eq!(store.closed_connections(), 0);

        pool.release(lease).await.unwrap();
        assert_eq!(store.closed_connections(), 1);
        assert_eq!(pool.leased(), 0);
    }
}
