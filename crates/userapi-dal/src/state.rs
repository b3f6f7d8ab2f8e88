//! Connection lifecycle shared by all drivers.
//!
//! Every driver keeps its pool handle in a [`ConnectionState`]. Operations
//! borrow the handle through a [`Lease`]; the slot lock is held only long
//! enough to clone the handle, so CRUD operations never serialise on it.
//! Both sqlx pools and mongodb clients are reference-counted handles.
//!
//! Closing is two steps: [`ConnectionState::close`] stops admitting new
//! operations, then [`ConnectionState::drain`] waits for outstanding leases.

use crate::driver::{DriverState, Operation};
use std::future::Future;
use std::ops::Deref;
use std::time::Duration;
use tokio::sync::{RwLock, RwLockReadGuard};
use userapi_core::{UserApiError, UserApiResult};

#[derive(Debug)]
enum Slot<H> {
    Uninitialized,
    Connected(H),
    Closed,
}

/// Uninitialized → Connected → Closed state machine around a pool handle.
#[derive(Debug)]
pub struct ConnectionState<H> {
    slot: RwLock<Slot<H>>,
    // One read guard per in-flight operation; drain takes the write side.
    in_flight: RwLock<()>,
}

/// A pool handle borrowed for the duration of one operation.
#[derive(Debug)]
pub struct Lease<'a, H> {
    handle: H,
    _in_flight: RwLockReadGuard<'a, ()>,
}

impl<H> Deref for Lease<'_, H> {
    type Target = H;

    fn deref(&self) -> &H {
        &self.handle
    }
}

impl<H: Clone + Send + Sync> ConnectionState<H> {
    /// Creates a state in [`DriverState::Uninitialized`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(Slot::Uninitialized),
            in_flight: RwLock::new(()),
        }
    }

    /// Returns the current lifecycle state.
    pub async fn state(&self) -> DriverState {
        match &*self.slot.read().await {
            Slot::Uninitialized => DriverState::Uninitialized,
            Slot::Connected(_) => DriverState::Connected,
            Slot::Closed => DriverState::Closed,
        }
    }

    /// Runs `open` and stores its handle.
    ///
    /// The write lock is held across `open`, so concurrent callers cannot
    /// both open a pool. A failed `open` leaves the state Uninitialized.
    pub async fn connect<F, Fut>(&self, open: F) -> UserApiResult<()>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = UserApiResult<H>> + Send,
    {
        let mut slot = self.slot.write().await;
        match &*slot {
            Slot::Connected(_) => Err(UserApiError::AlreadyConnected),
            Slot::Closed => Err(UserApiError::Closed),
            Slot::Uninitialized => {
                *slot = Slot::Connected(open().await?);
                Ok(())
            }
        }
    }

    /// Leases the live handle for `operation`.
    ///
    /// The lease is registered while the slot is still read-locked, so an
    /// operation admitted before [`close`](Self::close) is always seen by
    /// [`drain`](Self::drain).
    pub async fn handle(&self, operation: Operation) -> UserApiResult<Lease<'_, H>> {
        let slot = self.slot.read().await;
        match &*slot {
            Slot::Connected(handle) => Ok(Lease {
                handle: handle.clone(),
                _in_flight: self.in_flight.read().await,
            }),
            Slot::Uninitialized | Slot::Closed => Err(UserApiError::NotConnected {
                operation: operation.describe(),
            }),
        }
    }

    /// Moves to Closed and hands back the handle that still needs releasing.
    ///
    /// Returns `None` if there was no live handle, which makes repeated
    /// closes no-ops.
    pub async fn close(&self) -> Option<H> {
        let mut slot = self.slot.write().await;
        match std::mem::replace(&mut *slot, Slot::Closed) {
            Slot::Connected(handle) => Some(handle),
            Slot::Uninitialized | Slot::Closed => None,
        }
    }

    /// Waits until every outstanding lease is dropped.
    ///
    /// Returns `false` if `deadline` elapsed first.
    pub async fn drain(&self, deadline: Duration) -> bool {
        tokio::time::timeout(deadline, self.in_flight.write())
            .await
            .is_ok()
    }
}

impl<H: Clone + Send + Sync> Default for ConnectionState<H> {
    fn default() -> Self {
        Self::new()
    }
}
