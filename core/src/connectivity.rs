//! Network reachability as seen by the engine.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ProbeError;

/// Link-level and internet-level reachability reported by the platform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetworkState {
    pub is_connected: bool,
    pub is_internet_reachable: bool,
}

impl NetworkState {
    pub const ONLINE: Self = Self {
        is_connected: true,
        is_internet_reachable: true,
    };
    pub const OFFLINE: Self = Self {
        is_connected: false,
        is_internet_reachable: false,
    };

    /// Online only when both the link and the internet are confirmed.
    pub fn is_online(&self) -> bool {
        self.is_connected && self.is_internet_reachable
    }
}

/// Answers "is the network reachable" on demand.
#[async_trait]
pub trait ConnectivityProber: Send + Sync {
    async fn probe(&self) -> Result<NetworkState, ProbeError>;
}

/// Host-driven prober: the platform pushes state changes in, the engine
/// reads the latest values. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct ManualConnectivity {
    connected: Arc<AtomicBool>,
    reachable: Arc<AtomicBool>,
}

impl ManualConnectivity {
    pub fn new(state: NetworkState) -> Self {
        let prober = Self::default();
        prober.set(state);
        prober
    }

    pub fn online() -> Self {
        Self::new(NetworkState::ONLINE)
    }

    pub fn offline() -> Self {
        Self::new(NetworkState::OFFLINE)
    }

    pub fn set(&self, state: NetworkState) {
        self.connected.store(state.is_connected, Ordering::SeqCst);
        self.reachable
            .store(state.is_internet_reachable, Ordering::SeqCst);
    }

    pub fn current(&self) -> NetworkState {
        NetworkState {
            is_connected: self.connected.load(Ordering::SeqCst),
            is_internet_reachable: self.reachable.load(Ordering::SeqCst),
        }
    }
}

#[async_trait]
impl ConnectivityProber for ManualConnectivity {
    async fn probe(&self) -> Result<NetworkState, ProbeError> {
        Ok(self.current())
    }
}

#[async_trait]
impl<P: ConnectivityProber + ?Sized> ConnectivityProber for Arc<P> {
    async fn probe(&self) -> Result<NetworkState, ProbeError> {
        (**self).probe().await
    }
}
