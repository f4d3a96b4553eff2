//! Offline-aware synchronization core for the todo app.
//!
//! # Overview
//! Keeps a session-scoped `TodoStore` consistent with a remote todo REST
//! service. When the device is online, requests go to the service and the
//! store is reconciled with the response; when it is offline, the store is
//! mutated directly and a local response is synthesized.
//!
//! # Design
//! - `TodoClient` builds `HttpRequest` values and parses `HttpResponse`
//!   values without touching the network (host-does-IO pattern).
//! - `Reconciler` is the sans-io engine: `begin` decides between the offline
//!   branch and a remote call, `complete` reconciles a remote response.
//! - `SyncEngine` drives a `Reconciler` through the `ConnectivityProber` and
//!   `Transport` seams for hosts that want a single async `perform`.
//! - `Pager`, `filter_by_status` and `ToggleDebouncer` are the small pieces
//!   of list-screen state that sit on top of the engine.

pub mod client;
pub mod config;
pub mod connectivity;
pub mod debounce;
pub mod engine;
pub mod error;
pub mod filter;
pub mod http;
pub mod pager;
pub mod store;
pub mod transport;
pub mod types;

pub use client::TodoClient;
pub use config::{IdPolicy, SyncConfig};
pub use connectivity::{ConnectivityProber, ManualConnectivity, NetworkState};
pub use debounce::ToggleDebouncer;
pub use engine::{
    FetchResult, Generation, Origin, Reconciler, RemoteCall, SyncData, SyncEngine, SyncMethod,
    SyncRequest, SyncStep, Target,
};
pub use error::{ApiError, ConfigError, ProbeError, SyncError, TransportError};
pub use filter::{filter_by_status, StatusPartition, TodoKind};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use pager::{PageTicket, Pager};
pub use store::TodoStore;
pub use transport::Transport;
pub use types::{PageRequest, Todo, TodoBody, TodoPage};
