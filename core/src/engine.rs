//! The sync engine: offline fallback and remote reconciliation.
//!
//! # Design
//! `Reconciler` holds no I/O. `begin` checks the network state it is given
//! and either serves the request from the local store (`SyncStep::Done`) or
//! hands back the `HttpRequest` to execute (`SyncStep::Remote`). `complete`
//! takes the outcome of that round-trip, validates it and reconciles the
//! store. A native host can drive these two calls directly.
//!
//! `SyncEngine` wires a `Reconciler` to a `ConnectivityProber` and a
//! `Transport` and exposes `perform`, which always resolves to a
//! `FetchResult`: failures are data, never panics or early returns.
//!
//! Calls are not serialized. Two overlapping calls against the same store
//! may interleave their mutations; every result carries a `Generation` so
//! callers can drop results that are no longer current.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::client::TodoClient;
use crate::config::SyncConfig;
use crate::connectivity::{ConnectivityProber, NetworkState};
use crate::error::{ApiError, SyncError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::store::TodoStore;
use crate::transport::Transport;
use crate::types::{PageRequest, Todo, TodoPage};

/// What a request does to the todo collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMethod {
    List,
    Create,
    Update,
    Delete,
}

impl SyncMethod {
    pub fn from_http(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => SyncMethod::List,
            HttpMethod::Post => SyncMethod::Create,
            HttpMethod::Put => SyncMethod::Update,
            HttpMethod::Delete => SyncMethod::Delete,
        }
    }

    pub fn http(self) -> HttpMethod {
        match self {
            SyncMethod::List => HttpMethod::Get,
            SyncMethod::Create => HttpMethod::Post,
            SyncMethod::Update => HttpMethod::Put,
            SyncMethod::Delete => HttpMethod::Delete,
        }
    }
}

impl fmt::Display for SyncMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncMethod::List => "list",
            SyncMethod::Create => "create",
            SyncMethod::Update => "update",
            SyncMethod::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Which endpoint a request addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// The paged listing endpoint.
    Page(PageRequest),
    /// The creation endpoint.
    Add,
    /// A per-id endpoint.
    Item(u64),
}

/// A request handed to `SyncEngine::perform` or `Reconciler::begin`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    pub method: SyncMethod,
    pub target: Target,
    pub payload: Option<Todo>,
}

impl SyncRequest {
    pub fn new(method: SyncMethod, target: Target, payload: Option<Todo>) -> Self {
        Self {
            method,
            target,
            payload,
        }
    }

    pub fn list(page: PageRequest) -> Self {
        Self::new(SyncMethod::List, Target::Page(page), None)
    }

    pub fn create(todo: Todo) -> Self {
        Self::new(SyncMethod::Create, Target::Add, Some(todo))
    }

    pub fn update(todo: Todo) -> Self {
        Self::new(SyncMethod::Update, Target::Item(todo.id), Some(todo))
    }

    pub fn delete(todo: Todo) -> Self {
        Self::new(SyncMethod::Delete, Target::Item(todo.id), Some(todo))
    }

    fn payload_id(&self) -> Option<u64> {
        self.payload.as_ref().map(|t| t.id)
    }

    /// Id for per-item endpoints: the explicit target wins over the payload.
    fn item_id(&self) -> Option<u64> {
        match self.target {
            Target::Item(id) => Some(id),
            _ => self.payload_id(),
        }
    }
}

/// Monotonic sequence number issued to every request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(pub u64);

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Reconciled from a remote response.
    Remote,
    /// Served from the local store while offline.
    Local,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SyncData {
    Page(TodoPage),
    Todo(Todo),
}

impl SyncData {
    pub fn as_page(&self) -> Option<&TodoPage> {
        match self {
            SyncData::Page(page) => Some(page),
            SyncData::Todo(_) => None,
        }
    }

    pub fn as_todo(&self) -> Option<&Todo> {
        match self {
            SyncData::Todo(todo) => Some(todo),
            SyncData::Page(_) => None,
        }
    }
}

/// Outcome of one engine call. Either data or an error, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    pub generation: Generation,
    pub origin: Origin,
    pub outcome: Result<SyncData, SyncError>,
}

impl FetchResult {
    pub fn data(&self) -> Option<&SyncData> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&SyncError> {
        self.outcome.as_ref().err()
    }

    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn page(&self) -> Option<&TodoPage> {
        self.data().and_then(SyncData::as_page)
    }

    pub fn todo(&self) -> Option<&Todo> {
        self.data().and_then(SyncData::as_todo)
    }
}

pub enum SyncStep {
    /// Resolved without the network.
    Done(FetchResult),
    /// Execute `RemoteCall::http` and pass the outcome to `Reconciler::complete`.
    Remote(RemoteCall),
}

/// An online request waiting for its HTTP round-trip.
///
/// Holds the reconciler's pending count until it is completed or dropped.
#[derive(Debug)]
pub struct RemoteCall {
    generation: Generation,
    request: SyncRequest,
    http: HttpRequest,
    _pending: PendingGuard,
}

impl RemoteCall {
    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn request(&self) -> &SyncRequest {
        &self.request
    }

    pub fn http(&self) -> &HttpRequest {
        &self.http
    }
}

#[derive(Debug)]
struct PendingGuard(Arc<AtomicUsize>);

impl PendingGuard {
    fn new(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Sans-io core of the engine. See module docs.
#[derive(Debug)]
pub struct Reconciler {
    client: TodoClient,
    store: TodoStore,
    last_generation: AtomicU64,
    pending: Arc<AtomicUsize>,
}

impl Reconciler {
    pub fn new(client: TodoClient, store: TodoStore) -> Self {
        Self {
            client,
            store,
            last_generation: AtomicU64::new(0),
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn from_config(config: &SyncConfig, store: TodoStore) -> Self {
        Self::new(config.client(), store)
    }

    pub fn client(&self) -> &TodoClient {
        &self.client
    }

    pub fn store(&self) -> &TodoStore {
        &self.store
    }

    /// True while any `perform` or `RemoteCall` is outstanding.
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst) > 0
    }

    pub fn latest_generation(&self) -> Generation {
        Generation(self.last_generation.load(Ordering::SeqCst))
    }

    /// Whether `generation` belongs to the most recently started request.
    pub fn is_latest(&self, generation: Generation) -> bool {
        self.latest_generation() == generation
    }

    fn next_generation(&self) -> Generation {
        Generation(self.last_generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn track_pending(&self) -> PendingGuard {
        PendingGuard::new(&self.pending)
    }

    pub fn begin(&self, request: SyncRequest, network: NetworkState) -> SyncStep {
        let generation = self.next_generation();

        if !network.is_online() {
            tracing::warn!(%generation, method = %request.method, "no internet connection, using local data");
            return SyncStep::Done(FetchResult {
                generation,
                origin: Origin::Local,
                outcome: self.apply_offline(request),
            });
        }

        match self.build_http(&request) {
            Ok(http) => {
                tracing::debug!(%generation, method = %http.method, path = %http.path, "remote call");
                SyncStep::Remote(RemoteCall {
                    generation,
                    request,
                    http,
                    _pending: self.track_pending(),
                })
            }
            Err(err) => SyncStep::Done(FetchResult {
                generation,
                origin: Origin::Remote,
                outcome: Err(err),
            }),
        }
    }

    /// Finish a remote call. `response` is the server's answer, or the
    /// transport's error message if the round-trip failed.
    pub fn complete(&self, call: RemoteCall, response: Result<HttpResponse, String>) -> FetchResult {
        let RemoteCall {
            generation,
            request,
            ..
        } = call;

        let outcome = match response {
            Ok(response) => self.reconcile(&request, response),
            Err(message) => Err(SyncError::Transport(message)),
        };
        if let Err(err) = &outcome {
            tracing::warn!(%generation, method = %request.method, error = %err, "remote call failed");
        }

        FetchResult {
            generation,
            origin: Origin::Remote,
            outcome,
        }
    }

    fn apply_offline(&self, request: SyncRequest) -> Result<SyncData, SyncError> {
        match (request.method, request.payload) {
            (SyncMethod::List, _) => Ok(SyncData::Page(TodoPage::local(self.store.snapshot()))),
            (SyncMethod::Create, Some(todo)) => {
                self.store.append(todo.clone());
                Ok(SyncData::Todo(todo))
            }
            (SyncMethod::Update, Some(patch)) => {
                // Unknown ids are not an error: the payload comes back as-is.
                let merged = self.store.merge_by_id(&patch).unwrap_or(patch);
                Ok(SyncData::Todo(merged))
            }
            (SyncMethod::Delete, Some(todo)) => {
                self.store.remove_by_id(todo.id);
                Ok(SyncData::Todo(todo))
            }
            (method, None) => Err(SyncError::UnsupportedOffline { method }),
        }
    }

    fn build_http(&self, request: &SyncRequest) -> Result<HttpRequest, SyncError> {
        let payload = || {
            request.payload.as_ref().ok_or_else(|| {
                SyncError::InvalidRequest(format!("{} requires a payload", request.method))
            })
        };
        let item_id = || {
            request.item_id().ok_or_else(|| {
                SyncError::InvalidRequest(format!("{} requires a target id", request.method))
            })
        };

        let http = match request.method {
            SyncMethod::List => {
                let page = match request.target {
                    Target::Page(page) => page,
                    _ => PageRequest::default(),
                };
                self.client.build_list_todos(page)
            }
            SyncMethod::Create => self.client.build_create_todo(payload()?)?,
            SyncMethod::Update => self.client.build_update_todo(item_id()?, payload()?)?,
            SyncMethod::Delete => {
                payload()?;
                self.client.build_delete_todo(item_id()?)
            }
        };
        Ok(http)
    }

    fn reconcile(&self, request: &SyncRequest, response: HttpResponse) -> Result<SyncData, SyncError> {
        let requested_id = request.payload_id();
        match request.method {
            SyncMethod::List => {
                let page = self.client.parse_list_todos(response)?;
                // The store mirrors the last fetched page; accumulating pages
                // for display is the pager's job.
                self.store.replace_all(page.todos.clone());
                tracing::debug!(count = page.todos.len(), "store replaced from page");
                Ok(SyncData::Page(page))
            }
            SyncMethod::Create => {
                let todo = self.client.parse_create_todo(response, requested_id)?;
                if request.payload.is_some() {
                    self.store.append(todo.clone());
                }
                Ok(SyncData::Todo(todo))
            }
            SyncMethod::Update => {
                let todo = self.client.parse_update_todo(response, requested_id)?;
                if let Some(patch) = &request.payload {
                    self.store.merge_by_id(patch);
                }
                Ok(SyncData::Todo(todo))
            }
            SyncMethod::Delete => {
                let confirmed = self.client.parse_delete_todo(response, requested_id)?;
                if let Some(todo) = &request.payload {
                    self.store.remove_by_id(todo.id);
                }
                confirmed
                    .or_else(|| request.payload.clone())
                    .map(SyncData::Todo)
                    .ok_or_else(|| SyncError::from(ApiError::InvalidBody("empty delete response".to_string())))
            }
        }
    }
}

/// `Reconciler` plus the prober and transport it needs to run on its own.
pub struct SyncEngine<P, T> {
    reconciler: Reconciler,
    prober: P,
    transport: T,
}

impl<P: ConnectivityProber, T: Transport> SyncEngine<P, T> {
    pub fn new(reconciler: Reconciler, prober: P, transport: T) -> Self {
        Self {
            reconciler,
            prober,
            transport,
        }
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn store(&self) -> &TodoStore {
        self.reconciler.store()
    }

    pub fn is_pending(&self) -> bool {
        self.reconciler.is_pending()
    }

    /// Run `request` against the service, or the local store when offline.
    pub async fn perform(&self, request: SyncRequest) -> FetchResult {
        let _pending = self.reconciler.track_pending();

        let network = match self.prober.probe().await {
            Ok(state) => state,
            Err(err) => {
                tracing::warn!(error = %err, "treating device as offline");
                NetworkState::OFFLINE
            }
        };

        match self.reconciler.begin(request, network) {
            SyncStep::Done(result) => result,
            SyncStep::Remote(call) => {
                let response = self
                    .transport
                    .execute(call.http().clone())
                    .await
                    .map_err(|err| err.0);
                self.reconciler.complete(call, response)
            }
        }
    }

    pub async fn list(&self, page: PageRequest) -> FetchResult {
        self.perform(SyncRequest::list(page)).await
    }

    pub async fn create(&self, todo: Todo) -> FetchResult {
        self.perform(SyncRequest::create(todo)).await
    }

    pub async fn update(&self, todo: Todo) -> FetchResult {
        self.perform(SyncRequest::update(todo)).await
    }

    pub async fn delete(&self, todo: Todo) -> FetchResult {
        self.perform(SyncRequest::delete(todo)).await
    }
}
