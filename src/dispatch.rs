//! Request dispatcher for the `/products` resource.
//!
//! Turns method + `id` query + body into one store operation and maps the
//! outcome to a status code and body. Nothing here knows about files; the
//! store knows nothing about HTTP.

use crate::record::{Collection, Record};
use crate::store::{Commit, ProductStore, StoreHandle};
use axum::body::{Body, Bytes};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// How PUT applies a body to an existing record. PATCH always merges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum UpdateMode {
    /// Shallow merge: mentioned fields overwrite, others are kept.
    #[default]
    Merge,
    /// Full replacement: only `id` survives from the old record.
    Replace,
}

/// Which record an operation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// A well-formed identifier.
    Id(u64),
    /// An `id` was given but has no leading digits, so nothing can match it.
    Unmatchable,
}

impl Target {
    /// Leading decimal digits after optional whitespace and `+`; whatever
    /// follows them is ignored, so `12abc` and `12.5` both address 12.
    fn parse(raw: &str) -> Self {
        let rest = raw.trim_start();
        let rest = rest.strip_prefix('+').unwrap_or(rest);
        let end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        rest[..end].parse().map_or(Target::Unmatchable, Target::Id)
    }

    fn locate(self, records: &[Record]) -> Option<usize> {
        match self {
            Target::Id(id) => ProductStore::find(records, id),
            Target::Unmatchable => None,
        }
    }
}

/// One of the operations `/products` supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// `GET` without an id.
    List,
    /// `GET ?id=`.
    Get(Target),
    /// `POST`.
    Create,
    /// `PUT ?id=` or `PATCH ?id=`.
    Update(Target, UpdateMode),
    /// `DELETE ?id=`.
    Delete(Target),
}

impl Operation {
    /// Decode the operation from the method and the raw `id` query value.
    ///
    /// An empty `id` counts as absent. Otherwise the id is read from its
    /// leading digits, ignoring leading whitespace, a `+` sign and any
    /// trailing text: `7`, ` 7`, `7abc` and `7.9` all address record 7. A
    /// value with no leading digits (`abc`, `-3`) or one beyond `u64` is
    /// [`Target::Unmatchable`], which is a 404 for GET, PUT, PATCH and DELETE.
    pub fn decode(
        method: &Method,
        id: Option<&str>,
        put: UpdateMode,
    ) -> Result<Self, DispatchError> {
        let target = id.filter(|s| !s.is_empty()).map(Target::parse);
        match *method {
            Method::GET => Ok(target.map_or(Operation::List, Operation::Get)),
            Method::POST => Ok(Operation::Create),
            Method::PUT => target
                .map(|t| Operation::Update(t, put))
                .ok_or(DispatchError::BadRequest),
            Method::PATCH => target
                .map(|t| Operation::Update(t, UpdateMode::Merge))
                .ok_or(DispatchError::BadRequest),
            Method::DELETE => target.map(Operation::Delete).ok_or(DispatchError::BadRequest),
            _ => Err(DispatchError::MethodNotAllowed),
        }
    }

    /// `true` for operations that read and parse a request body.
    #[must_use]
    pub fn takes_body(&self) -> bool {
        matches!(self, Operation::Create | Operation::Update(..))
    }
}

/// Everything a request can fail with, each mapped to a plain-text response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    /// No record matches the id.
    NotFound,
    /// Missing id, or a body that is not a JSON object.
    BadRequest,
    /// Body exceeded [`BodyLimits::max_bytes`].
    BodyTooLarge,
    /// Body did not arrive within [`BodyLimits::read_timeout`].
    Timeout,
    /// Method is not one of GET/POST/PUT/PATCH/DELETE.
    MethodNotAllowed,
    /// The store operation did not run to completion.
    Internal,
}

impl DispatchError {
    /// Status code sent to the client.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::NotFound => StatusCode::NOT_FOUND,
            DispatchError::BadRequest | DispatchError::BodyTooLarge => StatusCode::BAD_REQUEST,
            DispatchError::Timeout => StatusCode::REQUEST_TIMEOUT,
            DispatchError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            DispatchError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Plain-text body sent to the client.
    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            DispatchError::NotFound => "Product not found",
            DispatchError::BadRequest | DispatchError::BodyTooLarge => "Bad Request",
            DispatchError::Timeout => "Request Timeout",
            DispatchError::MethodNotAllowed => "Method Not Allowed",
            DispatchError::Internal => "Internal Server Error",
        }
    }
}

impl std::fmt::Display for DispatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for DispatchError {}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        (self.status(), self.message()).into_response()
    }
}

/// Bounds on request body accumulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyLimits {
    /// Largest body accepted, in bytes.
    pub max_bytes: usize,
    /// How long the whole body may take to arrive.
    pub read_timeout: Duration,
}

impl Default for BodyLimits {
    fn default() -> Self {
        Self {
            max_bytes: 1024 * 1024,
            read_timeout: Duration::from_secs(30),
        }
    }
}

/// Maps requests on `/products` to store operations.
#[derive(Debug)]
pub struct Dispatcher {
    store: Arc<StoreHandle>,
    limits: BodyLimits,
    put: UpdateMode,
}

impl Dispatcher {
    /// Dispatcher over `store` with default limits and merging PUT.
    pub fn new(store: Arc<StoreHandle>) -> Self {
        Self {
            store,
            limits: BodyLimits::default(),
            put: UpdateMode::Merge,
        }
    }

    /// Override the body limits.
    pub fn with_limits(mut self, limits: BodyLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Choose whether PUT merges or replaces.
    pub fn with_put_mode(mut self, put: UpdateMode) -> Self {
        self.put = put;
        self
    }

    /// The store requests are dispatched to.
    #[must_use]
    pub fn store(&self) -> &Arc<StoreHandle> {
        &self.store
    }

    /// Handle one request on `/products`.
    pub async fn handle(&self, method: &Method, id: Option<&str>, body: Body) -> Response {
        match self.dispatch(method, id, body).await {
            Ok((status, value)) => {
                tracing::debug!(%method, id, %status, "request served");
                (status, Json(value)).into_response()
            }
            Err(e) => {
                tracing::debug!(%method, id, status = %e.status(), "request rejected: {e}");
                e.into_response()
            }
        }
    }

    async fn dispatch(
        &self,
        method: &Method,
        id: Option<&str>,
        body: Body,
    ) -> Result<(StatusCode, Value), DispatchError> {
        let op = Operation::decode(method, id, self.put)?;

        // Bodies are parsed before the store is touched, so a bad body can
        // never leave a partial write behind.
        let payload = if op.takes_body() {
            let bytes = read_body(body, self.limits).await?;
            Some(Record::from_json(&bytes).map_err(|e| {
                tracing::debug!("rejecting body: {e}");
                DispatchError::BadRequest
            })?)
        } else {
            None
        };

        // File I/O and the store's locks block; keep them off the runtime.
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || execute(&store, op, payload))
            .await
            .map_err(|e| {
                tracing::error!("store operation aborted: {e}");
                DispatchError::Internal
            })?
    }
}

/// Run a decoded operation against the store. Blocking.
fn execute(
    store: &ProductStore,
    op: Operation,
    payload: Option<Record>,
) -> Result<(StatusCode, Value), DispatchError> {
    match (op, payload) {
        (Operation::List, _) => Ok((StatusCode::OK, collection_json(store.load()))),
        (Operation::Get(target), _) => {
            let records = store.load();
            let index = target.locate(&records).ok_or(DispatchError::NotFound)?;
            Ok((StatusCode::OK, records[index].clone().into()))
        }
        (Operation::Create, Some(mut record)) => {
            let created = store.transact(|records| {
                record.set_id(store.next_id(records));
                records.push(record.clone());
                Commit::Save(record)
            });
            Ok((StatusCode::CREATED, created.into()))
        }
        (Operation::Update(target, mode), Some(patch)) => {
            let updated = store.transact(|records| match target.locate(records) {
                Some(index) => {
                    let record = &mut records[index];
                    match mode {
                        UpdateMode::Merge => record.merge(patch),
                        UpdateMode::Replace => record.replace(patch),
                    }
                    Commit::Save(Some(record.clone()))
                }
                None => Commit::Skip(None),
            });
            updated
                .map(|r| (StatusCode::OK, r.into()))
                .ok_or(DispatchError::NotFound)
        }
        (Operation::Delete(target), _) => {
            let removed = store.transact(|records| match target.locate(records) {
                Some(index) => Commit::Save(Some(records.remove(index))),
                None => Commit::Skip(None),
            });
            removed
                .map(|r| (StatusCode::OK, r.into()))
                .ok_or(DispatchError::NotFound)
        }
        // takes_body() guarantees a payload for Create and Update.
        (Operation::Create | Operation::Update(..), None) => Err(DispatchError::BadRequest),
    }
}

fn collection_json(records: Collection) -> Value {
    Value::Array(records.into_iter().map(Value::from).collect())
}

/// Accumulate the whole body, bounded in size and time.
pub async fn read_body(body: Body, limits: BodyLimits) -> Result<Bytes, DispatchError> {
    let read = axum::body::to_bytes(body, limits.max_bytes);
    match tokio::time::timeout(limits.read_timeout, read).await {
        Ok(Ok(bytes)) => Ok(bytes),
        Ok(Err(e)) => {
            tracing::debug!("failed to read request body: {e}");
            Err(DispatchError::BodyTooLarge)
        }
        Err(_) => Err(DispatchError::Timeout),
    }
}
