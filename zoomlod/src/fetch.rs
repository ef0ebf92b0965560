//! Fetch lifecycle: issuing, superseding, and completing reads.
//!
//! ```text
//! trigger_read
//!   ├─ previous request in flight && !no_abort → protocol.abort + Ended(Aborted)
//!   ├─ build Filter from bounds/resolution
//!   ├─ Started(filter)
//!   └─ protocol.read({filter, params + level=L<n>, on_complete})
//!
//! on_complete (any thread)
//!   ├─ success → sink.replace(features), Ended(Completed)
//!   └─ failure → sink.clear(), mark bounds stale, Ended(Failed)
//! ```
//!
//! Retries and timeouts belong to the transport behind [`Protocol`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use geo::Rect;
use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::level::{DetailLevel, LEVEL_PARAM};
use crate::store::FeatureSink;
use crate::view::Feature;

/// Default capacity of the load event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Sequence number the fetch layer assigns to each read it issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl RequestId {
    /// Numeric value.
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opaque handle returned by the transport for an issued read.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestHandle(u64);

impl RequestHandle {
    /// Wrap a transport-specific identifier.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Transport-specific identifier.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Spatial (and optional attribute) filter sent with a read.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// Extent to fetch, in map units.
    pub bounds: Rect<f64>,
    /// Resolution the extent was computed at.
    pub resolution: f64,
    /// Attribute filter expression configured on the layer, if any.
    pub attribute: Option<String>,
}

/// Outcome of a completed read.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadStatus {
    /// The read succeeded.
    Success,
    /// The read failed.
    Failure(String),
}

/// Response delivered to a read's completion handler.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadResponse {
    /// Whether the read succeeded.
    pub status: ReadStatus,
    /// Features returned by the data source.
    pub features: Vec<Feature>,
}

impl ReadResponse {
    /// Successful response carrying `features`.
    pub fn success(features: Vec<Feature>) -> Self {
        Self {
            status: ReadStatus::Success,
            features,
        }
    }

    /// Failed response.
    pub fn failure(reason: impl Into<String>) -> Self {
        Self {
            status: ReadStatus::Failure(reason.into()),
            features: Vec::new(),
        }
    }

    /// Whether the read succeeded.
    pub fn is_success(&self) -> bool {
        self.status == ReadStatus::Success
    }
}

/// Completion handler invoked by the transport exactly once per read.
pub type CompletionHandler = Box<dyn FnOnce(ReadResponse) + Send + 'static>;

/// A read request handed to the transport.
pub struct ReadRequest {
    /// Sequence number of this read.
    pub id: RequestId,
    /// Filter describing what to fetch.
    pub filter: Filter,
    /// Request parameters, including `level`.
    pub params: BTreeMap<String, String>,
    /// Handler the transport calls when the read finishes.
    pub on_complete: CompletionHandler,
}

impl fmt::Debug for ReadRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadRequest")
            .field("id", &self.id)
            .field("filter", &self.filter)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Transport that performs reads and aborts.
pub trait Protocol {
    /// Issue a read. The transport calls `request.on_complete` when it
    /// finishes, possibly before this method returns.
    fn read(&mut self, request: ReadRequest) -> RequestHandle;

    /// Abort a previously issued read. Aborted reads must not complete.
    fn abort(&mut self, handle: &RequestHandle);
}

/// Why a load ended.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// Superseded by a newer read.
    Aborted,
    /// Completed successfully with this many features.
    Completed { features: usize },
    /// Completed unsuccessfully.
    Failed { reason: String },
}

/// Load lifecycle notifications.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadEvent {
    /// A read was issued.
    Started { request: RequestId, filter: Filter },
    /// A read ended.
    Ended {
        request: RequestId,
        outcome: LoadOutcome,
    },
}

/// Per-call options for [`FetchLifecycleManager::trigger_read`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadOptions {
    /// Leave any in-flight read running instead of aborting it.
    pub no_abort: bool,
    /// Extra request parameters. `level` is always overwritten.
    pub params: BTreeMap<String, String>,
}

/// State shared between the manager and completion handlers.
#[derive(Debug, Default)]
struct FetchShared {
    /// Most recently issued read that has not completed or been aborted.
    current: Option<RequestId>,
    /// Transport handle of `current`, once `read` has returned.
    handle: Option<RequestHandle>,
    /// Set when a read failed; the tracked bounds should be discarded.
    bounds_stale: bool,
}

/// Issues reads for the chosen detail level and supersedes stale ones.
pub struct FetchLifecycleManager<P> {
    protocol: P,
    sink: Arc<dyn FeatureSink>,
    attribute_filter: Option<String>,
    shared: Arc<Mutex<FetchShared>>,
    events: broadcast::Sender<LoadEvent>,
    next_id: u64,
}

impl<P> fmt::Debug for FetchLifecycleManager<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchLifecycleManager")
            .field("attribute_filter", &self.attribute_filter)
            .field("shared", &self.shared)
            .field("next_id", &self.next_id)
            .finish_non_exhaustive()
    }
}

impl<P: Protocol> FetchLifecycleManager<P> {
    /// Create a manager reading through `protocol` and merging into `sink`.
    pub fn new(protocol: P, sink: Arc<dyn FeatureSink>) -> Self {
        let (events, _) = broadcast::channel(DEFAULT_EVENT_CAPACITY);
        Self {
            protocol,
            sink,
            attribute_filter: None,
            shared: Arc::new(Mutex::new(FetchShared::default())),
            events,
            next_id: 1,
        }
    }

    /// Attach an attribute filter expression to every read.
    pub fn with_attribute_filter(mut self, filter: Option<String>) -> Self {
        self.attribute_filter = filter;
        self
    }

    /// Subscribe to load events.
    pub fn subscribe(&self) -> broadcast::Receiver<LoadEvent> {
        self.events.subscribe()
    }

    /// The transport.
    pub fn protocol(&self) -> &P {
        &self.protocol
    }

    /// The transport, mutably (e.g. to drive a test transport's completions).
    pub fn protocol_mut(&mut self) -> &mut P {
        &mut self.protocol
    }

    /// The read currently in flight, if any.
    pub fn in_flight(&self) -> Option<RequestId> {
        self.shared.lock().current
    }

    /// Whether a read failed since the last call; clears the flag.
    pub fn take_bounds_stale(&self) -> bool {
        std::mem::take(&mut self.shared.lock().bounds_stale)
    }

    /// Issue a read for `level` covering `bounds`.
    pub fn trigger_read(
        &mut self,
        level: DetailLevel,
        bounds: Rect<f64>,
        resolution: f64,
        options: &ReadOptions,
    ) -> RequestId {
        if !options.no_abort {
            self.abort_in_flight();
        }

        let id = RequestId(self.next_id);
        self.next_id += 1;

        let filter = Filter {
            bounds,
            resolution,
            attribute: self.attribute_filter.clone(),
        };
        self.emit(LoadEvent::Started {
            request: id,
            filter: filter.clone(),
        });

        let mut params = options.params.clone();
        params.insert(LEVEL_PARAM.to_string(), level.to_param());

        {
            let mut shared = self.shared.lock();
            shared.current = Some(id);
            shared.handle = None;
        }

        let request = ReadRequest {
            id,
            filter,
            params,
            on_complete: self.completion_handler(id),
        };

        tracing::info!(
            request = %id,
            level = %level,
            no_abort = options.no_abort,
            "Issuing read"
        );

        let handle = self.protocol.read(request);

        // The transport may already have completed the read.
        let mut shared = self.shared.lock();
        if shared.current == Some(id) {
            shared.handle = Some(handle);
        }

        id
    }

    /// Abort the in-flight read, if any. Returns the aborted request.
    pub fn abort_in_flight(&mut self) -> Option<RequestId> {
        let (id, handle) = {
            let mut shared = self.shared.lock();
            let id = shared.current.take()?;
            (id, shared.handle.take())
        };

        if let Some(handle) = handle {
            self.protocol.abort(&handle);
        }
        tracing::debug!(request = %id, "Aborted superseded read");
        self.emit(LoadEvent::Ended {
            request: id,
            outcome: LoadOutcome::Aborted,
        });

        Some(id)
    }

    fn completion_handler(&self, id: RequestId) -> CompletionHandler {
        let shared = Arc::clone(&self.shared);
        let sink = Arc::clone(&self.sink);
        let events = self.events.clone();

        Box::new(move |response: ReadResponse| {
            let outcome = match response.status {
                ReadStatus::Success => {
                    let count = response.features.len();
                    sink.replace(response.features);
                    LoadOutcome::Completed { features: count }
                }
                ReadStatus::Failure(reason) => {
                    sink.clear();
                    shared.lock().bounds_stale = true;
                    tracing::warn!(request = %id, reason = %reason, "Read failed");
                    LoadOutcome::Failed { reason }
                }
            };

            {
                let mut shared = shared.lock();
                if shared.current == Some(id) {
                    shared.current = None;
                    shared.handle = None;
                }
            }

            tracing::debug!(request = %id, ?outcome, "Read completed");
            let _ = events.send(LoadEvent::Ended {
                request: id,
                outcome,
            });
        })
    }

    fn emit(&self, event: LoadEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}
