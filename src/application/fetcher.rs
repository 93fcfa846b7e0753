//! Cached, deduplicated list fetching.
//!
//! Responses are cached per request tuple (endpoint, page, page size and the
//! schema-filtered parameters). Concurrent callers asking for the same tuple
//! share one in-flight request. Failures are never cached and never retried.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use backoffice_api_types::PageEnvelope;
use dashmap::DashMap;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use lru::LruCache;
use metrics::{counter, histogram};
use serde_json::Value;
use tokio::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

use crate::application::error::ApiError;
use crate::application::pagination::{PageCursor, ResultPage, paginate_flat};
use crate::application::params::ParamSet;
use crate::application::transport::Transport;
use crate::config::CacheSettings;
use crate::domain::resources::{PAGE_KEY, Resource, ResourceSpec, ResponseShape};
use crate::infra::lock::mutex_lock;
use crate::infra::telemetry::{LIST_CACHE_HIT, LIST_CACHE_MISS, LIST_DEDUP, LIST_FETCH_MS};

const SOURCE: &str = "application::fetcher";
const PAGE_SIZE_PARAM: &str = "pageSize";
const PAGE_NUMBER_PARAM: &str = "pageNumber";

/// The request tuple identifying one list page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListQuery {
    pub endpoint: &'static str,
    pub shape: ResponseShape,
    pub page: PageCursor,
    pub page_size: u32,
    /// Only keys declared in the resource's filter schema.
    pub filters: BTreeMap<String, String>,
}

impl ListQuery {
    pub fn for_resource(spec: &ResourceSpec, params: &ParamSet) -> Self {
        let filters = params
            .iter()
            .filter(|(key, _)| *key != PAGE_KEY && spec.accepts(key))
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Self {
            endpoint: spec.endpoint,
            shape: spec.shape,
            page: params.page(),
            page_size: spec.page_size,
            filters,
        }
    }

    /// Query pairs sent to the server. Unpaged endpoints receive filters only.
    pub fn wire_params(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(self.filters.len() + 2);
        if self.shape == ResponseShape::Paged {
            pairs.push((PAGE_SIZE_PARAM.to_string(), self.page_size.to_string()));
            pairs.push((
                PAGE_NUMBER_PARAM.to_string(),
                self.page.page_index().to_string(),
            ));
        }
        pairs.extend(
            self.filters
                .iter()
                .map(|(key, value)| (key.clone(), value.clone())),
        );
        pairs
    }

    /// Key of the network request backing this page. Every page of an unpaged
    /// endpoint is served by the same request.
    fn request_key(&self) -> Self {
        match self.shape {
            ResponseShape::Paged => self.clone(),
            ResponseShape::Flat => Self {
                page: PageCursor::FIRST,
                ..self.clone()
            },
        }
    }
}

/// Normalized response body, before per-page materialization.
#[derive(Debug, Clone, PartialEq)]
enum RawList {
    Paged {
        content: Vec<Value>,
        total_elements: u64,
        echoed_index: Option<u32>,
    },
    Flat(Vec<Value>),
}

impl RawList {
    fn decode(body: Value) -> Result<Self, ApiError> {
        match body {
            Value::Array(items) => Ok(Self::Flat(items)),
            Value::Object(_) => {
                let envelope: PageEnvelope<Value> = serde_json::from_value(body)
                    .map_err(|err| ApiError::Decode(err.to_string()))?;
                let echoed_index = envelope.echoed_index();
                let total_elements = envelope
                    .total_elements
                    .unwrap_or(envelope.content.len() as u64);
                Ok(Self::Paged {
                    content: envelope.content,
                    total_elements,
                    echoed_index,
                })
            }
            other => Err(ApiError::Decode(format!(
                "expected a page envelope or an array, got {}",
                json_kind(&other)
            ))),
        }
    }

    fn materialize(&self, query: &ListQuery) -> ResultPage<Value> {
        match self {
            Self::Paged {
                content,
                total_elements,
                echoed_index,
            } => ResultPage {
                content: content.clone(),
                total_elements: *total_elements,
                page_number: echoed_index.map_or(query.page, PageCursor::from_index),
            },
            Self::Flat(items) => paginate_flat(items, query.page, query.page_size),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

struct CachedList {
    body: Arc<RawList>,
    fetched_at: Instant,
}

type SharedFetch = Shared<BoxFuture<'static, Result<Arc<RawList>, ApiError>>>;

/// A request in progress, tagged with the endpoint generation it started in.
struct InFlight {
    generation: u64,
    fetch: SharedFetch,
}

struct FetcherInner<T> {
    transport: Arc<T>,
    cache: Mutex<LruCache<ListQuery, CachedList>>,
    in_flight: DashMap<ListQuery, InFlight>,
    /// Bumped by every invalidation; results from an older generation are not cached.
    generations: DashMap<String, u64>,
    stale_after: Duration,
}

/// Fetches list pages through a [`Transport`], sharing cache and in-flight
/// requests across every clone.
pub struct ListFetcher<T> {
    inner: Arc<FetcherInner<T>>,
}

impl<T> Clone for ListFetcher<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Transport> ListFetcher<T> {
    pub fn new(transport: Arc<T>, settings: &CacheSettings) -> Self {
        Self {
            inner: Arc::new(FetcherInner {
                transport,
                cache: Mutex::new(LruCache::new(settings.capacity)),
                in_flight: DashMap::new(),
                generations: DashMap::new(),
                stale_after: settings.stale_after,
            }),
        }
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.inner.transport
    }

    /// Fetch the page of `R` selected by `params`, decoded into records.
    pub async fn fetch<R: Resource>(
        &self,
        params: &ParamSet,
    ) -> Result<ResultPage<R::Record>, ApiError> {
        let query = ListQuery::for_resource(&R::SPEC, params);
        self.fetch_query(&query)
            .await?
            .try_map(serde_json::from_value::<R::Record>)
            .map_err(|err| ApiError::Decode(format!("{} record: {err}", R::SPEC.name)))
    }

    #[instrument(skip(self), fields(endpoint = query.endpoint, page = %query.page))]
    pub async fn fetch_query(&self, query: &ListQuery) -> Result<ResultPage<Value>, ApiError> {
        let key = query.request_key();

        if let Some(body) = self.fresh(&key) {
            counter!(LIST_CACHE_HIT, "endpoint" => key.endpoint).increment(1);
            debug!("served from cache");
            return Ok(body.materialize(query));
        }

        let body = self.join_or_start(key).await?;
        Ok(body.materialize(query))
    }

    /// Drop every cached page of `endpoint`, e.g. after a write.
    ///
    /// Requests already in flight still answer their callers but are no
    /// longer joined or cached.
    pub fn invalidate(&self, endpoint: &str) -> usize {
        *self
            .inner
            .generations
            .entry(endpoint.to_string())
            .or_insert(0) += 1;
        self.inner
            .in_flight
            .retain(|key, _| key.endpoint != endpoint);

        let mut cache = mutex_lock(&self.inner.cache, SOURCE, "invalidate");
        let stale: Vec<ListQuery> = cache
            .iter()
            .filter(|(key, _)| key.endpoint == endpoint)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &stale {
            cache.pop(key);
        }
        debug!(endpoint, evicted = stale.len(), "invalidated list cache");
        stale.len()
    }

    pub fn cached_len(&self) -> usize {
        mutex_lock(&self.inner.cache, SOURCE, "cached_len").len()
    }

    fn fresh(&self, key: &ListQuery) -> Option<Arc<RawList>> {
        let mut cache = mutex_lock(&self.inner.cache, SOURCE, "fresh");
        let expired = match cache.get(key) {
            Some(entry) if entry.fetched_at.elapsed() < self.inner.stale_after => {
                return Some(Arc::clone(&entry.body));
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            cache.pop(key);
        }
        None
    }

    fn join_or_start(&self, key: ListQuery) -> SharedFetch {
        use dashmap::mapref::entry::Entry;

        match self.inner.in_flight.entry(key.clone()) {
            Entry::Occupied(occupied) => {
                counter!(LIST_DEDUP, "endpoint" => key.endpoint).increment(1);
                debug!("joined in-flight request");
                occupied.get().fetch.clone()
            }
            Entry::Vacant(vacant) => {
                counter!(LIST_CACHE_MISS, "endpoint" => key.endpoint).increment(1);
                let generation = self.inner.generation(key.endpoint);
                let inner = Arc::clone(&self.inner);
                let fetch = async move { inner.load(key, generation).await }
                    .boxed()
                    .shared();
                vacant.insert(InFlight {
                    generation,
                    fetch: fetch.clone(),
                });
                fetch
            }
        }
    }
}

impl<T> FetcherInner<T> {
    fn generation(&self, endpoint: &str) -> u64 {
        self.generations.get(endpoint).map_or(0, |generation| *generation)
    }
}

impl<T: Transport> FetcherInner<T> {
    async fn load(&self, key: ListQuery, generation: u64) -> Result<Arc<RawList>, ApiError> {
        let started = Instant::now();
        let result = self
            .transport
            .get_json(key.endpoint, &key.wire_params())
            .await
            .and_then(RawList::decode)
            .map(Arc::new);
        histogram!(LIST_FETCH_MS, "endpoint" => key.endpoint)
            .record(started.elapsed().as_secs_f64() * 1000.0);

        match &result {
            Ok(body) => {
                let mut cache = mutex_lock(&self.cache, SOURCE, "store");
                if self.generation(key.endpoint) == generation {
                    cache.put(
                        key.clone(),
                        CachedList {
                            body: Arc::clone(body),
                            fetched_at: Instant::now(),
                        },
                    );
                } else {
                    debug!(endpoint = key.endpoint, "invalidated while in flight; not cached");
                }
            }
            Err(err) => warn!(endpoint = key.endpoint, error = %err, "list request failed"),
        }

        // Cached before leaving the in-flight map so late callers always find one of the two.
        self.in_flight
            .remove_if(&key, |_, flight| flight.generation == generation);
        result
    }
}
