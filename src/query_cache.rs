use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};
use tokio::{
    sync::{broadcast, Mutex as AsyncMutex},
    time::Instant,
};

use crate::{
    api::{ApiError, RemindersApi},
    models::{ListParams, ReminderList, ReminderStats},
};

/// How long an unused entry is kept before it may be dropped.
const GC_TIME: Duration = Duration::from_secs(300);

/// What a cached query is keyed by: the entity kind plus its active filters.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Reminders(ListParams),
    Stats,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QueryKind {
    Reminders,
    Stats,
}

#[derive(Debug)]
struct Entry<T> {
    value: T,
    fetched_at: Instant,
    invalidated: bool,
}

// Held across the fetch, so concurrent readers of one key wait for a single request.
type Slot<T> = Arc<AsyncMutex<Option<Entry<T>>>>;

struct ListSlot {
    slot: Slot<ReminderList>,
    last_used: Instant,
}

struct Inner {
    api: RemindersApi,
    stale_time: Duration,
    gc_time: Duration,
    reminders: Mutex<HashMap<ListParams, ListSlot>>,
    stats: Slot<ReminderStats>,
    invalidations: broadcast::Sender<QueryKind>,
}

/// Read-through cache of the reminders API, keyed by query.
///
/// Mutations never write into it: they call [`QueryCache::invalidate`] after
/// the server confirmed the change, and the next read goes back to the server.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<Inner>,
}

impl QueryCache {
    pub fn new(api: RemindersApi, stale_time: Duration) -> Self {
        Self::with_gc_time(api, stale_time, GC_TIME)
    }

    fn with_gc_time(api: RemindersApi, stale_time: Duration, gc_time: Duration) -> Self {
        let (invalidations, _) = broadcast::channel(16);

        QueryCache {
            inner: Arc::new(Inner {
                api,
                stale_time,
                gc_time,
                reminders: Mutex::new(HashMap::new()),
                stats: Slot::default(),
                invalidations,
            }),
        }
    }

    pub fn api(&self) -> &RemindersApi {
        &self.inner.api
    }

    pub async fn reminders(&self, params: &ListParams) -> Result<ReminderList, ApiError> {
        let slot = self.reminders_slot(params);
        let key = QueryKey::Reminders(params.clone());

        self.read(&slot, &key, || self.inner.api.list(params)).await
    }

    pub async fn stats(&self) -> Result<ReminderStats, ApiError> {
        self.read(&self.inner.stats, &QueryKey::Stats, || self.inner.api.stats())
            .await
    }

    /// Marks every entry of `kind` stale and tells live views to refetch.
    pub async fn invalidate(&self, kind: QueryKind) {
        match kind {
            QueryKind::Reminders => {
                let slots: Vec<Slot<ReminderList>> = self
                    .reminder_slots()
                    .values()
                    .map(|list| list.slot.clone())
                    .collect();

                for slot in slots {
                    mark_invalidated(&slot).await;
                }
            }
            QueryKind::Stats => mark_invalidated(&self.inner.stats).await,
        }

        log::debug!("Invalidated {:?} queries", kind);

        // Nobody listening just means no live views are open.
        let _ = self.inner.invalidations.send(kind);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueryKind> {
        self.inner.invalidations.subscribe()
    }

    async fn read<T, F, Fut>(&self, slot: &Slot<T>, key: &QueryKey, fetch: F) -> Result<T, ApiError>
    where
        T: Clone,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let requested_at = Instant::now();
        let mut entry = slot.lock().await;

        if let Some(existing) = entry.as_ref() {
            let fresh = existing.fetched_at.elapsed() < self.inner.stale_time;
            let fetched_while_waiting = existing.fetched_at >= requested_at;

            if !existing.invalidated && (fresh || fetched_while_waiting) {
                log::trace!("Serving {:?} from cache", key);
                return Ok(existing.value.clone());
            }
        }

        log::debug!("Fetching {:?}", key);

        let value = fetch().await?;

        *entry = Some(Entry {
            value: value.clone(),
            fetched_at: Instant::now(),
            invalidated: false,
        });

        Ok(value)
    }

    fn reminders_slot(&self, params: &ListParams) -> Slot<ReminderList> {
        let mut slots = self.reminder_slots();

        if let Some(list) = slots.get_mut(params) {
            list.last_used = Instant::now();
            return list.slot.clone();
        }

        // Searches mint a new key per term, fetched or failed; drop the ones
        // nobody has asked for lately. A locked slot is mid-fetch and stays.
        let gc_time = self.inner.gc_time;
        slots.retain(|_, list| {
            list.last_used.elapsed() < gc_time || list.slot.try_lock().is_err()
        });

        let slot = Slot::default();
        slots.insert(
            params.clone(),
            ListSlot {
                slot: slot.clone(),
                last_used: Instant::now(),
            },
        );
        slot
    }

    fn reminder_slots(&self) -> MutexGuard<'_, HashMap<ListParams, ListSlot>> {
        self.inner
            .reminders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

async fn mark_invalidated<T>(slot: &Slot<T>) {
    if let Some(entry) = slot.lock().await.as_mut() {
        entry.invalidated = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StatusFilter;
    use serde_json::json;
    use url::Url;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn stats_body(total: u64) -> serde_json::Value {
        json!({ "total": total, "scheduled": total, "completed": 0, "failed": 0, "in_progress": 0 })
    }

    fn empty_list() -> serde_json::Value {
        json!({ "items": [], "total": 0, "page": 1, "page_size": 50, "total_pages": 0 })
    }

    fn cache_for(server: &MockServer, stale_time: Duration) -> QueryCache {
        QueryCache::new(
            RemindersApi::new(Url::parse(&server.uri()).unwrap()),
            stale_time,
        )
    }

    #[tokio::test]
    async fn concurrent_reads_share_one_request() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/stats"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(stats_body(3))
                    .set_delay(Duration::from_millis(200)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let cache = cache_for(&server, Duration::ZERO);
        let (first, second) = tokio::join!(cache.stats(), cache.stats());

        assert_eq!(first.unwrap().total, 3);
        assert_eq!(second.unwrap().total, 3);
    }

    #[tokio::test]
    async fn fresh_entries_are_served_without_a_request() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/reminders"))
            .respond_with(ResponseTemplate::new(200).set_body_json(empty_list()))
            .expect(1)
            .mount(&server)
            .await;

        let cache = cache_for(&server, Duration::from_secs(60));
        let params = ListParams::for_dashboard(StatusFilter::All, "");

        cache.reminders(&params).await.unwrap();
        cache.reminders(&params).await.unwrap();
    }

    #[tokio::test]
    async fn stale_entries_are_refetched() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/stats"))
            .respond_with(ResponseTemplate::new(200).set_body_json(stats_body(1)))
            .expect(2)
            .mount(&server)
            .await;

        let cache = cache_for(&server, Duration::ZERO);

        cache.stats().await.unwrap();
        cache.stats().await.unwrap();
    }

    #[tokio::test]
    async fn invalidation_is_per_kind_and_broadcast() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/reminders"))
            .respond_with(ResponseTemplate::new(200).set_body_json(empty_list()))
            .expect(2)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/stats"))
            .respond_with(ResponseTemplate::new(200).set_body_json(stats_body(1)))
            .expect(1)
            .mount(&server)
            .await;

        let cache = cache_for(&server, Duration::from_secs(60));
        let mut invalidations = cache.subscribe();
        let params = ListParams::for_dashboard(StatusFilter::All, "");

        cache.reminders(&params).await.unwrap();
        cache.stats().await.unwrap();

        cache.invalidate(QueryKind::Reminders).await;
        assert_eq!(invalidations.recv().await.unwrap(), QueryKind::Reminders);

        cache.reminders(&params).await.unwrap();
        cache.stats().await.unwrap();
    }

    #[tokio::test]
    async fn failed_refetch_keeps_entry_stale() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/stats"))
            .respond_with(ResponseTemplate::new(200).set_body_json(stats_body(1)))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/stats"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/stats"))
            .respond_with(ResponseTemplate::new(200).set_body_json(stats_body(2)))
            .mount(&server)
            .await;

        let cache = cache_for(&server, Duration::from_secs(60));

        assert_eq!(cache.stats().await.unwrap().total, 1);

        cache.invalidate(QueryKind::Stats).await;

        assert_eq!(cache.stats().await.unwrap_err().status(), Some(500));
        assert_eq!(cache.stats().await.unwrap().total, 2);
    }

    #[tokio::test]
    async fn failed_search_keys_are_collected() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/reminders"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let cache = QueryCache::with_gc_time(
            RemindersApi::new(Url::parse(&server.uri()).unwrap()),
            Duration::ZERO,
            Duration::ZERO,
        );

        for term in 0..20 {
            let params = ListParams::for_dashboard(StatusFilter::All, &format!("term {}", term));
            assert!(cache.reminders(&params).await.is_err());
        }

        assert_eq!(cache.reminder_slots().len(), 1);
    }

    #[tokio::test]
    async fn recently_used_keys_survive_collection() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/reminders"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let cache = cache_for(&server, Duration::ZERO);

        for term in ["a", "b", "c"] {
            let params = ListParams::for_dashboard(StatusFilter::All, term);
            assert!(cache.reminders(&params).await.is_err());
        }

        assert_eq!(cache.reminder_slots().len(), 3);
    }
}
