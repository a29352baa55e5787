//! Incremental-loading accumulator over an offset-paginated source.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::types::Page;

/// A fetchable offset-paginated sequence.
#[async_trait]
pub trait PageSource<T>: Send + Sync {
    /// Fetch one page at `skip`, together with the server-reported total.
    async fn fetch_page(&self, skip: usize, limit: usize) -> Result<Page<T>, GatewayError>;
}

/// Point-in-time view of a collection, for rendering.
#[derive(Debug, Clone)]
pub struct PageSnapshot<T> {
    pub items: Vec<T>,
    /// Next offset to request. Advances by the page size per successful
    /// load, regardless of how many items the page actually contained.
    pub skip: usize,
    /// Server-reported total for the query, from the latest response.
    pub total: usize,
    pub loading: bool,
}

impl<T> PageSnapshot<T> {
    /// Terminal pagination state: the accumulated items cover the total.
    pub fn all_loaded(&self) -> bool {
        self.items.len() >= self.total
    }
}

struct Inner<T> {
    items: Vec<T>,
    skip: usize,
    total: usize,
    /// Generation of the request currently in flight, if any.
    in_flight: Option<u64>,
    /// Monotonically increasing request generation. A response is applied
    /// only if its generation is still the one in flight when it resolves;
    /// anything else is a stale response and is discarded.
    generation: u64,
}

impl<T> Default for Inner<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            skip: 0,
            total: 0,
            in_flight: None,
            generation: 0,
        }
    }
}

/// Growing ordered sequence of items loaded page by page.
///
/// `reset` starts over from offset zero, `load_more` appends the next page.
/// Concurrent requests on one instance are resolved last-request-wins: a
/// newer `reset` invalidates whatever was in flight, and the stale response
/// is dropped when it arrives. Errors leave `items`/`skip`/`total` untouched
/// and always clear the in-flight flag so the caller can retry.
pub struct PagedCollection<T> {
    source: Arc<dyn PageSource<T>>,
    page_size: usize,
    /// Optional duplicate suppression by item key. Last line of defense for
    /// misbehaving servers; correctness comes from never re-requesting a
    /// consumed page.
    item_key: Option<Box<dyn Fn(&T) -> String + Send + Sync>>,
    state: Mutex<Inner<T>>,
}

impl<T: Clone> PagedCollection<T> {
    pub fn new(source: Arc<dyn PageSource<T>>, page_size: usize) -> Self {
        Self {
            source,
            page_size,
            item_key: None,
            state: Mutex::new(Inner::default()),
        }
    }

    /// Enable duplicate suppression keyed by `key`.
    pub fn with_item_key(
        mut self,
        key: impl Fn(&T) -> String + Send + Sync + 'static,
    ) -> Self {
        self.item_key = Some(Box::new(key));
        self
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn snapshot(&self) -> PageSnapshot<T> {
        let state = self.state.lock().unwrap();
        PageSnapshot {
            items: state.items.clone(),
            skip: state.skip,
            total: state.total,
            loading: state.in_flight.is_some(),
        }
    }

    pub fn items(&self) -> Vec<T> {
        self.state.lock().unwrap().items.clone()
    }

    pub fn total(&self) -> usize {
        self.state.lock().unwrap().total
    }

    pub fn skip(&self) -> usize {
        self.state.lock().unwrap().skip
    }

    pub fn loading(&self) -> bool {
        self.state.lock().unwrap().in_flight.is_some()
    }

    pub fn all_loaded(&self) -> bool {
        let state = self.state.lock().unwrap();
        state.items.len() >= state.total
    }

    /// Discard current items and load the first page.
    ///
    /// A stale response (one superseded by a newer request before it
    /// resolved) is discarded silently: the state it would describe is no
    /// longer wanted by anyone.
    pub async fn reset(&self) -> Result<(), GatewayError> {
        let my_generation = {
            let mut state = self.state.lock().unwrap();
            state.generation += 1;
            state.in_flight = Some(state.generation);
            state.generation
        };

        let result = self.source.fetch_page(0, self.page_size).await;

        let mut state = self.state.lock().unwrap();
        if state.in_flight != Some(my_generation) {
            tracing::debug!(generation = my_generation, "stale reset response discarded");
            return Ok(());
        }
        state.in_flight = None;
        let page = result?;

        tracing::debug!(total = page.total, count = page.results.len(), "reset loaded");
        state.items = self.deduped(&[], page.results);
        state.total = page.total;
        state.skip = self.page_size;
        Ok(())
    }

    /// Fetch and append the next page. Returns `Ok(false)` without a network
    /// call when everything is already loaded, a load is in flight, or the
    /// response turned out to be stale.
    pub async fn load_more(&self) -> Result<bool, GatewayError> {
        let (my_generation, at) = {
            let mut state = self.state.lock().unwrap();
            if state.in_flight.is_some() || state.items.len() >= state.total {
                return Ok(false);
            }
            state.generation += 1;
            state.in_flight = Some(state.generation);
            (state.generation, state.skip)
        };

        let result = self.source.fetch_page(at, self.page_size).await;

        let mut state = self.state.lock().unwrap();
        if state.in_flight != Some(my_generation) {
            tracing::debug!(generation = my_generation, "stale page response discarded");
            return Ok(false);
        }
        state.in_flight = None;
        let page = result?;

        tracing::debug!(
            skip = at,
            total = page.total,
            count = page.results.len(),
            "page loaded"
        );
        // Request-based cursor: advance by the page size even when the
        // server returned a short or empty page, or the list end would
        // retry the same offset forever.
        state.total = page.total;
        state.skip = at + self.page_size;
        let fresh = self.deduped(&state.items, page.results);
        state.items.extend(fresh);
        Ok(true)
    }

    fn deduped(&self, existing: &[T], incoming: Vec<T>) -> Vec<T> {
        match &self.item_key {
            None => incoming,
            Some(key) => {
                let mut seen: HashSet<String> = existing.iter().map(|item| key(item)).collect();
                incoming
                    .into_iter()
                    .filter(|item| seen.insert(key(item)))
                    .collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::sync::Semaphore;

    /// Pages over a fixed list of ids.
    struct VecSource {
        items: Vec<String>,
        calls: AtomicUsize,
    }

    impl VecSource {
        fn new(count: usize) -> Arc<Self> {
            Arc::new(Self {
                items: (0..count).map(|i| format!("item-{i:02}")).collect(),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl PageSource<String> for VecSource {
        async fn fetch_page(&self, skip: usize, limit: usize) -> Result<Page<String>, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Page {
                results: self.items.iter().skip(skip).take(limit).cloned().collect(),
                total: self.items.len(),
            })
        }
    }

    /// Fails the first call, then delegates to a fixed list.
    struct FlakySource {
        inner: Arc<VecSource>,
        failed: AtomicBool,
    }

    #[async_trait]
    impl PageSource<String> for FlakySource {
        async fn fetch_page(&self, skip: usize, limit: usize) -> Result<Page<String>, GatewayError> {
            if !self.failed.swap(true, Ordering::SeqCst) {
                return Err(GatewayError::Transport("connection refused".to_string()));
            }
            self.inner.fetch_page(skip, limit).await
        }
    }

    /// Blocks calls at a given offset until released.
    struct GatedSource {
        inner: Arc<VecSource>,
        gated_skip: usize,
        gate: Semaphore,
        entered: AtomicBool,
    }

    impl GatedSource {
        fn new(inner: Arc<VecSource>, gated_skip: usize) -> Arc<Self> {
            Arc::new(Self {
                inner,
                gated_skip,
                gate: Semaphore::new(0),
                entered: AtomicBool::new(false),
            })
        }

        async fn wait_entered(&self) {
            while !self.entered.load(Ordering::SeqCst) {
                tokio::task::yield_now().await;
            }
        }
    }

    #[async_trait]
    impl PageSource<String> for GatedSource {
        async fn fetch_page(&self, skip: usize, limit: usize) -> Result<Page<String>, GatewayError> {
            if skip == self.gated_skip {
                self.entered.store(true, Ordering::SeqCst);
                if let Ok(permit) = self.gate.acquire().await {
                    permit.forget();
                }
            }
            self.inner.fetch_page(skip, limit).await
        }
    }

    /// Reports a large total but returns short pages.
    struct ShortPageSource;

    #[async_trait]
    impl PageSource<String> for ShortPageSource {
        async fn fetch_page(&self, skip: usize, _limit: usize) -> Result<Page<String>, GatewayError> {
            let results = if skip < 40 {
                vec![format!("only-{skip}")]
            } else {
                Vec::new()
            };
            Ok(Page { results, total: 50 })
        }
    }

    /// Total shrinks below the accumulated count after the first page.
    struct ShrinkingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PageSource<String> for ShrinkingSource {
        async fn fetch_page(&self, skip: usize, limit: usize) -> Result<Page<String>, GatewayError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let total = if call == 0 { 40 } else { 5 };
            Ok(Page {
                results: (skip..skip + limit).map(|i| format!("item-{i:02}")).collect(),
                total,
            })
        }
    }

    #[tokio::test]
    async fn reset_then_load_more_accumulates_in_order() {
        let source = VecSource::new(45);
        let col = PagedCollection::new(source.clone(), 20);

        col.reset().await.unwrap();
        assert_eq!(col.items().len(), 20);
        assert_eq!(col.skip(), 20);
        assert_eq!(col.total(), 45);
        assert!(!col.all_loaded());

        assert!(col.load_more().await.unwrap());
        assert!(col.load_more().await.unwrap());
        let snapshot = col.snapshot();
        assert_eq!(snapshot.items.len(), 45);
        assert_eq!(snapshot.skip, 60);
        assert!(snapshot.all_loaded());
        assert_eq!(snapshot.items[0], "item-00");
        assert_eq!(snapshot.items[44], "item-44");
    }

    #[tokio::test]
    async fn load_more_is_noop_when_all_loaded() {
        let source = VecSource::new(10);
        let col = PagedCollection::new(source.clone(), 20);
        col.reset().await.unwrap();
        assert!(col.all_loaded());

        assert!(!col.load_more().await.unwrap());
        // Only the reset hit the source.
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn load_more_before_any_reset_is_noop() {
        let source = VecSource::new(10);
        let col = PagedCollection::new(source.clone(), 20);
        assert!(!col.load_more().await.unwrap());
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn reset_is_idempotent_in_effect() {
        let source = VecSource::new(30);
        let col = PagedCollection::new(source.clone(), 20);
        col.reset().await.unwrap();
        let first = col.snapshot();
        col.reset().await.unwrap();
        let second = col.snapshot();
        assert_eq!(first.items, second.items);
        assert_eq!(first.total, second.total);
        assert_eq!(first.skip, second.skip);
    }

    #[tokio::test]
    async fn error_leaves_state_unchanged_and_retry_works() {
        let inner = VecSource::new(25);
        let source = Arc::new(FlakySource {
            inner,
            failed: AtomicBool::new(false),
        });
        let col = PagedCollection::new(source, 20);

        let err = col.reset().await.unwrap_err();
        assert!(matches!(err, GatewayError::Transport(_)));
        let snapshot = col.snapshot();
        assert!(snapshot.items.is_empty());
        assert_eq!(snapshot.skip, 0);
        assert_eq!(snapshot.total, 0);
        assert!(!snapshot.loading);

        // In-flight flag was cleared, so the retry goes through.
        col.reset().await.unwrap();
        assert_eq!(col.items().len(), 20);
    }

    #[tokio::test]
    async fn cursor_advances_by_page_size_on_short_pages() {
        let col = PagedCollection::new(Arc::new(ShortPageSource), 20);
        col.reset().await.unwrap();
        assert_eq!(col.items().len(), 1);
        assert_eq!(col.skip(), 20);

        col.load_more().await.unwrap();
        assert_eq!(col.skip(), 40);

        // Empty page at the end still advances the cursor; no infinite
        // retry of the same offset.
        col.load_more().await.unwrap();
        assert_eq!(col.skip(), 60);
        assert_eq!(col.items().len(), 2);
    }

    #[tokio::test]
    async fn shrinking_total_reads_as_all_loaded() {
        let col = PagedCollection::new(
            Arc::new(ShrinkingSource {
                calls: AtomicUsize::new(0),
            }),
            20,
        );
        col.reset().await.unwrap();
        assert!(!col.all_loaded());
        col.load_more().await.unwrap();
        // 40 items accumulated, total now reports 5.
        assert_eq!(col.items().len(), 40);
        assert_eq!(col.total(), 5);
        assert!(col.all_loaded());
        assert!(!col.load_more().await.unwrap());
    }

    #[tokio::test]
    async fn reset_supersedes_in_flight_load_more() {
        let inner = VecSource::new(45);
        let source = GatedSource::new(inner, 20);
        let col = Arc::new(PagedCollection::new(source.clone(), 20));
        col.reset().await.unwrap();

        let background = {
            let col = col.clone();
            tokio::spawn(async move { col.load_more().await })
        };
        source.wait_entered().await;
        assert!(col.loading());

        // A newer reset takes over while the page load is stuck in flight.
        col.reset().await.unwrap();
        source.gate.add_permits(1);
        let applied = background.await.unwrap().unwrap();
        assert!(!applied);

        let snapshot = col.snapshot();
        assert_eq!(snapshot.items.len(), 20, "stale page must not be appended");
        assert_eq!(snapshot.skip, 20);
        assert!(!snapshot.loading);
    }

    #[tokio::test]
    async fn load_more_while_loading_is_noop() {
        let inner = VecSource::new(45);
        let source = GatedSource::new(inner, 20);
        let col = Arc::new(PagedCollection::new(source.clone(), 20));
        col.reset().await.unwrap();

        let background = {
            let col = col.clone();
            tokio::spawn(async move { col.load_more().await })
        };
        source.wait_entered().await;

        assert!(!col.load_more().await.unwrap());

        source.gate.add_permits(1);
        assert!(background.await.unwrap().unwrap());
        assert_eq!(col.items().len(), 40);
    }

    #[tokio::test]
    async fn item_key_suppresses_duplicates() {
        struct OverlappingSource;

        #[async_trait]
        impl PageSource<String> for OverlappingSource {
            async fn fetch_page(
                &self,
                skip: usize,
                _limit: usize,
            ) -> Result<Page<String>, GatewayError> {
                // Misbehaving server: the second page overlaps the first.
                let results = if skip == 0 {
                    vec!["a".to_string(), "b".to_string()]
                } else {
                    vec!["b".to_string(), "c".to_string()]
                };
                Ok(Page { results, total: 3 })
            }
        }

        let col = PagedCollection::new(Arc::new(OverlappingSource), 2)
            .with_item_key(|item: &String| item.clone());
        col.reset().await.unwrap();
        col.load_more().await.unwrap();
        assert_eq!(col.items(), ["a", "b", "c"]);
    }
}
