//! In-memory banter cache with optimistic inserts and background persistence.
//!
//! Mutations apply to the in-memory list before the call returns and notify
//! every subscriber. The post-mutation snapshot is then queued for a single
//! writer task, which saves only the newest queued snapshot, so the durable
//! file lags the cache but never goes backwards.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot, watch};

use crate::types::{Banter, BanterError, BanterPatch, BanterResult};

/// Destination for cache snapshots. Implementations absorb their own failures.
#[async_trait]
pub trait BanterSink: Send + Sync {
    async fn save(&self, banters: &[Banter]);
}

enum WriterMsg {
    Snapshot(Vec<Banter>),
    Flush(oneshot::Sender<()>),
}

/// The ordered, observable collection of banters (newest first).
#[derive(Clone)]
pub struct BanterCache {
    inner: Arc<Inner>,
}

struct Inner {
    state: watch::Sender<Vec<Banter>>,
    writer: Option<mpsc::UnboundedSender<WriterMsg>>,
}

impl BanterCache {
    /// Cache persisted through `sink`. Must be called inside a tokio runtime.
    pub fn new(sink: Arc<dyn BanterSink>) -> Self {
        Self::with_banters(Vec::new(), sink)
    }

    /// Cache seeded with `banters` and persisted through `sink`.
    pub fn with_banters(banters: Vec<Banter>, sink: Arc<dyn BanterSink>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(rx, sink));
        Self::build(banters, Some(tx))
    }

    /// Cache without any persistence.
    pub fn in_memory() -> Self {
        Self::build(Vec::new(), None)
    }

    fn build(banters: Vec<Banter>, writer: Option<mpsc::UnboundedSender<WriterMsg>>) -> Self {
        let (state, _) = watch::channel(banters);
        Self {
            inner: Arc::new(Inner { state, writer }),
        }
    }

    /// Prepend a freshly submitted banter.
    pub fn insert_optimistic(&self, banter: Banter) -> BanterResult<()> {
        let id = banter.id.clone();
        let inserted = self.inner.state.send_if_modified(|list| {
            if list.iter().any(|b| b.id == banter.id) {
                return false;
            }
            list.insert(0, banter);
            self.persist(list);
            true
        });

        if !inserted {
            return Err(BanterError::DuplicateBanter(id));
        }
        tracing::debug!(id = %id, "Inserted optimistic banter");
        Ok(())
    }

    /// Merge `patch` into the banter with `id` and return its new value.
    pub fn update(&self, id: &str, patch: BanterPatch) -> BanterResult<Banter> {
        let mut updated = None;
        self.inner.state.send_if_modified(|list| {
            match list.iter_mut().find(|b| b.id == id) {
                Some(banter) => {
                    banter.apply(patch);
                    updated = Some(banter.clone());
                }
                None => return false,
            }
            self.persist(list);
            true
        });

        let banter = updated.ok_or_else(|| BanterError::BanterNotFound(id.to_string()))?;
        tracing::debug!(id, is_generating = banter.is_generating, "Updated banter");
        Ok(banter)
    }

    /// Copy of the current list.
    pub fn snapshot(&self) -> Vec<Banter> {
        self.inner.state.borrow().clone()
    }

    pub fn get(&self, id: &str) -> Option<Banter> {
        self.inner.state.borrow().iter().find(|b| b.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.state.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.state.borrow().is_empty()
    }

    /// Receiver notified after every mutation.
    pub fn subscribe(&self) -> watch::Receiver<Vec<Banter>> {
        self.inner.state.subscribe()
    }

    /// Wait until every snapshot queued before this call has been saved.
    pub async fn flush(&self) {
        let Some(writer) = &self.inner.writer else {
            return;
        };
        let (ack_tx, ack_rx) = oneshot::channel();
        if writer.send(WriterMsg::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
    }

    /// Queue `list` for saving. Called while the state lock is held, so
    /// snapshots reach the writer in mutation order.
    fn persist(&self, list: &[Banter]) {
        if let Some(writer) = &self.inner.writer {
            if writer.send(WriterMsg::Snapshot(list.to_vec())).is_err() {
                tracing::warn!("Banter writer has stopped; snapshot not persisted");
            }
        }
    }
}

/// Single writer: saves snapshots in order, skipping any that a newer one supersedes.
async fn run_writer(mut rx: mpsc::UnboundedReceiver<WriterMsg>, sink: Arc<dyn BanterSink>) {
    while let Some(msg) = rx.recv().await {
        let mut latest = None;
        let mut acks = Vec::new();
        collect(msg, &mut latest, &mut acks);
        while let Ok(msg) = rx.try_recv() {
            collect(msg, &mut latest, &mut acks);
        }

        if let Some(snapshot) = latest {
            sink.save(&snapshot).await;
        }
        for ack in acks {
            let _ = ack.send(());
        }
    }
    tracing::debug!("Banter writer stopped");
}

fn collect(msg: WriterMsg, latest: &mut Option<Vec<Banter>>, acks: &mut Vec<oneshot::Sender<()>>) {
    match msg {
        WriterMsg::Snapshot(snapshot) => *latest = Some(snapshot),
        WriterMsg::Flush(ack) => acks.push(ack),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Excerpt, FAILED_TEXT, GENERATING_TEXT};
    use chrono::Utc;
    use tokio::sync::Mutex;

    /// Records every snapshot handed to it.
    #[derive(Default)]
    struct RecordingSink {
        saves: Mutex<Vec<Vec<Banter>>>,
    }

    #[async_trait]
    impl BanterSink for RecordingSink {
        async fn save(&self, banters: &[Banter]) {
            self.saves.lock().await.push(banters.to_vec());
        }
    }

    fn pending(id: &str) -> Banter {
        Banter::pending(id, format!("/img/{id}.jpg"), Utc::now())
    }

    fn ids(list: &[Banter]) -> Vec<&str> {
        list.iter().map(|b| b.id.as_str()).collect()
    }

    #[test]
    fn test_insert_prepends() {
        let cache = BanterCache::in_memory();
        cache.insert_optimistic(pending("a")).unwrap();
        cache.insert_optimistic(pending("b")).unwrap();
        assert_eq!(ids(&cache.snapshot()), ["b", "a"]);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let cache = BanterCache::in_memory();
        cache.insert_optimistic(pending("a")).unwrap();
        let err = cache.insert_optimistic(pending("a")).unwrap_err();
        assert!(matches!(err, BanterError::DuplicateBanter(id) if id == "a"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_update_merges_fields() {
        let cache = BanterCache::in_memory();
        cache.insert_optimistic(pending("a")).unwrap();

        let updated = cache
            .update("a", BanterPatch::succeeded(vec![Excerpt::new("one"), Excerpt::new("two")]))
            .unwrap();
        assert!(!updated.is_generating);
        assert_eq!(updated.image_uri, "/img/a.jpg");
        assert_eq!(cache.get("a").unwrap(), updated);
    }

    #[test]
    fn test_update_unknown_id() {
        let cache = BanterCache::in_memory();
        cache.insert_optimistic(pending("a")).unwrap();
        let err = cache.update("ghost", BanterPatch::failed()).unwrap_err();
        assert!(matches!(err, BanterError::BanterNotFound(_)));
        assert_eq!(cache.get("a").unwrap().excerpts[0].text, GENERATING_TEXT);
    }

    #[test]
    fn test_update_keeps_insertion_order() {
        let cache = BanterCache::in_memory();
        cache.insert_optimistic(pending("a")).unwrap();
        cache.insert_optimistic(pending("b")).unwrap();
        cache.update("b", BanterPatch::failed()).unwrap();
        cache.update("a", BanterPatch::succeeded(vec![Excerpt::new("x")])).unwrap();
        assert_eq!(ids(&cache.snapshot()), ["b", "a"]);
    }

    #[tokio::test]
    async fn test_subscribers_see_mutations() {
        let cache = BanterCache::in_memory();
        let mut rx = cache.subscribe();

        cache.insert_optimistic(pending("a")).unwrap();
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update()[0].is_generating);

        cache.update("a", BanterPatch::failed()).unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow()[0].excerpts[0].text, FAILED_TEXT);
    }

    #[tokio::test]
    async fn test_flush_persists_latest_snapshot() {
        let sink = Arc::new(RecordingSink::default());
        let cache = BanterCache::new(sink.clone());

        cache.insert_optimistic(pending("a")).unwrap();
        cache.insert_optimistic(pending("b")).unwrap();
        cache.update("a", BanterPatch::failed()).unwrap();
        cache.flush().await;

        let saves = sink.saves.lock().await;
        let last = saves.last().expect("at least one save");
        assert_eq!(last, &cache.snapshot());
        assert!(saves.len() <= 3);
    }

    #[tokio::test]
    async fn test_flush_without_mutations_returns() {
        let sink = Arc::new(RecordingSink::default());
        let cache = BanterCache::new(sink.clone());
        cache.flush().await;
        assert!(sink.saves.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_seeded_cache_prepends_and_persists() {
        let sink = Arc::new(RecordingSink::default());
        let cache = BanterCache::with_banters(vec![pending("old")], sink.clone());
        assert_eq!(ids(&cache.snapshot()), ["old"]);

        cache.insert_optimistic(pending("new")).unwrap();
        cache.flush().await;
        let saves = sink.saves.lock().await;
        assert_eq!(ids(saves.last().unwrap()), ["new", "old"]);
    }
}
