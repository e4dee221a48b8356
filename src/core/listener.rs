//! Entity listener registry - decouples the realtime transport from widgets
//!
//! Widgets register a callback against the entity ids they render; the
//! transport side hands incoming batches of changed ids to
//! [`EntityListenerRegistry::trigger_listener`], which fans out to every
//! interested subscription with a trailing-edge debounce so bursts coalesce
//! into one notification round per subscription.
//!
//! The registry is an explicitly constructed service: build one at the
//! application root and share it via `Arc`. It holds no ambient global state,
//! which keeps unit tests isolated.

use arc_swap::ArcSwap;
use log::{debug, warn};
use rt_board_types::{EntityId, EntityOption};
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Default batching window for coalescing bursts of upstream changes
pub const DEFAULT_BATCH_WINDOW: Duration = Duration::from_millis(200);

/// Callback invoked when any entity watched by a subscription changes
pub type ChangeCallback = Arc<dyn Fn() + Send + Sync>;

/// One widget's interest in a set of entities.
///
/// Owned by exactly one widget instance; created on mount, removed through
/// the guard on unmount. Multiple subscriptions may watch the same entity.
#[derive(Clone)]
pub struct Subscription {
    /// Debug/diagnostic key, not a uniqueness constraint
    pub widget_id: String,
    pub dashboard_id: String,
    pub callback: ChangeCallback,
}

impl Subscription {
    pub fn new(
        widget_id: impl Into<String>,
        dashboard_id: impl Into<String>,
        callback: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        Self {
            widget_id: widget_id.into(),
            dashboard_id: dashboard_id.into(),
            callback: Arc::new(callback),
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("widget_id", &self.widget_id)
            .field("dashboard_id", &self.dashboard_id)
            .finish()
    }
}

/// Context describing why a notification round was triggered.
///
/// Used for logging and diagnostics only; delivery semantics do not depend
/// on it.
#[derive(Debug, Clone, Default)]
pub struct TriggerContext {
    pub dashboard_id: Option<String>,
    pub origin: String,
}

impl TriggerContext {
    /// Context for batches arriving from the realtime transport
    pub fn transport(dashboard_id: impl Into<String>) -> Self {
        Self {
            dashboard_id: Some(dashboard_id.into()),
            origin: "transport".to_string(),
        }
    }

    /// Context for locally initiated (non-transport) rounds
    pub fn local(origin: impl Into<String>) -> Self {
        Self {
            dashboard_id: None,
            origin: origin.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("listener registration requires at least one entity id")]
    EmptyEntityList,
}

struct ListenerEntry {
    sub_id: Uuid,
    sub: Subscription,
}

struct RegistryInner {
    /// Entity id -> interested subscriptions. Entries are created lazily on
    /// first subscription and removed when their set empties, so the table
    /// does not grow unboundedly over a long-lived session.
    listeners: RwLock<HashMap<EntityId, Vec<ListenerEntry>>>,
    /// Trailing-edge debounce bookkeeping: subscription id -> generation of
    /// the latest scheduling. Only the latest scheduling fires.
    pending: Mutex<HashMap<Uuid, u64>>,
    /// Entity metadata snapshot, replaced wholesale on every seed
    snapshot: ArcSwap<HashMap<EntityId, EntityOption>>,
    batch_window: Duration,
}

impl RegistryInner {
    fn remove_subscription(&self, entity_ids: &[EntityId], sub_id: Uuid) {
        if let Ok(mut listeners) = self.listeners.write() {
            for id in entity_ids {
                if let Some(entries) = listeners.get_mut(id) {
                    entries.retain(|e| e.sub_id != sub_id);
                    if entries.is_empty() {
                        listeners.remove(id);
                    }
                }
            }
        }
        // Cancel any pending notification for the removed subscription
        if let Ok(mut pending) = self.pending.lock() {
            pending.remove(&sub_id);
        }
    }
}

/// Removal token returned by [`EntityListenerRegistry::add_listener`].
///
/// `remove()` is idempotent; the guard also removes its subscription when
/// dropped, so a widget that simply drops the guard on unmount is cleaned
/// up. Removing a subscription that is already gone is a silent no-op.
pub struct ListenerGuard {
    registry: Weak<RegistryInner>,
    sub_id: Uuid,
    entity_ids: Vec<EntityId>,
    removed: AtomicBool,
}

impl ListenerGuard {
    pub fn remove(&self) {
        if self.removed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(inner) = self.registry.upgrade() {
            inner.remove_subscription(&self.entity_ids, self.sub_id);
        }
    }

    pub fn is_removed(&self) -> bool {
        self.removed.load(Ordering::SeqCst)
    }

    /// Entity ids this subscription was registered against
    pub fn entity_ids(&self) -> &[EntityId] {
        &self.entity_ids
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        self.remove();
    }
}

/// Maps entity ids to interested widget subscriptions and fans out change
/// notifications with per-subscription debouncing.
pub struct EntityListenerRegistry {
    inner: Arc<RegistryInner>,
}

impl EntityListenerRegistry {
    pub fn new() -> Self {
        Self::with_batch_window(DEFAULT_BATCH_WINDOW)
    }

    pub fn with_batch_window(batch_window: Duration) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                listeners: RwLock::new(HashMap::new()),
                pending: Mutex::new(HashMap::new()),
                snapshot: ArcSwap::from_pointee(HashMap::new()),
                batch_window,
            }),
        }
    }

    pub fn batch_window(&self) -> Duration {
        self.inner.batch_window
    }

    /// Register one subscription against one or more entity ids.
    ///
    /// Duplicate ids in the list collapse to a single registration. The
    /// returned guard is the only way to remove the subscription; see
    /// [`ListenerGuard`].
    pub fn add_listener(
        &self,
        entity_ids: &[EntityId],
        subscription: Subscription,
    ) -> Result<ListenerGuard, RegistryError> {
        if entity_ids.is_empty() {
            return Err(RegistryError::EmptyEntityList);
        }

        let sub_id = Uuid::new_v4();
        let mut unique: Vec<EntityId> = Vec::with_capacity(entity_ids.len());
        for id in entity_ids {
            if !unique.contains(id) {
                unique.push(id.clone());
            }
        }

        {
            let mut listeners = match self.inner.listeners.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            for id in &unique {
                listeners.entry(id.clone()).or_default().push(ListenerEntry {
                    sub_id,
                    sub: subscription.clone(),
                });
            }
        }

        debug!(
            "registered listener {} for widget {} on {} entities",
            sub_id,
            subscription.widget_id,
            unique.len()
        );

        Ok(ListenerGuard {
            registry: Arc::downgrade(&self.inner),
            sub_id,
            entity_ids: unique,
            removed: AtomicBool::new(false),
        })
    }

    /// Fan a batch of changed entity ids out to all interested subscriptions.
    ///
    /// A subscription watching several of the changed ids fires once, not
    /// once per id. Each matched subscription's timer is cancelled and
    /// rescheduled, so rapid batches within the window collapse to a single
    /// callback invocation (trailing edge). Must be called from within a
    /// tokio runtime.
    pub fn trigger_listener(&self, entity_ids: &[EntityId], ctx: &TriggerContext) {
        // Snapshot the matched subscriptions under the read lock, then
        // schedule outside it, so a callback unsubscribing mid-round cannot
        // corrupt iteration.
        let mut matched: HashMap<Uuid, Subscription> = HashMap::new();
        {
            let listeners = match self.inner.listeners.read() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            for id in entity_ids {
                if let Some(entries) = listeners.get(id) {
                    for entry in entries {
                        matched
                            .entry(entry.sub_id)
                            .or_insert_with(|| entry.sub.clone());
                    }
                }
            }
        }

        if matched.is_empty() {
            debug!(
                "no listeners for batch of {} entities (origin: {})",
                entity_ids.len(),
                ctx.origin
            );
            return;
        }

        debug!(
            "scheduling {} subscriptions for {} changed entities (origin: {})",
            matched.len(),
            entity_ids.len(),
            ctx.origin
        );

        for (sub_id, sub) in matched {
            self.schedule(sub_id, sub);
        }
    }

    /// Cancel-then-reschedule the debounce timer for one subscription
    fn schedule(&self, sub_id: Uuid, sub: Subscription) {
        let generation = {
            let mut pending = match self.inner.pending.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            let slot = pending.entry(sub_id).or_insert(0);
            *slot += 1;
            *slot
        };

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(inner.batch_window).await;

            {
                let mut pending = match inner.pending.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                match pending.get(&sub_id) {
                    // Latest scheduling for this subscription: claim it
                    Some(&current) if current == generation => {
                        pending.remove(&sub_id);
                    }
                    // Superseded by a later trigger, or unsubscribed
                    _ => return,
                }
            }

            if catch_unwind(AssertUnwindSafe(|| (sub.callback)())).is_err() {
                warn!(
                    "listener callback for widget {} panicked; other subscribers unaffected",
                    sub.widget_id
                );
            }
        });
    }

    /// Bulk-seed the entity metadata snapshot.
    ///
    /// The previous snapshot is replaced entirely (no merge). Records
    /// without an id are discarded with a warning.
    pub fn set_latest_entities(&self, entities: Vec<EntityOption>) {
        let mut snapshot = HashMap::with_capacity(entities.len());
        for entity in entities {
            if !entity.is_valid() {
                warn!("discarding entity option without an id (key: {:?})", entity.key);
                continue;
            }
            snapshot.insert(entity.id.clone(), entity);
        }
        debug!("seeded entity snapshot with {} entries", snapshot.len());
        self.inner.snapshot.store(Arc::new(snapshot));
    }

    /// Best-effort lookup against the current snapshot.
    ///
    /// Returns `None` when the entity is unknown; callers must not treat the
    /// snapshot as authoritative.
    pub fn latest_entity_detail(&self, id: &EntityId) -> Option<EntityOption> {
        self.inner.snapshot.load().get(id).cloned()
    }

    /// Number of subscriptions currently watching an entity (diagnostics)
    pub fn listener_count(&self, id: &EntityId) -> usize {
        self.inner
            .listeners
            .read()
            .map(|listeners| listeners.get(id).map(|e| e.len()).unwrap_or(0))
            .unwrap_or(0)
    }

    /// Number of entities in the current snapshot (diagnostics)
    pub fn entity_count(&self) -> usize {
        self.inner.snapshot.load().len()
    }
}

impl Default for EntityListenerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting_subscription(
        widget_id: &str,
        counter: &Arc<AtomicUsize>,
    ) -> Subscription {
        let counter = Arc::clone(counter);
        Subscription::new(widget_id, "board-1", move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    async fn drain(registry: &EntityListenerRegistry) {
        tokio::time::sleep(registry.batch_window() * 3).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_invokes_each_subscription_once() {
        let registry = EntityListenerRegistry::new();
        let door = EntityId::from("door-1");

        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let _g1 = registry
            .add_listener(std::slice::from_ref(&door), counting_subscription("w1", &first))
            .unwrap();
        let _g2 = registry
            .add_listener(std::slice::from_ref(&door), counting_subscription("w2", &second))
            .unwrap();

        // Duplicate ids in the batch collapse
        registry.trigger_listener(
            &[door.clone(), door.clone(), door.clone()],
            &TriggerContext::local("test"),
        );
        drain(&registry).await;

        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscription_watching_two_changed_entities_fires_once() {
        let registry = EntityListenerRegistry::new();
        let temp = EntityId::from("temp-1");
        let humidity = EntityId::from("humidity-1");

        let count = Arc::new(AtomicUsize::new(0));
        let _guard = registry
            .add_listener(
                &[temp.clone(), humidity.clone()],
                counting_subscription("w1", &count),
            )
            .unwrap();

        registry.trigger_listener(&[temp, humidity], &TriggerContext::local("test"));
        drain(&registry).await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_triggers_collapse_within_window() {
        let registry = EntityListenerRegistry::new();
        let id = EntityId::from("e-1");

        let count = Arc::new(AtomicUsize::new(0));
        let _guard = registry
            .add_listener(std::slice::from_ref(&id), counting_subscription("w1", &count))
            .unwrap();

        for _ in 0..5 {
            registry.trigger_listener(std::slice::from_ref(&id), &TriggerContext::local("test"));
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        drain(&registry).await;

        assert_eq!(count.load(Ordering::SeqCst), 1);

        // A trigger after the window fires again
        registry.trigger_listener(std::slice::from_ref(&id), &TriggerContext::local("test"));
        drain(&registry).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_removed_subscription_never_fires() {
        let registry = EntityListenerRegistry::new();
        let id = EntityId::from("e-1");

        let count = Arc::new(AtomicUsize::new(0));
        let guard = registry
            .add_listener(std::slice::from_ref(&id), counting_subscription("w1", &count))
            .unwrap();

        guard.remove();
        // Double removal is a no-op
        guard.remove();
        assert!(guard.is_removed());
        assert_eq!(registry.listener_count(&id), 0);

        registry.trigger_listener(std::slice::from_ref(&id), &TriggerContext::local("test"));
        drain(&registry).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsubscribe_after_scheduling_cancels_pending_delivery() {
        let registry = EntityListenerRegistry::new();
        let id = EntityId::from("e-1");

        let count = Arc::new(AtomicUsize::new(0));
        let guard = registry
            .add_listener(std::slice::from_ref(&id), counting_subscription("w1", &count))
            .unwrap();

        registry.trigger_listener(std::slice::from_ref(&id), &TriggerContext::local("test"));
        // Removed inside the batching window: the scheduled delivery is void
        guard.remove();
        drain(&registry).await;

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_guard_unsubscribes() {
        let registry = EntityListenerRegistry::new();
        let id = EntityId::from("e-1");

        let count = Arc::new(AtomicUsize::new(0));
        {
            let _guard = registry
                .add_listener(std::slice::from_ref(&id), counting_subscription("w1", &count))
                .unwrap();
            assert_eq!(registry.listener_count(&id), 1);
        }
        assert_eq!(registry.listener_count(&id), 0);

        registry.trigger_listener(std::slice::from_ref(&id), &TriggerContext::local("test"));
        drain(&registry).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_callback_does_not_abort_dispatch() {
        let registry = EntityListenerRegistry::new();
        let id = EntityId::from("e-1");

        let _bad = registry
            .add_listener(
                std::slice::from_ref(&id),
                Subscription::new("bad", "board-1", || panic!("widget render failed")),
            )
            .unwrap();

        let count = Arc::new(AtomicUsize::new(0));
        let _good = registry
            .add_listener(std::slice::from_ref(&id), counting_subscription("good", &count))
            .unwrap();

        registry.trigger_listener(std::slice::from_ref(&id), &TriggerContext::local("test"));
        drain(&registry).await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_empty_entity_list_is_rejected() {
        let registry = EntityListenerRegistry::new();
        let result = registry.add_listener(&[], Subscription::new("w1", "board-1", || {}));
        assert!(matches!(result, Err(RegistryError::EmptyEntityList)));
    }

    #[test]
    fn test_snapshot_seeding_is_a_full_overwrite() {
        let registry = EntityListenerRegistry::new();
        let a = EntityOption::new("a", "temperature");
        let b = EntityOption::new("b", "humidity");

        registry.set_latest_entities(vec![a.clone()]);
        assert!(registry.latest_entity_detail(&EntityId::from("a")).is_some());

        registry.set_latest_entities(vec![b]);
        assert!(registry.latest_entity_detail(&EntityId::from("a")).is_none());
        assert!(registry.latest_entity_detail(&EntityId::from("b")).is_some());
        assert_eq!(registry.entity_count(), 1);
    }

    #[test]
    fn test_invalid_entity_options_are_discarded() {
        let registry = EntityListenerRegistry::new();
        registry.set_latest_entities(vec![
            EntityOption::new("", "orphan"),
            EntityOption::new("ok", "temperature"),
        ]);
        assert_eq!(registry.entity_count(), 1);
    }
}
