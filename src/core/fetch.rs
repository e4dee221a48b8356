//! Per-widget status fetching with debounce and stale-result cancellation
//!
//! Each widget owns one [`StatusFetchAdapter`]. Selection changes and
//! registry notifications both funnel into the same debounced fetch round;
//! a generation counter guarantees that a response belonging to an older
//! selection can never overwrite fresher state.

use crate::providers::StatusProvider;
use log::debug;
use rt_board_types::{Aggregate, DataPoint, EntityId, EntityStatus, TimeRange};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Default debounce window for fetch rounds
pub const DEFAULT_FETCH_WINDOW: Duration = Duration::from_millis(300);

/// Loading/data state as seen by the rendering layer.
///
/// `NoData` is distinct from `Loading`: a failed or empty fetch round leaves
/// the widget rendering placeholders, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchState {
    #[default]
    Idle,
    Loading,
    Ready,
    NoData,
}

/// Result of the adapter's latest completed fetch round
#[derive(Debug, Clone, Default)]
pub struct FetchSnapshot {
    pub state: FetchState,
    /// Status per entity; entities whose fetch failed are simply absent
    pub statuses: HashMap<EntityId, EntityStatus>,
    /// Aggregated history per entity, present only when a history query is
    /// configured and the fetch succeeded
    pub series: HashMap<EntityId, Vec<DataPoint>>,
}

impl FetchSnapshot {
    pub fn status(&self, id: &EntityId) -> Option<&EntityStatus> {
        self.statuses.get(id)
    }

    pub fn series_for(&self, id: &EntityId) -> Option<&[DataPoint]> {
        self.series.get(id).map(|points| points.as_slice())
    }

    pub fn is_no_data(&self) -> bool {
        self.state == FetchState::NoData
    }
}

struct AdapterInner {
    provider: Arc<dyn StatusProvider>,
    selection: Mutex<Vec<EntityId>>,
    history_query: Mutex<Option<(TimeRange, Aggregate)>>,
    /// Bumped on every selection change or refresh; fetch rounds carry the
    /// generation they were scheduled under and bail out when superseded.
    generation: AtomicU64,
    window: Duration,
    snapshot: Mutex<FetchSnapshot>,
    on_change: Mutex<Option<Arc<dyn Fn() + Send + Sync>>>,
}

impl AdapterInner {
    fn notify(&self) {
        let callback = {
            let guard = match self.on_change.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            guard.clone()
        };
        if let Some(callback) = callback {
            callback();
        }
    }

    fn store(&self, snapshot: FetchSnapshot) {
        let mut guard = match self.snapshot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = snapshot;
    }
}

/// Fetches and holds the latest status for the entities a widget depends on
#[derive(Clone)]
pub struct StatusFetchAdapter {
    inner: Arc<AdapterInner>,
}

impl StatusFetchAdapter {
    pub fn new(provider: Arc<dyn StatusProvider>) -> Self {
        Self::with_window(provider, DEFAULT_FETCH_WINDOW)
    }

    pub fn with_window(provider: Arc<dyn StatusProvider>, window: Duration) -> Self {
        Self {
            inner: Arc::new(AdapterInner {
                provider,
                selection: Mutex::new(Vec::new()),
                history_query: Mutex::new(None),
                generation: AtomicU64::new(0),
                window,
                snapshot: Mutex::new(FetchSnapshot::default()),
                on_change: Mutex::new(None),
            }),
        }
    }

    /// Register the callback invoked after every applied fetch round
    pub fn on_update(&self, callback: impl Fn() + Send + Sync + 'static) {
        let mut guard = match self.inner.on_change.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(Arc::new(callback));
    }

    /// Configure the history query issued alongside status fetches
    pub fn set_history_query(&self, query: Option<(TimeRange, Aggregate)>) {
        let mut guard = match self.inner.history_query.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = query;
    }

    /// Replace the entity selection.
    ///
    /// Cancels any pending or in-flight round for the old selection and
    /// schedules a fresh debounced fetch for the new one.
    pub fn set_selection(&self, entity_ids: Vec<EntityId>) {
        {
            let mut selection = match self.inner.selection.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            *selection = entity_ids;
        }
        self.kick(true);
    }

    /// Re-fetch the current selection, same debounce window.
    ///
    /// This is the registry-notification entry point; it runs regardless of
    /// whether the selection changed.
    pub fn refresh(&self) {
        self.kick(false);
    }

    pub fn snapshot(&self) -> FetchSnapshot {
        let guard = match self.inner.snapshot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.clone()
    }

    /// Schedule a debounced fetch round. Must be called from within a tokio
    /// runtime.
    fn kick(&self, selection_changed: bool) {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;

        if selection_changed {
            // Old data belongs to the old selection; show loading until the
            // new round lands
            self.inner.store(FetchSnapshot {
                state: FetchState::Loading,
                ..FetchSnapshot::default()
            });
        }

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(inner.window).await;
            if inner.generation.load(Ordering::SeqCst) != generation {
                // Superseded while debouncing
                return;
            }

            let selection = {
                let guard = match inner.selection.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                guard.clone()
            };
            let history_query = {
                let guard = match inner.history_query.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                *guard
            };

            if selection.is_empty() {
                // No selection is a valid state rendered as placeholders
                inner.store(FetchSnapshot {
                    state: FetchState::NoData,
                    ..FetchSnapshot::default()
                });
                inner.notify();
                return;
            }

            // Fetch each entity concurrently; partial failures leave that
            // entity's slot absent rather than failing the whole round
            let mut tasks = Vec::with_capacity(selection.len());
            for id in selection {
                let provider = Arc::clone(&inner.provider);
                tasks.push(tokio::spawn(async move {
                    let status = match provider.entity_status(&id).await {
                        Ok(status) => Some(status),
                        Err(e) => {
                            debug!("status fetch failed for entity {}: {}", id, e);
                            None
                        }
                    };
                    let series = match history_query {
                        Some((range, aggregate)) => {
                            match provider.aggregate_history(&id, &range, aggregate).await {
                                Ok(points) => Some(points),
                                Err(e) => {
                                    debug!("history fetch failed for entity {}: {}", id, e);
                                    None
                                }
                            }
                        }
                        None => None,
                    };
                    (id, status, series)
                }));
            }

            let mut statuses = HashMap::new();
            let mut series = HashMap::new();
            for task in tasks {
                if let Ok((id, status, points)) = task.await {
                    if let Some(status) = status {
                        statuses.insert(id.clone(), status);
                    }
                    if let Some(points) = points {
                        series.insert(id, points);
                    }
                }
            }

            // Guard again before applying: the selection may have changed
            // while the fetches were in flight
            if inner.generation.load(Ordering::SeqCst) != generation {
                debug!("discarding stale fetch round (generation {})", generation);
                return;
            }

            let state = if statuses.is_empty() {
                FetchState::NoData
            } else {
                FetchState::Ready
            };
            inner.store(FetchSnapshot {
                state,
                statuses,
                series,
            });
            inner.notify();
        });
    }
}
