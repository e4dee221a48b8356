//! Drawing board session - binds one dashboard to the registry and transport
//!
//! A session seeds the entity snapshot from the dashboard detail payload,
//! pumps exchange events into the listener registry, and tracks the
//! breadcrumb path stack. Widget subscriptions are owned by the widgets
//! themselves; tearing a session down never bulk-removes them.

use crate::config::DashboardConfig;
use crate::core::fetch::{StatusFetchAdapter, DEFAULT_FETCH_WINDOW};
use crate::core::listener::{
    EntityListenerRegistry, ListenerGuard, RegistryError, Subscription, TriggerContext,
};
use crate::core::transport::{exchange_topic, RealtimeTransport};
use crate::providers::StatusProvider;
use log::{debug, info};
use rt_board_types::{EntityId, WidgetRecord};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// One entry of the breadcrumb path stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathEntry {
    pub dashboard_id: String,
    pub name: String,
}

/// A mounted widget: its fetch adapter plus its registry subscription.
///
/// Dropping the handle unmounts the widget (the guard removes the
/// subscription; the adapter's pending work is orphaned and harmless).
pub struct MountedWidget {
    pub record: WidgetRecord,
    pub adapter: StatusFetchAdapter,
    registry: Arc<EntityListenerRegistry>,
    dashboard_id: String,
    guard: Option<ListenerGuard>,
}

impl MountedWidget {
    /// Entity ids the widget currently watches
    pub fn entity_ids(&self) -> Vec<EntityId> {
        self.record
            .config
            .entities()
            .iter()
            .map(|binding| binding.value.clone())
            .collect()
    }

    /// Swap the watched entity set: the old subscription is removed and a
    /// new one added, and the adapter re-fetches the new selection.
    pub fn rebind(&mut self, entity_ids: Vec<EntityId>) -> Result<(), RegistryError> {
        if let Some(guard) = self.guard.take() {
            guard.remove();
        }
        self.guard = subscribe_adapter(
            &self.registry,
            &self.record.id,
            &self.dashboard_id,
            &self.adapter,
            &entity_ids,
        )?;
        self.adapter.set_selection(entity_ids);
        Ok(())
    }
}

/// Register the adapter's refresh as the widget's registry callback.
/// An empty id set is a valid unbound widget: no subscription, placeholder
/// rendering.
fn subscribe_adapter(
    registry: &Arc<EntityListenerRegistry>,
    widget_id: &str,
    dashboard_id: &str,
    adapter: &StatusFetchAdapter,
    entity_ids: &[EntityId],
) -> Result<Option<ListenerGuard>, RegistryError> {
    if entity_ids.is_empty() {
        return Ok(None);
    }
    let callback_adapter = adapter.clone();
    let guard = registry.add_listener(
        entity_ids,
        Subscription::new(widget_id, dashboard_id, move || callback_adapter.refresh()),
    )?;
    Ok(Some(guard))
}

/// Owns one dashboard's transport binding and breadcrumb state
pub struct DrawingBoardSession {
    dashboard_id: String,
    registry: Arc<EntityListenerRegistry>,
    pump: Option<JoinHandle<()>>,
    path: Mutex<Vec<PathEntry>>,
    fetch_window: Duration,
}

impl DrawingBoardSession {
    /// Open a session for a loaded dashboard.
    ///
    /// Seeds the registry snapshot from the detail payload and subscribes to
    /// the dashboard's exchange topic.
    pub async fn open(
        registry: Arc<EntityListenerRegistry>,
        transport: &dyn RealtimeTransport,
        detail: &DashboardConfig,
    ) -> anyhow::Result<Self> {
        registry.set_latest_entities(detail.entities.clone());

        let topic = exchange_topic(&detail.id);
        let mut subscription = transport.subscribe(&topic).await?;
        info!(
            "opened drawing board session for {} ({} widgets, {} seeded entities)",
            detail.id,
            detail.widgets.len(),
            detail.entities.len()
        );

        let pump_registry = Arc::clone(&registry);
        let pump_dashboard = detail.id.clone();
        let pump = tokio::spawn(async move {
            while let Some(event) = subscription.recv().await {
                pump_registry.trigger_listener(
                    &event.entity_ids,
                    &TriggerContext::transport(pump_dashboard.clone()),
                );
            }
            debug!("exchange pump for {} stopped", pump_dashboard);
        });

        let session = Self {
            dashboard_id: detail.id.clone(),
            registry,
            pump: Some(pump),
            path: Mutex::new(Vec::new()),
            fetch_window: DEFAULT_FETCH_WINDOW,
        };
        session.enter_path(&detail.id, &detail.name);
        Ok(session)
    }

    /// Override the debounce window applied to widgets mounted after this
    /// call (configured through `TuningConfig`)
    pub fn set_fetch_window(&mut self, window: Duration) {
        self.fetch_window = window;
    }

    pub fn dashboard_id(&self) -> &str {
        &self.dashboard_id
    }

    pub fn registry(&self) -> &Arc<EntityListenerRegistry> {
        &self.registry
    }

    /// Mount a widget: create its fetch adapter, wire its registry
    /// subscription, and kick the initial fetch.
    pub fn mount_widget(
        &self,
        record: WidgetRecord,
        provider: Arc<dyn StatusProvider>,
    ) -> Result<MountedWidget, RegistryError> {
        let adapter = StatusFetchAdapter::with_window(provider, self.fetch_window);
        adapter.set_history_query(record.config.history_query());

        let entity_ids: Vec<EntityId> = record
            .config
            .entities()
            .iter()
            .map(|binding| binding.value.clone())
            .collect();

        let guard = subscribe_adapter(
            &self.registry,
            &record.id,
            &self.dashboard_id,
            &adapter,
            &entity_ids,
        )?;
        adapter.set_selection(entity_ids);

        Ok(MountedWidget {
            record,
            adapter,
            registry: Arc::clone(&self.registry),
            dashboard_id: self.dashboard_id.clone(),
            guard,
        })
    }

    /// Push a breadcrumb entry, or update the existing one in place when the
    /// dashboard id is already on the stack. An id never appears twice.
    pub fn enter_path(&self, dashboard_id: &str, name: &str) {
        let mut path = match self.path.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(entry) = path.iter_mut().find(|e| e.dashboard_id == dashboard_id) {
            entry.name = name.to_string();
        } else {
            path.push(PathEntry {
                dashboard_id: dashboard_id.to_string(),
                name: name.to_string(),
            });
        }
    }

    /// Current breadcrumb stack, root first
    pub fn path(&self) -> Vec<PathEntry> {
        match self.path.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Stop the exchange pump and drop the topic subscription. Widget
    /// subscriptions stay with their owners.
    pub fn close(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
            info!("closed drawing board session for {}", self.dashboard_id);
        }
    }
}

impl Drop for DrawingBoardSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fetch::FetchState;
    use crate::core::transport::{ExchangeEvent, InMemoryTransport};
    use crate::providers::sim::{SimMode, SimProvider, SimProviderConfig};
    use rt_board_types::{
        EntityBinding, EntityOption, GaugeWidgetConfig, WidgetConfig, WidgetGeometry,
    };

    fn demo_detail() -> DashboardConfig {
        DashboardConfig {
            id: "board-1".to_string(),
            name: "Plant floor".to_string(),
            grid: Default::default(),
            entities: vec![
                EntityOption::new("temp-1", "temperature").with_name("Temperature"),
                EntityOption::new("door-1", "door_alarm").with_name("Door"),
            ],
            widgets: vec![WidgetRecord::new(
                "w-1",
                WidgetGeometry::new(0, 0, 2, 2),
                WidgetConfig::Gauge(GaugeWidgetConfig {
                    title: "Temperature".to_string(),
                    entities: vec![EntityBinding::new("temp-1")],
                    thresholds: None,
                }),
            )],
        }
    }

    fn sim_provider() -> Arc<SimProvider> {
        Arc::new(SimProvider::new(SimProviderConfig {
            mode: SimMode::Manual,
            manual_value: 42.0,
            ..SimProviderConfig::default()
        }))
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_seeds_snapshot_and_pumps_exchange_events() {
        let registry = Arc::new(EntityListenerRegistry::new());
        let transport = InMemoryTransport::new();
        let detail = demo_detail();

        let session = DrawingBoardSession::open(Arc::clone(&registry), &transport, &detail)
            .await
            .unwrap();
        assert_eq!(registry.entity_count(), 2);

        let widget = session
            .mount_widget(detail.widgets[0].clone(), sim_provider())
            .unwrap();

        // Initial debounced fetch lands
        tokio::time::sleep(std::time::Duration::from_secs(2)).await;
        assert_eq!(widget.adapter.snapshot().state, FetchState::Ready);

        // A transport batch re-fetches through the registry path
        transport.publish(
            &exchange_topic("board-1"),
            ExchangeEvent::new(vec![EntityId::from("temp-1")]),
        );
        tokio::time::sleep(std::time::Duration::from_secs(2)).await;
        let snapshot = widget.adapter.snapshot();
        assert_eq!(
            snapshot.status(&EntityId::from("temp-1")).unwrap().as_f64(),
            Some(42.0)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_drops_topic_subscription_but_not_widget_listeners() {
        let registry = Arc::new(EntityListenerRegistry::new());
        let transport = InMemoryTransport::new();
        let detail = demo_detail();
        let topic = exchange_topic("board-1");

        let mut session = DrawingBoardSession::open(Arc::clone(&registry), &transport, &detail)
            .await
            .unwrap();
        let widget = session
            .mount_widget(detail.widgets[0].clone(), sim_provider())
            .unwrap();
        assert_eq!(transport.subscriber_count(&topic), 1);

        session.close();
        // Aborting the pump drops the TopicSubscription, which unsubscribes
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(transport.subscriber_count(&topic), 0);

        // The widget's own registry subscription survives the session
        assert_eq!(registry.listener_count(&EntityId::from("temp-1")), 1);
        drop(widget);
        assert_eq!(registry.listener_count(&EntityId::from("temp-1")), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_breadcrumb_updates_in_place_without_duplicates() {
        let registry = Arc::new(EntityListenerRegistry::new());
        let transport = InMemoryTransport::new();
        let session = DrawingBoardSession::open(registry, &transport, &demo_detail())
            .await
            .unwrap();

        session.enter_path("board-2", "Cold storage");
        assert_eq!(session.path().len(), 2);

        // Re-entering an id on the stack updates the entry in place
        session.enter_path("board-1", "Plant floor (renamed)");
        let path = session.path();
        assert_eq!(path.len(), 2);
        assert_eq!(path[0].dashboard_id, "board-1");
        assert_eq!(path[0].name, "Plant floor (renamed)");
        assert_eq!(path[1].dashboard_id, "board-2");
    }

    #[tokio::test(start_paused = true)]
    async fn test_rebind_swaps_subscription() {
        let registry = Arc::new(EntityListenerRegistry::new());
        let transport = InMemoryTransport::new();
        let detail = demo_detail();
        let session = DrawingBoardSession::open(Arc::clone(&registry), &transport, &detail)
            .await
            .unwrap();

        let mut widget = session
            .mount_widget(detail.widgets[0].clone(), sim_provider())
            .unwrap();
        assert_eq!(registry.listener_count(&EntityId::from("temp-1")), 1);

        widget.rebind(vec![EntityId::from("door-1")]).unwrap();
        assert_eq!(registry.listener_count(&EntityId::from("temp-1")), 0);
        assert_eq!(registry.listener_count(&EntityId::from("door-1")), 1);
    }
}
