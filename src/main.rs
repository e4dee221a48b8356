use clap::Parser;
use log::{info, warn};
use rt_board::config::AppConfig;
use rt_board::core::{
    exchange_topic, DrawingBoardSession, EntityListenerRegistry, ExchangeEvent, InMemoryTransport,
};
use rt_board::display::resolve_display;
use rt_board::providers::{
    HttpProvider, SimMode, SimProvider, SimProviderConfig, StatusProvider,
};
use rt_board::types::{
    EntityBinding, EntityId, EntityOption, GaugeWidgetConfig, StatusCardWidgetConfig,
    ValueAttribute, WidgetConfig, WidgetGeometry, WidgetRecord,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// rt-board - Real-time entity data layer for IoT dashboards
#[derive(Parser, Debug, Clone)]
#[command(name = "rt-board")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Debug verbosity level (0=quiet, 1=info, 2=debug, 3=trace)
    #[arg(short = 'd', long = "debug", value_name = "LEVEL", default_value = "1")]
    debug: u8,

    /// Seconds to run before exiting (default: until Ctrl-C)
    #[arg(short = 'r', long = "run-for", value_name = "SECONDS")]
    run_for: Option<u64>,

    /// Interval between simulated exchange batches, in milliseconds
    #[arg(long = "publish-every", value_name = "MS", default_value = "1000")]
    publish_every: u64,

    /// Layout file to load at startup
    #[arg(value_name = "LAYOUT_FILE")]
    layout_file: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logger with verbosity based on -d/--debug flag
    let log_level = match cli.debug {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    // Allow RUST_LOG to override CLI setting
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    warn!("Starting rt-board v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match &cli.layout_file {
        Some(path) => AppConfig::load_from_path(&PathBuf::from(path))?,
        None => AppConfig::load()?,
    };
    if config.dashboards.is_empty() {
        info!("no dashboards configured, using the built-in demo board");
        config.dashboards.push(demo_dashboard());
    }
    let detail = config.dashboards[0].clone();

    let provider: Arc<dyn StatusProvider> = match &config.tuning.provider_url {
        Some(url) => {
            info!("using HTTP status provider at {}", url);
            Arc::new(HttpProvider::new(url.clone()))
        }
        None => {
            info!("no provider URL configured, using the simulated provider");
            Arc::new(SimProvider::new(SimProviderConfig {
                mode: SimMode::SineWave,
                min_value: 15.0,
                max_value: 85.0,
                period: 20.0,
                jitter: 1.5,
                ..SimProviderConfig::default()
            }))
        }
    };

    let registry = Arc::new(EntityListenerRegistry::with_batch_window(
        config.tuning.batch_window(),
    ));
    let transport = InMemoryTransport::new();

    let mut session =
        DrawingBoardSession::open(Arc::clone(&registry), &transport, &detail).await?;
    session.set_fetch_window(config.tuning.fetch_window());

    // Mount every configured widget; each logs its derived display on update
    let mut widgets = Vec::with_capacity(detail.widgets.len());
    for record in &detail.widgets {
        let mounted = session.mount_widget(record.clone(), Arc::clone(&provider))?;

        let adapter = mounted.adapter.clone();
        let widget_registry = Arc::clone(&registry);
        let widget_record = record.clone();
        mounted.adapter.on_update(move || {
            let display = resolve_display(&widget_record, &adapter.snapshot(), |id| {
                widget_registry.latest_entity_detail(id)
            });
            let alarm = if display.emphasis.active { " [ALARM]" } else { "" };
            info!(
                "{:<16} {}{}",
                widget_record.config.title(),
                display.formatted_value,
                alarm
            );
        });
        widgets.push(mounted);
    }

    // Feed the exchange topic with simulated change batches
    let topic = exchange_topic(&detail.id);
    let entity_ids: Vec<EntityId> = detail.entities.iter().map(|e| e.id.clone()).collect();
    let feed_transport = transport.clone();
    let publish_every = Duration::from_millis(cli.publish_every);
    let feed = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(publish_every);
        loop {
            ticker.tick().await;
            feed_transport.publish(&topic, ExchangeEvent::new(entity_ids.clone()));
        }
    });

    match cli.run_for {
        Some(seconds) => tokio::time::sleep(Duration::from_secs(seconds)).await,
        None => {
            tokio::signal::ctrl_c().await?;
            info!("interrupted, shutting down");
        }
    }

    feed.abort();
    drop(widgets);
    session.close();
    Ok(())
}

/// Built-in demo board used when no configuration exists
fn demo_dashboard() -> rt_board::config::DashboardConfig {
    let temperature = EntityOption::new("temp-1", "temperature")
        .with_name("Hall temperature")
        .with_attribute(ValueAttribute {
            unit: Some("°C".to_string()),
            min: Some(0.0),
            max: Some(100.0),
            precision: Some(1),
            ..ValueAttribute::default()
        });
    let door = EntityOption::new("door-1", "door_alarm").with_name("Loading dock door");

    rt_board::config::DashboardConfig {
        id: "demo".to_string(),
        name: "Demo board".to_string(),
        grid: Default::default(),
        entities: vec![temperature.clone(), door.clone()],
        widgets: vec![
            WidgetRecord::new(
                "gauge-temp",
                WidgetGeometry::new(0, 0, 2, 2),
                WidgetConfig::Gauge(GaugeWidgetConfig {
                    title: "Temperature".to_string(),
                    entities: vec![EntityBinding::new("temp-1").with_raw_data(temperature)],
                    thresholds: None,
                }),
            ),
            WidgetRecord::new(
                "card-door",
                WidgetGeometry::new(2, 0, 1, 1),
                WidgetConfig::StatusCard(StatusCardWidgetConfig {
                    title: "Dock door".to_string(),
                    entities: vec![EntityBinding::new("door-1").with_raw_data(door)],
                    thresholds: None,
                }),
            ),
        ],
    }
}
