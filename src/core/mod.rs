//! Core runtime: listener registry, fetch adapters, transport, sessions

mod fetch;
mod listener;
mod session;
mod transport;

pub use fetch::{FetchSnapshot, FetchState, StatusFetchAdapter, DEFAULT_FETCH_WINDOW};
pub use listener::{
    ChangeCallback, EntityListenerRegistry, ListenerGuard, RegistryError, Subscription,
    TriggerContext, DEFAULT_BATCH_WINDOW,
};
pub use session::{DrawingBoardSession, MountedWidget, PathEntry};
pub use transport::{
    exchange_topic, ExchangeEvent, InMemoryTransport, RealtimeTransport, TopicSubscription,
};
