pub mod event_bus;

pub use event_bus::{
    publish_event, subscribe, Event, EventBusActor, EventBusArguments, EventBusConfig, EventBusMsg,
    EventSubscription,
};
