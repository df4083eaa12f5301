use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{
    ActionDecidedEvent,
    EventHandler,
    EventProducer,
    Handler,
    PttSettledEvent,
    PttStatusChangedEvent,
};

/// Publishing ends of the configured handlers. Clone freely.
#[derive(Default, Clone)]
pub struct EventProducers {
    pub status_changed_producer: Vec<EventProducer<PttStatusChangedEvent>>,
    pub settled_producer: Vec<EventProducer<PttSettledEvent>>,
    pub action_decided_producer: Vec<EventProducer<ActionDecidedEvent>>,
}

impl EventProducers {
    pub async fn publish_status_changed(&self, event: PttStatusChangedEvent) {
        for producer in &self.status_changed_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_settled(&self, event: PttSettledEvent) {
        for producer in &self.settled_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_action_decided(&self, event: ActionDecidedEvent) {
        for producer in &self.action_decided_producer {
            producer.publish_event(event.clone()).await;
        }
    }
}

pub struct EventHandlers {
    pub on_status_changed: Option<EventHandler<PttStatusChangedEvent>>,
    pub on_settled: Option<EventHandler<PttSettledEvent>>,
    pub on_action_decided: Option<EventHandler<ActionDecidedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_status_changed = hooks.on_status_changed.map(|f| EventHandler::new(buffer_size, f));
        let on_settled = hooks.on_settled.map(|f| EventHandler::new(buffer_size, f));
        let on_action_decided = hooks.on_action_decided.map(|f| EventHandler::new(buffer_size, f));
        Self { on_status_changed, on_settled, on_action_decided }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_status_changed {
            result.status_changed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_settled {
            result.settled_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_action_decided {
            result.action_decided_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_status_changed {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_settled {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_action_decided {
            tokio::spawn(handler.start_handler());
        }
    }
}

type HookFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_status_changed: Option<Handler<PttStatusChangedEvent>>,
    pub on_settled: Option<Handler<PttSettledEvent>>,
    pub on_action_decided: Option<Handler<ActionDecidedEvent>>,
}

impl EventHooks {
    pub fn on_status_changed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PttStatusChangedEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_status_changed = Some(Arc::new(f));
        self
    }

    pub fn on_settled<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PttSettledEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_settled = Some(Arc::new(f));
        self
    }

    pub fn on_action_decided<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(ActionDecidedEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_action_decided = Some(Arc::new(f));
        self
    }
}
