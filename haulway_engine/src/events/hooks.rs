use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{DealDepartedEvent, DealFinishedEvent, EventHandler, EventProducer, Handler, OfferAcceptedEvent};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub offer_accepted_producer: Vec<EventProducer<OfferAcceptedEvent>>,
    pub deal_finished_producer: Vec<EventProducer<DealFinishedEvent>>,
    pub deal_departed_producer: Vec<EventProducer<DealDepartedEvent>>,
}

// Queue depth per event kind. Acceptances arrive in bursts from batch subscriptions, and the
// refresher can mark a whole morning of departures in one tick; a deal only finishes once.
const OFFER_ACCEPTED_BUFFER: usize = 32;
const DEAL_FINISHED_BUFFER: usize = 8;
const DEAL_DEPARTED_BUFFER: usize = 64;

pub struct EventHandlers {
    pub on_offer_accepted: Option<EventHandler<OfferAcceptedEvent>>,
    pub on_deal_finished: Option<EventHandler<DealFinishedEvent>>,
    pub on_deal_departed: Option<EventHandler<DealDepartedEvent>>,
}

impl EventHandlers {
    pub fn new(hooks: EventHooks) -> Self {
        let on_offer_accepted = hooks.on_offer_accepted.map(|f| EventHandler::new(OFFER_ACCEPTED_BUFFER, f));
        let on_deal_finished = hooks.on_deal_finished.map(|f| EventHandler::new(DEAL_FINISHED_BUFFER, f));
        let on_deal_departed = hooks.on_deal_departed.map(|f| EventHandler::new(DEAL_DEPARTED_BUFFER, f));
        Self { on_offer_accepted, on_deal_finished, on_deal_departed }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_offer_accepted {
            result.offer_accepted_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_deal_finished {
            result.deal_finished_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_deal_departed {
            result.deal_departed_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_offer_accepted {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_deal_finished {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_deal_departed {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_offer_accepted: Option<Handler<OfferAcceptedEvent>>,
    pub on_deal_finished: Option<Handler<DealFinishedEvent>>,
    pub on_deal_departed: Option<Handler<DealDepartedEvent>>,
}

impl EventHooks {
    pub fn on_offer_accepted<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OfferAcceptedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_offer_accepted = Some(Arc::new(f));
        self
    }

    pub fn on_deal_finished<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(DealFinishedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_deal_finished = Some(Arc::new(f));
        self
    }

    pub fn on_deal_departed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(DealDepartedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_deal_departed = Some(Arc::new(f));
        self
    }
}
