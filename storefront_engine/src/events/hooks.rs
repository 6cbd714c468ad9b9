use std::{future::Future, pin::Pin, sync::Arc};

use crate::{
    db_types::PaymentOutcome,
    events::{
        EventHandler,
        EventProducer,
        Handler,
        OrderAnnulledEvent,
        OrderConfirmedEvent,
        OrderCreatedEvent,
        OrderStatusChangedEvent,
        ReconciliationConflictEvent,
        UnmatchedCallbackEvent,
    },
    traits::OutcomeApplied,
};

pub type HookFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Generates the producer, handler and hook registries for every event kind, so that adding an event is one line.
macro_rules! event_hooks {
    ($($hook:ident, $producer:ident: $event:ty;)+) => {
        /// The publishing ends of the registered hooks. Cheap to clone; every API holds a copy.
        #[derive(Default, Clone)]
        pub struct EventProducers {
            $(pub $producer: Vec<EventProducer<$event>>,)+
        }

        pub struct EventHandlers {
            $(pub $hook: Option<EventHandler<$event>>,)+
        }

        impl EventHandlers {
            pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
                Self {
                    $($hook: hooks.$hook.map(|f| EventHandler::new(stringify!($event), buffer_size, f)),)+
                }
            }

            pub fn producers(&self) -> EventProducers {
                let mut result = EventProducers::default();
                $(
                    if let Some(handler) = &self.$hook {
                        result.$producer.push(handler.subscribe());
                    }
                )+
                result
            }

            /// Spawns a task per registered hook. Each task ends once every producer for its event has been dropped.
            pub async fn start_handlers(self) {
                $(
                    if let Some(handler) = self.$hook {
                        tokio::spawn(async move {
                            handler.start_handler().await;
                        });
                    }
                )+
            }
        }

        #[derive(Default, Clone)]
        pub struct EventHooks {
            $(pub $hook: Option<Handler<$event>>,)+
        }

        impl EventHooks {
            $(
                pub fn $hook<F>(&mut self, f: F) -> &mut Self
                where F: (Fn($event) -> HookFuture) + Send + Sync + 'static {
                    self.$hook = Some(Arc::new(f));
                    self
                }
            )+
        }
    };
}

event_hooks! {
    on_order_created, order_created_producer: OrderCreatedEvent;
    on_order_confirmed, order_confirmed_producer: OrderConfirmedEvent;
    on_order_annulled, order_annulled_producer: OrderAnnulledEvent;
    on_status_changed, status_changed_producer: OrderStatusChangedEvent;
    on_unmatched_callback, unmatched_callback_producer: UnmatchedCallbackEvent;
    on_reconciliation_conflict, reconciliation_conflict_producer: ReconciliationConflictEvent;
}

impl EventProducers {
    /// Notifies subscribers of a payment outcome that moved an order. Replays are not published.
    pub async fn publish_payment_outcome(&self, applied: &OutcomeApplied, outcome: &PaymentOutcome) {
        let OutcomeApplied::Transitioned { order, .. } = applied else {
            return;
        };
        match outcome {
            PaymentOutcome::Succeeded => {
                for emitter in &self.order_confirmed_producer {
                    emitter.publish_event(OrderConfirmedEvent::new(order.clone())).await;
                }
            },
            PaymentOutcome::Failed(reason) => {
                for emitter in &self.order_annulled_producer {
                    emitter.publish_event(OrderAnnulledEvent::new(order.clone(), reason.as_str())).await;
                }
            },
        }
    }
}
