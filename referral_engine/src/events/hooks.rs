use std::{future::Future, pin::Pin, sync::Arc};

use log::*;

use crate::{
    events::{EventHandler, EventProducer, Handler, NotificationEvent},
    traits::{NotificationSink, NotificationType},
};

/// The publishing side of the engine's event hooks. This is what the referral flow holds on to.
#[derive(Default, Clone)]
pub struct EventProducers {
    pub notification_producer: Vec<EventProducer<NotificationEvent>>,
}

impl NotificationSink for EventProducers {
    async fn notify(&self, user_id: i64, kind: NotificationType, payload: serde_json::Value) {
        if self.notification_producer.is_empty() {
            trace!("📬️ No notification subscribers. Dropping {kind} for user #{user_id}");
            return;
        }
        let event = NotificationEvent::new(user_id, kind, payload);
        for producer in &self.notification_producer {
            producer.publish_event(event.clone()).await;
        }
    }
}

pub struct EventHandlers {
    pub on_notification: Option<EventHandler<NotificationEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_notification = hooks.on_notification.map(|f| EventHandler::new(buffer_size, f));
        Self { on_notification }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_notification {
            result.notification_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_notification {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_notification: Option<Handler<NotificationEvent>>,
}

impl EventHooks {
    pub fn on_notification<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(NotificationEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_notification = Some(Arc::new(f));
        self
    }
}
