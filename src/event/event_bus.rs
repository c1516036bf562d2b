use std::any::Any;
use std::any::TypeId;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::RwLock;

use anyhow::Result;
use log::error;

use crate::event::Event;
use crate::subscriber::Subscriber;

type AsyncSubscriber<E> =
    Box<dyn Fn(E) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> + Send + Sync>;
type Subscribers = Arc<RwLock<HashMap<TypeId, Vec<Box<dyn Any + Send + Sync>>>>>;

/// Type-keyed fan-out of gateway events to subscribers.
///
/// Callbacks run on spawned tasks, so `publish` never blocks the gateway.
pub struct EventBus {
    subscribers: Subscribers,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn register_callback<E, F, Fut>(&self, callback: F)
    where
        E: Event,
        F: Fn(E) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let type_id = TypeId::of::<E>();

        let wrapped_sub: AsyncSubscriber<E> = Box::new(move |event| Box::pin(callback(event)));

        let mut subscribers = match self.subscribers.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        subscribers
            .entry(type_id)
            .or_default()
            .push(Box::new(wrapped_sub));
    }

    pub fn register_subscriber<E, S>(&self, subscriber: Arc<S>) -> &Self
    where
        E: Event,
        S: Subscriber<E> + Send + Sync + 'static,
    {
        self.register_callback(move |event: E| {
            let h = subscriber.clone();
            async move { h.callback(event).await }
        });
        self
    }

    pub fn publish<E>(&self, event: E)
    where
        E: Event,
    {
        let type_id = TypeId::of::<E>();
        let subs = match self.subscribers.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(subs_list) = subs.get(&type_id) {
            let mut futures = Vec::new();
            for subs_box in subs_list {
                if let Some(sub) = subs_box.downcast_ref::<AsyncSubscriber<E>>() {
                    futures.push(sub(event.clone()));
                }
            }
            let name = event.event_name();
            tokio::spawn(async move {
                for result in futures::future::join_all(futures).await {
                    if let Err(e) = result {
                        error!("Subscriber failed on `{name}`: {e:?}");
                    }
                }
            });
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use super::*;

    #[derive(Clone)]
    struct Ping(usize);

    impl Event for Ping {}

    #[derive(Clone)]
    struct Other;

    impl Event for Other {}

    #[tokio::test]
    async fn test_publish_reaches_only_matching_subscribers() {
        let bus = EventBus::new();
        let total = Arc::new(AtomicUsize::new(0));
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        let counter = total.clone();
        bus.register_callback(move |event: Ping| {
            let counter = counter.clone();
            let tx = tx.clone();
            async move {
                counter.fetch_add(event.0, Ordering::SeqCst);
                let _ = tx.send(());
                Ok(())
            }
        });

        bus.publish(Other);
        bus.publish(Ping(3));
        rx.recv().await.unwrap();

        assert_eq!(total.load(Ordering::SeqCst), 3);
    }
}
