use std::{
    collections::HashMap,
    sync::{Arc, Weak},
};

use parking_lot::Mutex;

use crate::track::TrackUri;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RatingEvent {
    pub uri: TrackUri,
    pub rating: u8,
    pub clear: bool,
}

type Listener = Arc<dyn Fn(&RatingEvent) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    by_uri: HashMap<TrackUri, Vec<(u64, Listener)>>,
}

/// Publish/subscribe registry of rating changes, keyed by track URI.  Every
/// overlay showing a track subscribes while mounted.
#[derive(Clone, Default)]
pub struct RatingBus {
    listeners: Arc<Mutex<Listeners>>,
}

impl RatingBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &self,
        uri: TrackUri,
        listener: impl Fn(&RatingEvent) + Send + Sync + 'static,
    ) -> Subscription {
        let mut listeners = self.listeners.lock();
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners
            .by_uri
            .entry(uri.clone())
            .or_default()
            .push((id, Arc::new(listener)));
        Subscription {
            listeners: Arc::downgrade(&self.listeners),
            uri,
            id,
        }
    }

    pub fn publish(&self, event: &RatingEvent) {
        // Listeners run unlocked, they may touch the bus themselves.
        let targets: Vec<Listener> = self
            .listeners
            .lock()
            .by_uri
            .get(&event.uri)
            .map(|subs| subs.iter().map(|(_, l)| l.clone()).collect())
            .unwrap_or_default();
        for listener in targets {
            listener(event);
        }
    }

    pub fn subscriber_count(&self, uri: &TrackUri) -> usize {
        self.listeners
            .lock()
            .by_uri
            .get(uri)
            .map_or(0, |subs| subs.len())
    }
}

/// Removes its listener from the bus when dropped.
pub struct Subscription {
    listeners: Weak<Mutex<Listeners>>,
    uri: TrackUri,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(listeners) = self.listeners.upgrade() else {
            return;
        };
        let mut listeners = listeners.lock();
        if let Some(subs) = listeners.by_uri.get_mut(&self.uri) {
            subs.retain(|(id, _)| *id != self.id);
            if subs.is_empty() {
                listeners.by_uri.remove(&self.uri);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn test_publish_reaches_only_matching_uri() {
        let bus = RatingBus::new();
        let hits_x = Arc::new(AtomicUsize::new(0));
        let hits_y = Arc::new(AtomicUsize::new(0));

        let _x1 = bus.subscribe("x".into(), {
            let hits = hits_x.clone();
            move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
            }
        });
        let _x2 = bus.subscribe("x".into(), {
            let hits = hits_x.clone();
            move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
            }
        });
        let _y = bus.subscribe("y".into(), {
            let hits = hits_y.clone();
            move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
            }
        });

        bus.publish(&RatingEvent {
            uri: "x".into(),
            rating: 3,
            clear: false,
        });
        assert_eq!(hits_x.load(Ordering::SeqCst), 2);
        assert_eq!(hits_y.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_dropped_subscription_is_removed() {
        let bus = RatingBus::new();
        let sub = bus.subscribe("x".into(), |_| {});
        assert_eq!(bus.subscriber_count(&"x".into()), 1);
        drop(sub);
        assert_eq!(bus.subscriber_count(&"x".into()), 0);
    }
}
