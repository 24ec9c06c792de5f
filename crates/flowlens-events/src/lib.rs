use crossbeam_channel::{Receiver, Sender, unbounded};
use flowlens_core::InternalId;
use serde::{Deserialize, Serialize};

pub mod telemetry;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Event {
    // Graph
    GraphLoaded {
        generation: u64,
        node_count: usize,
        edge_count: usize,
    },
    NodeToggled {
        id: InternalId,
        collapsed: bool,
    },
    HoverChanged {
        id: Option<InternalId>,
    },
    ThemeChanged,

    // Renderer
    /// `mounted == false` means the host fell back to the text listing.
    RenderHealthChanged {
        generation: u64,
        mounted: bool,
    },

    // Session
    CacheCleared {
        entries: usize,
    },

    // Notifications
    StatusUpdate {
        level: StatusLevel,
        message: String,
    },
}

#[derive(Clone)]
pub struct EventBus {
    tx: Sender<Event>,
    rx: Receiver<Event>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn sender(&self) -> Sender<Event> {
        self.tx.clone()
    }

    pub fn receiver(&self) -> Receiver<Event> {
        self.rx.clone()
    }

    pub fn publish(&self, event: Event) {
        let _ = self.tx.send(event);
    }

    /// Dispatch all pending events to a listener.
    pub fn dispatch_to<L: EventListener>(&self, listener: &mut L) {
        while let Ok(event) = self.rx.try_recv() {
            listener.handle_event(&event);
        }
    }

    /// Drain pending events without a listener.
    pub fn drain(&self) -> Vec<Event> {
        self.rx.try_iter().collect()
    }
}

/// Implement this to receive events from the EventBus.
pub trait EventListener {
    fn handle_event(&mut self, event: &Event);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_bus_publish_receive() {
        let bus = EventBus::new();
        let sender = bus.sender();
        let receiver = bus.receiver();

        sender
            .send(Event::NodeToggled {
                id: InternalId(3),
                collapsed: true,
            })
            .unwrap();

        match receiver.recv().unwrap() {
            Event::NodeToggled { id, collapsed } => {
                assert_eq!(id, InternalId(3));
                assert!(collapsed);
            }
            _ => panic!("Expected NodeToggled event"),
        }
    }

    #[test]
    fn test_dispatch_to_listener_in_order() {
        struct Recorder(Vec<Event>);
        impl EventListener for Recorder {
            fn handle_event(&mut self, event: &Event) {
                self.0.push(event.clone());
            }
        }

        let bus = EventBus::new();
        bus.publish(Event::GraphLoaded {
            generation: 1,
            node_count: 2,
            edge_count: 1,
        });
        bus.publish(Event::HoverChanged {
            id: Some(InternalId(0)),
        });
        bus.publish(Event::ThemeChanged);

        let mut recorder = Recorder(Vec::new());
        bus.dispatch_to(&mut recorder);

        assert_eq!(recorder.0.len(), 3);
        assert!(matches!(recorder.0[0], Event::GraphLoaded { generation: 1, .. }));
        assert_eq!(recorder.0[2], Event::ThemeChanged);
        assert!(bus.drain().is_empty());
    }

    #[test]
    fn test_events_serialize() {
        let event = Event::StatusUpdate {
            level: StatusLevel::Error,
            message: "Function name is required.".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
