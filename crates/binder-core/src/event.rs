//! Change notifications
//!
//! Events are fanned out over `std::sync::mpsc` channels; a subscriber
//! unsubscribes by dropping its receiver.

use serde::{Deserialize, Serialize};
use std::sync::mpsc::{self, Receiver, Sender};

use crate::item::{FieldMutation, ItemId};

/// Events emitted by the binder when items or navigation change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BinderEvent {
    Created {
        id: ItemId,
        parent: Option<ItemId>,
    },
    Updated {
        id: ItemId,
        mutations: Vec<FieldMutation>,
    },
    Moved {
        id: ItemId,
        from: Option<ItemId>,
        to: ItemId,
    },
    Split {
        original: ItemId,
        created: ItemId,
    },
    Merged {
        target: ItemId,
        removed: Vec<ItemId>,
    },
    Imported {
        parent: ItemId,
        created: Vec<ItemId>,
    },
    /// A parent's child order was rewritten in place
    Reordered(ItemId),
    /// An item was moved into the trash root
    Deleted {
        id: ItemId,
        from: Option<ItemId>,
    },
    /// Selection, view root, hoist, bookmarks, search, or view mode changed
    NavigationChanged,
}

/// Fan-out of events to every live subscriber.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Vec<Sender<BinderEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber. Dropping the receiver unsubscribes.
    pub fn subscribe(&mut self) -> Receiver<BinderEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    /// Deliver an event, pruning subscribers whose receiver is gone.
    pub fn emit(&mut self, event: BinderEvent) {
        if self.subscribers.is_empty() {
            return;
        }
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
