/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 *
 * Unless you explicitly state otherwise, any contribution intentionally
 * submitted for inclusion in the work by you, as defined in the Apache-2.0
 * license, shall be dual licensed as above, without any additional terms or
 * conditions.
 */

//! Event bus for framework-agnostic client events.
//!
//! A MPMC (multi-producer, multi-consumer) broadcast channel for
//! [`ClientEvent`]s. The bus is an explicit value: create one, hand clones to
//! the controllers that should emit on it, and subscribe wherever the events
//! are consumed.
//!
//! # Example
//!
//! ```ignore
//! use huddle_client::{ClientEvent, EventBus};
//!
//! let bus = EventBus::new();
//! let mut rx = bus.subscribe();
//! tokio::spawn(async move {
//!     while let Ok(event) = rx.recv().await {
//!         if let ClientEvent::Left { room_id } = event {
//!             println!("left {room_id}");
//!         }
//!     }
//! });
//!
//! bus.emit(ClientEvent::JoinFailed("no network".into()));
//! ```

use crate::events::ClientEvent;
use async_broadcast::{broadcast, InactiveReceiver, Receiver, Sender};

/// Default capacity of the event bus channel
pub const EVENT_BUS_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct EventBus {
    sender: Sender<ClientEvent>,
    // Keeps the channel open while nobody is subscribed.
    _keepalive: InactiveReceiver<ClientEvent>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("capacity", &self.sender.capacity())
            .field("receivers", &self.sender.receiver_count())
            .finish()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_capacity(EVENT_BUS_CAPACITY)
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (mut sender, receiver) = broadcast(capacity.max(1));
        // Oldest events are dropped when a slow subscriber falls behind.
        sender.set_overflow(true);
        Self {
            sender,
            _keepalive: receiver.deactivate(),
        }
    }

    /// Subscribe to client events.
    ///
    /// Returns a receiver that will receive all future client events.
    /// Each subscriber receives all events independently (broadcast pattern).
    pub fn subscribe(&self) -> Receiver<ClientEvent> {
        self.sender.new_receiver()
    }

    /// Emit a client event to all subscribers.
    ///
    /// This is a non-blocking operation. With no active subscriber the event
    /// is discarded.
    pub fn emit(&self, event: ClientEvent) {
        let _ = self.sender.try_broadcast(event);
    }

    pub fn capacity(&self) -> usize {
        self.sender.capacity()
    }
}
