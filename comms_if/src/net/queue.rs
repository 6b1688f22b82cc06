//! # Action queue
//!
//! FIFO bridge between the network threads and the control thread. Network threads hold an
//! [`ActionSender`] and push actions as they happen, the control thread owns the [`ActionQueue`]
//! and drains it once at the start of every cycle, applying the actions in submission order.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::mpsc::{channel, Receiver, Sender};
use log::warn;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Receiving end of the queue, owned by the control thread.
pub struct ActionQueue<A> {
    receiver: Receiver<A>,
    sender: Sender<A>,
}

/// Sending end of the queue. Cheap to clone, one per producer thread.
pub struct ActionSender<A> {
    sender: Sender<A>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<A> ActionQueue<A> {
    /// Create a new empty queue.
    pub fn new() -> Self {
        let (sender, receiver) = channel();
        Self { receiver, sender }
    }

    /// Get a new sender for this queue.
    pub fn sender(&self) -> ActionSender<A> {
        ActionSender {
            sender: self.sender.clone(),
        }
    }

    /// Remove and return every action currently in the queue, oldest first.
    ///
    /// Returns once the queue is found empty, so actions pushed while draining may be returned by
    /// this call or by the next one. Each action is returned exactly once either way.
    pub fn drain(&self) -> Vec<A> {
        self.receiver.try_iter().collect()
    }
}

impl<A> Default for ActionQueue<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> ActionSender<A> {
    /// Push an action onto the queue.
    ///
    /// If the queue has been dropped the action is discarded, as there is nobody left to apply it.
    pub fn push(&self, action: A) {
        if self.sender.send(action).is_err() {
            warn!("Action queue closed, action discarded");
        }
    }
}

impl<A> Clone for ActionSender<A> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
