// src/scanner/queue.rs
//! Bounded, closable multi-producer/multi-consumer work queue
//!
//! A tokio `mpsc` channel whose receiver is shared behind a mutex so any
//! number of workers can pull from it. The queue is closed once every
//! `QueueSender` has been closed or dropped; consumers keep draining buffered
//! items and only then observe end-of-stream.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, Mutex};

/// Every consumer of the queue is gone
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("work queue has no consumers left")]
pub struct QueueClosed;

/// Create a queue holding at most `capacity` pending items
pub fn work_queue<T>(capacity: usize) -> (QueueSender<T>, QueueReceiver<T>) {
    let (tx, rx) = mpsc::channel(capacity);
    (
        QueueSender { tx },
        QueueReceiver {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

/// Producer handle
#[derive(Debug)]
pub struct QueueSender<T> {
    tx: mpsc::Sender<T>,
}

impl<T> Clone for QueueSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> QueueSender<T> {
    /// Enqueue an item, waiting while the queue is full
    pub async fn push(&self, item: T) -> Result<(), QueueClosed> {
        self.tx.send(item).await.map_err(|_| QueueClosed)
    }

    /// Give up this producer's hold on the queue
    pub fn close(self) {
        drop(self);
    }
}

/// Consumer handle; clones share the same underlying queue
#[derive(Debug)]
pub struct QueueReceiver<T> {
    rx: Arc<Mutex<mpsc::Receiver<T>>>,
}

impl<T> Clone for QueueReceiver<T> {
    fn clone(&self) -> Self {
        Self {
            rx: Arc::clone(&self.rx),
        }
    }
}

impl<T> QueueReceiver<T> {
    /// Next item, or `None` once the queue is closed and drained
    pub async fn pop(&self) -> Option<T> {
        let mut rx = self.rx.lock().await;
        rx.recv().await
    }

    /// Blocking variant of [`pop`](Self::pop) for use on blocking threads.
    ///
    /// Panics if called from within an async execution context.
    pub fn blocking_pop(&self) -> Option<T> {
        let mut rx = self.rx.blocking_lock();
        rx.blocking_recv()
    }
}
