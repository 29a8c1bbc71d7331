//! Ordered, unbounded event queue owned by a single run
//!
//! The flow is the only producer. Exactly one consumer may drain the queue at
//! a time: [`EventQueue::subscribe`] hands out the consumer handle and refuses
//! a second one while the first is alive. Dropping the handle gives it back,
//! so a later consumer resumes at the next unread event. Events are never
//! replayed.

use std::fmt;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use crate::error::{CoreError, CoreResult};

type ReceiverSlot<E> = Arc<Mutex<Option<UnboundedReceiver<E>>>>;

/// Unbounded single-producer queue of domain events
pub struct EventQueue<E> {
    /// Producer side, `None` once closed
    sender: Mutex<Option<UnboundedSender<E>>>,

    /// Consumer side, `None` while a consumer is attached
    receiver: ReceiverSlot<E>,
}

impl<E> EventQueue<E> {
    /// Create a new open queue
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender: Mutex::new(Some(sender)),
            receiver: Arc::new(Mutex::new(Some(receiver))),
        }
    }

    /// Append an event to the tail of the queue.
    ///
    /// Never blocks. Fails with [`CoreError::QueueClosed`] after [`close`](Self::close).
    pub fn push(&self, event: E) -> CoreResult<()> {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        match sender.as_ref() {
            Some(sender) => sender.send(event).map_err(|_| CoreError::QueueClosed),
            None => Err(CoreError::QueueClosed),
        }
    }

    /// Stop accepting events. Buffered events remain readable. Idempotent.
    pub fn close(&self) {
        let mut sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        if sender.take().is_some() {
            debug!("Event queue closed");
        }
    }

    /// Whether the queue has been closed
    pub fn is_closed(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Whether a consumer currently holds the stream
    pub fn has_consumer(&self) -> bool {
        self.receiver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Attach the single consumer.
    ///
    /// Returns [`CoreError::ConsumerAlreadyAttached`] while another
    /// [`EventStream`] for this queue is alive.
    pub fn subscribe(&self) -> CoreResult<EventStream<E>> {
        let receiver = self
            .receiver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(CoreError::ConsumerAlreadyAttached)?;

        debug!("Event queue consumer attached");
        Ok(EventStream {
            receiver: Some(receiver),
            slot: Arc::clone(&self.receiver),
        })
    }
}

impl<E> Default for EventQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EventQueue<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventQueue")
            .field("closed", &self.is_closed())
            .field("has_consumer", &self.has_consumer())
            .finish()
    }
}

/// Consumer handle of an [`EventQueue`].
///
/// Yields buffered events in push order, waits while the queue is empty and
/// open, and ends once the queue is closed and drained.
pub struct EventStream<E> {
    receiver: Option<UnboundedReceiver<E>>,
    slot: ReceiverSlot<E>,
}

impl<E> EventStream<E> {
    /// Wait for the next event, `None` once the queue is closed and drained
    pub async fn next_event(&mut self) -> Option<E> {
        match self.receiver.as_mut() {
            Some(receiver) => receiver.recv().await,
            None => None,
        }
    }
}

impl<E> Stream for EventStream<E> {
    type Item = E;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<E>> {
        let this = self.get_mut();
        match this.receiver.as_mut() {
            Some(receiver) => receiver.poll_recv(cx),
            None => Poll::Ready(None),
        }
    }
}

impl<E> Drop for EventStream<E> {
    fn drop(&mut self) {
        if let Some(receiver) = self.receiver.take() {
            *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(receiver);
            debug!("Event queue consumer detached");
        }
    }
}

impl<E> fmt::Debug for EventStream<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::time::Duration;

    #[tokio::test]
    async fn test_events_are_delivered_in_push_order() {
        let queue = EventQueue::new();
        for i in 0..5 {
            queue.push(i).unwrap();
        }
        queue.close();

        let events: Vec<i32> = queue.subscribe().unwrap().collect().await;
        assert_eq!(events, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_buffers_everything_before_consumption() {
        let queue = EventQueue::new();
        for i in 0..10_000u32 {
            queue.push(i).unwrap();
        }
        queue.close();

        let events: Vec<u32> = queue.subscribe().unwrap().collect().await;
        assert_eq!(events.len(), 10_000);
        assert!(events.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[tokio::test]
    async fn test_push_after_close_is_rejected() {
        let queue = EventQueue::new();
        queue.push("before").unwrap();
        queue.close();
        queue.close();

        assert!(queue.is_closed());
        assert!(matches!(queue.push("after"), Err(CoreError::QueueClosed)));

        let events: Vec<&str> = queue.subscribe().unwrap().collect().await;
        assert_eq!(events, vec!["before"]);
    }

    #[tokio::test]
    async fn test_consumer_waits_for_push() {
        let queue = Arc::new(EventQueue::new());
        let mut stream = queue.subscribe().unwrap();

        let consumer = tokio::spawn(async move { stream.next_event().await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!consumer.is_finished());

        queue.push("hello").unwrap();
        assert_eq!(consumer.await.unwrap(), Some("hello"));
    }

    #[tokio::test]
    async fn test_consumer_wakes_on_close() {
        let queue: Arc<EventQueue<u8>> = Arc::new(EventQueue::new());
        let stream = queue.subscribe().unwrap();

        let consumer = tokio::spawn(async move { stream.collect::<Vec<_>>().await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.close();

        let events = tokio::time::timeout(Duration::from_secs(1), consumer)
            .await
            .expect("consumer should end after close")
            .unwrap();
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_closed_and_drained_queue_ends_immediately() {
        let queue: EventQueue<u8> = EventQueue::new();
        queue.close();

        let mut stream = queue.subscribe().unwrap();
        assert_eq!(stream.next_event().await, None);
    }

    #[tokio::test]
    async fn test_second_concurrent_consumer_is_rejected() {
        let queue: EventQueue<u8> = EventQueue::new();
        let first = queue.subscribe().unwrap();

        assert!(queue.has_consumer());
        assert!(matches!(
            queue.subscribe(),
            Err(CoreError::ConsumerAlreadyAttached)
        ));

        drop(first);
        assert!(!queue.has_consumer());
        assert!(queue.subscribe().is_ok());
    }

    #[tokio::test]
    async fn test_new_consumer_resumes_after_previous_one_dropped() {
        let queue = EventQueue::new();
        queue.push(1).unwrap();
        queue.push(2).unwrap();
        queue.push(3).unwrap();
        queue.close();

        let mut first = queue.subscribe().unwrap();
        assert_eq!(first.next_event().await, Some(1));
        drop(first);

        let rest: Vec<i32> = queue.subscribe().unwrap().collect().await;
        assert_eq!(rest, vec![2, 3]);
    }
}
