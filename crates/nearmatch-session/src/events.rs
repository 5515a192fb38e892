//! The session event bus.
//!
//! One broadcast channel carries every [`SessionEvent`]; each subscriber
//! holds a feed filtered to the sessions it participates in. Delivery is
//! at-most-once per subscriber: a receiver that lags far enough behind
//! skips events rather than erroring, and reconnecting clients recover
//! authoritative state from the session store, not from the bus.

use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::broadcast;
use tokio_stream::Stream;
use tracing::{debug, warn};

use nearmatch_types::{AccountId, SessionEvent};

/// Publishing side of the session bus.
pub struct SessionBus {
    sender: broadcast::Sender<SessionEvent>,
    capacity: usize,
}

impl SessionBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender, capacity }
    }

    /// Publish a transition. Returns the number of live subscribers the
    /// event reached; zero subscribers is not an error — the transition
    /// is already durable in the session store.
    pub fn publish(&self, event: SessionEvent) -> usize {
        let pair = event.pair;
        let transition = event.transition;
        match self.sender.send(event) {
            Ok(receivers) => {
                debug!(%pair, ?transition, receivers, "session event published");
                receivers
            }
            Err(_) => {
                warn!(%pair, ?transition, "session event dropped (no subscribers)");
                0
            }
        }
    }

    /// Subscribe to transitions of sessions involving `account`.
    #[must_use]
    pub fn subscribe_for(&self, account: AccountId) -> ParticipantFeed {
        ParticipantFeed {
            receiver: self.sender.subscribe(),
            account,
        }
    }

    /// Stream adapter over [`Self::subscribe_for`].
    #[must_use]
    pub fn stream_for(&self, account: AccountId) -> ParticipantStream {
        ParticipantStream {
            feed: self.subscribe_for(account),
        }
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// A participant's filtered view of the session bus.
pub struct ParticipantFeed {
    receiver: broadcast::Receiver<SessionEvent>,
    account: AccountId,
}

impl ParticipantFeed {
    /// Receive the next event involving this participant.
    ///
    /// Returns `None` once the bus is gone. Lagged receivers skip the
    /// missed events and keep going.
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        loop {
            let event = match self.receiver.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    debug!(account = %self.account, lagged = count, "feed lagged, events skipped");
                    continue;
                }
            };
            if event.involves(self.account) {
                return Some(event);
            }
        }
    }

    /// Non-blocking receive. `Ok(None)` means no matching event is
    /// queued right now; `Err(())` means the bus is gone.
    #[allow(clippy::result_unit_err)]
    pub fn try_recv(&mut self) -> Result<Option<SessionEvent>, ()> {
        loop {
            let event = match self.receiver.try_recv() {
                Ok(event) => event,
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => return Err(()),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            };
            if event.involves(self.account) {
                return Ok(Some(event));
            }
        }
    }

    #[must_use]
    pub fn account(&self) -> AccountId {
        self.account
    }
}

/// `Stream` wrapper over a [`ParticipantFeed`] for combinator use.
pub struct ParticipantStream {
    feed: ParticipantFeed,
}

impl Stream for ParticipantStream {
    type Item = SessionEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.feed.try_recv() {
            Ok(Some(event)) => Poll::Ready(Some(event)),
            Ok(None) => {
                cx.waker().wake_by_ref();
                Poll::Pending
            }
            Err(()) => Poll::Ready(None),
        }
    }
}
