//! Update-to-event notifications.

use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};

use log::{debug, trace};

use crate::common::AnimationId;

/// Something the event side is told once per occurrence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    /// An animation reached its end, or was stopped while running
    AnimationFinished(AnimationId),
    /// An update pass completed
    FrameDone {
        /// Number of the completed frame, from 1
        frame: u64,
    },
}

/// Notifications the event side may leave unread before new ones are dropped
pub const NOTIFICATION_CAPACITY: usize = 256;

/// Bounded channel carrying notifications to the event side
pub fn notification_channel() -> (SyncSender<Notification>, Receiver<Notification>) {
    sync_channel(NOTIFICATION_CAPACITY)
}

/// Batches notifications during an update and sends them at its end
#[derive(Debug, Default)]
pub struct NotificationQueue {
    pending: Vec<Notification>,
    sender: Option<SyncSender<Notification>>,
}

impl NotificationQueue {
    /// Queue sending to `sender`, or dropping everything if `None`
    pub fn new(sender: Option<SyncSender<Notification>>) -> Self {
        Self { pending: Vec::new(), sender }
    }

    /// Hold a notification until the next flush
    pub fn push(&mut self, notification: Notification) {
        self.pending.push(notification);
    }

    /// Notifications waiting for the next flush
    pub fn pending(&self) -> &[Notification] {
        &self.pending
    }

    /// Send everything pending; returns the number sent
    ///
    /// Notifications that find the channel full are dropped. A closed
    /// receiver detaches the queue: later notifications are dropped too.
    pub fn flush(&mut self) -> usize {
        let Some(sender) = self.sender.as_ref() else {
            self.pending.clear();
            return 0;
        };

        let mut sent = 0;
        let mut dropped = 0;
        for notification in self.pending.drain(..) {
            match sender.try_send(notification) {
                Ok(()) => sent += 1,
                Err(TrySendError::Full(_)) => dropped += 1,
                Err(TrySendError::Disconnected(_)) => {
                    debug!("notification receiver closed, detaching");
                    self.sender = None;
                    break;
                }
            }
        }
        if dropped > 0 {
            trace!("notification channel full, dropped {dropped}");
        }
        self.pending.clear();
        sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flush_sends_in_order() {
        let (sender, receiver) = notification_channel();
        let mut queue = NotificationQueue::new(Some(sender));
        queue.push(Notification::AnimationFinished(AnimationId::from_raw(4)));
        queue.push(Notification::FrameDone { frame: 1 });
        assert_eq!(queue.flush(), 2);

        let received: Vec<_> = receiver.try_iter().collect();
        assert_eq!(
            received,
            vec![Notification::AnimationFinished(AnimationId::from_raw(4)), Notification::FrameDone { frame: 1 }]
        );
        assert!(queue.pending().is_empty());
    }

    #[test]
    fn test_closed_receiver_detaches() {
        let (sender, receiver) = notification_channel();
        drop(receiver);
        let mut queue = NotificationQueue::new(Some(sender));
        queue.push(Notification::FrameDone { frame: 1 });
        assert_eq!(queue.flush(), 0);
        queue.push(Notification::FrameDone { frame: 2 });
        assert_eq!(queue.flush(), 0);
        assert!(queue.pending().is_empty());
    }

    #[test]
    fn test_unread_notifications_are_bounded() {
        let (sender, receiver) = notification_channel();
        let mut queue = NotificationQueue::new(Some(sender));
        let frames = NOTIFICATION_CAPACITY as u64 + 10;
        for frame in 1..=frames {
            queue.push(Notification::FrameDone { frame });
            queue.flush();
        }

        let received: Vec<_> = receiver.try_iter().collect();
        assert_eq!(received.len(), NOTIFICATION_CAPACITY);
        assert_eq!(received[0], Notification::FrameDone { frame: 1 });

        // reading makes room again
        queue.push(Notification::FrameDone { frame: frames + 1 });
        assert_eq!(queue.flush(), 1);
        assert_eq!(receiver.try_recv().unwrap(), Notification::FrameDone { frame: frames + 1 });
    }
}
