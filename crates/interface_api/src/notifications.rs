//! Claim notifications
//!
//! [`ChannelPublisher`] implements the domain's event port by pushing events
//! onto a bounded channel without waiting for room. [`NotificationListener`] drains the channel in a
//! background task and decides who hears about each status change. Delivery
//! is out of scope; the listener logs the outgoing subject.

use async_trait::async_trait;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info};

use core_kernel::{ClaimId, PortError};
use domain_claims::{ClaimEvent, ClaimEventPublisher, ClaimStatus};

/// Who is told about a status change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// The member who owns the claim
    Member,
    Stewards,
    Signators,
}

/// An outgoing notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub claim_id: ClaimId,
    pub recipient: Recipient,
    pub subject: String,
}

/// Builds the notification for an event, if anyone needs one
pub fn notification_for(event: &ClaimEvent) -> Option<Notification> {
    let ClaimEvent::StatusChanged {
        claim_id, new_status, ..
    } = event;
    let reference = claim_id.reference();

    let (recipient, subject) = match new_status {
        ClaimStatus::Review1 => (Recipient::Stewards, format!("Claim {reference} submitted for review")),
        ClaimStatus::Review2 => (Recipient::Stewards, format!("Receipt submitted for claim {reference}")),
        ClaimStatus::Review3 => (Recipient::Signators, format!("Claim {reference} awaiting final approval")),
        ClaimStatus::Revision => (Recipient::Member, format!("Claim {reference} needs revision")),
        ClaimStatus::Receipt => (Recipient::Member, format!("Receipt requested for claim {reference}")),
        ClaimStatus::Approved => (Recipient::Member, format!("Claim {reference} approved")),
        ClaimStatus::Denied => (Recipient::Member, format!("Claim {reference} denied")),
        ClaimStatus::Paid => (Recipient::Member, format!("Claim {reference} paid")),
        ClaimStatus::Draft => return None,
    };

    Some(Notification {
        claim_id: *claim_id,
        recipient,
        subject,
    })
}

/// Event publisher backed by a bounded channel
#[derive(Debug, Clone)]
pub struct ChannelPublisher {
    event_tx: mpsc::Sender<ClaimEvent>,
}

impl ChannelPublisher {
    /// Creates a publisher and the listener that drains it
    pub fn new(buffer: usize) -> (Self, NotificationListener) {
        let (event_tx, event_rx) = mpsc::channel(buffer);
        (Self { event_tx }, NotificationListener { event_rx })
    }
}

#[async_trait]
impl ClaimEventPublisher for ChannelPublisher {
    /// Queues the event without waiting on the listener
    async fn publish(&self, event: &ClaimEvent) -> Result<(), PortError> {
        self.event_tx.try_send(event.clone()).map_err(|e| match e {
            TrySendError::Full(_) => PortError::connection("notification channel is full"),
            TrySendError::Closed(_) => PortError::connection("notification listener has stopped"),
        })
    }
}

/// Background consumer of claim events
pub struct NotificationListener {
    event_rx: mpsc::Receiver<ClaimEvent>,
}

impl NotificationListener {
    /// Processes events until every publisher is dropped
    ///
    /// Returns the number of notifications dispatched.
    pub async fn run(mut self) -> usize {
        info!("notification listener started");
        let mut dispatched = 0;

        while let Some(event) = self.event_rx.recv().await {
            match notification_for(&event) {
                Some(notification) => {
                    info!(
                        claim_id = %notification.claim_id,
                        recipient = ?notification.recipient,
                        subject = %notification.subject,
                        "claim notification"
                    );
                    dispatched += 1;
                }
                None => debug!(claim_id = %event.claim_id(), "no notification for event"),
            }
        }

        info!(dispatched, "notification listener stopped");
        dispatched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::UserId;

    fn changed(old_status: ClaimStatus, new_status: ClaimStatus) -> ClaimEvent {
        ClaimEvent::status_changed(ClaimId::new(), old_status, new_status, UserId::new())
    }

    #[test]
    fn test_recipients_by_status() {
        let cases = [
            (ClaimStatus::Draft, ClaimStatus::Review1, Recipient::Stewards),
            (ClaimStatus::Receipt, ClaimStatus::Review2, Recipient::Stewards),
            (ClaimStatus::Review2, ClaimStatus::Review3, Recipient::Signators),
            (ClaimStatus::Review1, ClaimStatus::Revision, Recipient::Member),
            (ClaimStatus::Review1, ClaimStatus::Receipt, Recipient::Member),
            (ClaimStatus::Review3, ClaimStatus::Approved, Recipient::Member),
            (ClaimStatus::Review1, ClaimStatus::Denied, Recipient::Member),
            (ClaimStatus::Approved, ClaimStatus::Paid, Recipient::Member),
        ];

        for (old, new, expected) in cases {
            let notification = notification_for(&changed(old, new)).unwrap();
            assert_eq!(notification.recipient, expected, "{old} -> {new}");
        }
    }

    #[test]
    fn test_subject_names_claim() {
        let event = changed(ClaimStatus::Review3, ClaimStatus::Approved);
        let notification = notification_for(&event).unwrap();
        assert!(notification.subject.contains(&event.claim_id().reference()));
        assert!(notification.subject.ends_with("approved"));
    }

    #[test]
    fn test_back_to_draft_is_silent() {
        assert!(notification_for(&changed(ClaimStatus::Revision, ClaimStatus::Draft)).is_none());
    }

    #[tokio::test]
    async fn test_listener_drains_channel() {
        let (publisher, listener) = ChannelPublisher::new(8);
        let handle = tokio::spawn(listener.run());

        publisher.publish(&changed(ClaimStatus::Draft, ClaimStatus::Review1)).await.unwrap();
        publisher.publish(&changed(ClaimStatus::Revision, ClaimStatus::Draft)).await.unwrap();
        publisher.publish(&changed(ClaimStatus::Review3, ClaimStatus::Approved)).await.unwrap();
        drop(publisher);

        assert_eq!(handle.await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_publish_after_listener_stops() {
        let (publisher, listener) = ChannelPublisher::new(1);
        drop(listener);

        let err = publisher
            .publish(&changed(ClaimStatus::Draft, ClaimStatus::Review1))
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_full_channel_fails_fast() {
        let (publisher, listener) = ChannelPublisher::new(1);

        publisher.publish(&changed(ClaimStatus::Draft, ClaimStatus::Review1)).await.unwrap();
        let err = publisher
            .publish(&changed(ClaimStatus::Review1, ClaimStatus::Review3))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("full"));

        let handle = tokio::spawn(listener.run());
        drop(publisher);
        assert_eq!(handle.await.unwrap(), 1);
    }
}
