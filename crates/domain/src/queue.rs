use crate::event::Event;
use crate::shared::entity::{Entity, ID};
use crate::user::{DeliveryChannel, User};
use chrono::prelude::*;

/// The rendered notification content for one `Event`. Rendered once at
/// planning time so deliveries are unaffected by later event edits.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationMessage {
    pub subject: String,
    pub body: String,
}

impl NotificationMessage {
    pub fn from_event(event: &Event) -> Self {
        let when = Utc
            .timestamp_millis_opt(event.starts_at)
            .single()
            .map(|dt| dt.to_rfc2822())
            .unwrap_or_else(|| event.starts_at.to_string());
        let place = event
            .venue_address
            .clone()
            .unwrap_or_else(|| format!("{}, {}", event.location.lat(), event.location.lng()));
        Self {
            subject: format!("Upcoming Event: {}", event.title),
            body: format!(
                "Don't miss out on the upcoming event in your neighbourhood! Event Title: {} on {}. Location: {}",
                event.title, when, place
            ),
        }
    }
}

/// One message on the delivery queue. A full snapshot of everything a
/// worker needs, so deliveries keep working when the event or user rows
/// change underneath them.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueEntry {
    pub id: ID,
    pub account_id: ID,
    pub event_id: ID,
    pub user_id: ID,
    pub channel: DeliveryChannel,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    /// Stable across redeliveries of the same logical notification, lets
    /// downstream transports drop duplicates from at-least-once delivery.
    pub idempotency_key: String,
    /// The entry stays invisible to consumers until this deadline, unix millis.
    pub send_at: i64,
}

impl QueueEntry {
    pub fn new(
        event: &Event,
        user: &User,
        recipient: String,
        message: &NotificationMessage,
        send_at: i64,
    ) -> Self {
        Self {
            id: Default::default(),
            account_id: event.account_id.clone(),
            event_id: event.id.clone(),
            user_id: user.id.clone(),
            channel: user.channel,
            recipient,
            subject: message.subject.clone(),
            body: message.body.clone(),
            idempotency_key: Self::idempotency_key(&event.id, &user.id, user.channel),
            send_at,
        }
    }

    pub fn idempotency_key(event_id: &ID, user_id: &ID, channel: DeliveryChannel) -> String {
        format!("{}.{}.{}", event_id, user_id, channel)
    }
}

impl Entity for QueueEntry {
    fn id(&self) -> &ID {
        &self.id
    }
}

/// A `QueueEntry` that exhausted its redeliveries or failed terminally.
#[derive(Debug, Clone, PartialEq)]
pub struct DeadLetter {
    pub entry: QueueEntry,
    pub reason: String,
    pub redeliveries: i64,
    pub failed_at: i64,
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::geo::GeoPoint;

    fn test_event() -> Event {
        Event {
            id: Default::default(),
            account_id: Default::default(),
            creator_id: Default::default(),
            title: "Jazz in the park".into(),
            description: "Free concert".into(),
            location: GeoPoint::new(40.7829, -73.9654).unwrap(),
            venue_address: Some("Central Park, New York".into()),
            starts_at: 1_735_732_800_000,
            category: "music".into(),
            created: 0,
            updated: 0,
        }
    }

    #[test]
    fn it_renders_notification_message() {
        let event = test_event();
        let message = NotificationMessage::from_event(&event);
        assert_eq!(message.subject, "Upcoming Event: Jazz in the park");
        assert!(message.body.starts_with(
            "Don't miss out on the upcoming event in your neighbourhood! Event Title: Jazz in the park on "
        ));
        assert!(message.body.ends_with("Location: Central Park, New York"));
    }

    #[test]
    fn it_falls_back_to_coordinates_without_address() {
        let mut event = test_event();
        event.venue_address = None;
        let message = NotificationMessage::from_event(&event);
        assert!(message.body.ends_with("Location: 40.7829, -73.9654"));
    }

    #[test]
    fn it_builds_stable_idempotency_keys() {
        let event = test_event();
        let user = User::new(event.account_id.clone(), "gal@example.com".into());
        let message = NotificationMessage::from_event(&event);
        let e1 = QueueEntry::new(&event, &user, "gal@example.com".into(), &message, 10);
        let e2 = QueueEntry::new(&event, &user, "gal@example.com".into(), &message, 10);
        assert_eq!(e1.idempotency_key, e2.idempotency_key);
        assert_ne!(e1.id, e2.id);

        let other_user = User::new(event.account_id.clone(), "other@example.com".into());
        let e3 = QueueEntry::new(&event, &other_user, "other@example.com".into(), &message, 10);
        assert_ne!(e1.idempotency_key, e3.idempotency_key);
    }
}
