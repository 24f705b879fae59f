use serde::{Deserialize, Serialize};
use vicinity_domain::{DeadLetter, DeliveryChannel, ID};

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DeadLetterDTO {
    pub event_id: ID,
    pub user_id: ID,
    pub channel: DeliveryChannel,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub idempotency_key: String,
    pub reason: String,
    pub redeliveries: i64,
    pub failed_at: i64,
}

impl DeadLetterDTO {
    pub fn new(dead_letter: &DeadLetter) -> Self {
        Self {
            event_id: dead_letter.entry.event_id.clone(),
            user_id: dead_letter.entry.user_id.clone(),
            channel: dead_letter.entry.channel,
            recipient: dead_letter.entry.recipient.clone(),
            subject: dead_letter.entry.subject.clone(),
            body: dead_letter.entry.body.clone(),
            idempotency_key: dead_letter.entry.idempotency_key.clone(),
            reason: dead_letter.reason.clone(),
            redeliveries: dead_letter.redeliveries,
            failed_at: dead_letter.failed_at,
        }
    }
}
