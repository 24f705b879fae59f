use crate::dtos::DeadLetterDTO;
use serde::{Deserialize, Serialize};
use vicinity_domain::DeadLetter;

pub mod report_dead_letters {
    use super::*;

    /// Body POSTed to an account webhook when notifications for that
    /// account failed permanently.
    #[derive(Debug, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct WebhookPayload {
        pub dead_letters: Vec<DeadLetterDTO>,
    }

    impl WebhookPayload {
        pub fn new(dead_letters: &[DeadLetter]) -> Self {
            Self {
                dead_letters: dead_letters.iter().map(DeadLetterDTO::new).collect(),
            }
        }
    }
}
