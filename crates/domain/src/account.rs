use crate::shared::entity::{Entity, ID};
use serde::{Deserialize, Serialize};
use vicinity_utils::create_random_secret;

const API_KEY_LEN: usize = 30;

/// An `Account` acts as a namespace for all other resources and lets multiple different
/// applications use the same instance of this server without interfering
/// with each other.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: ID,
    pub secret_api_key: String,
    pub settings: AccountSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountSettings {
    pub webhook: Option<AccountWebhookSettings>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountWebhookSettings {
    pub url: String,
    pub key: String,
}

impl AccountSettings {
    pub fn set_webhook_url(&mut self, webhook_url: Option<String>) -> bool {
        match webhook_url {
            Some(url) => {
                if let Ok(parsed_url) = url::Url::parse(&url) {
                    // TODO: in the future, only https endpoints will be allowed
                    let allowed_schemes = vec!["https", "http"];
                    if !allowed_schemes.contains(&parsed_url.scheme()) {
                        return false;
                    }
                } else {
                    return false;
                }

                if let Some(webhook_settings) = self.webhook.as_mut() {
                    webhook_settings.url = url;
                } else {
                    self.webhook = Some(AccountWebhookSettings {
                        url,
                        key: Account::generate_secret_api_key(),
                    });
                }
            }
            None => {
                self.webhook = None;
            }
        };
        true
    }
}

impl Default for AccountSettings {
    fn default() -> Self {
        Self { webhook: None }
    }
}

impl Account {
    pub fn new() -> Self {
        Self {
            id: Default::default(),
            secret_api_key: Self::generate_secret_api_key(),
            settings: Default::default(),
        }
    }

    pub fn generate_secret_api_key() -> String {
        let rand_secret = create_random_secret(API_KEY_LEN);
        format!("sk_{}", rand_secret)
    }
}

impl Entity for Account {
    fn id(&self) -> &ID {
        &self.id
    }
}

impl Default for Account {
    fn default() -> Self {
        Self::new()
    }
}
