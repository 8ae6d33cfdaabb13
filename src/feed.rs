use async_trait::async_trait;

use crate::error::Result;
use crate::schema::SyncedTransaction;

/// Source of transactions for a linked account.
///
/// Only newly added transactions are read; cursors, pagination and
/// modified/removed updates are not tracked.
#[async_trait]
pub trait TransactionFeed: Send + Sync {
    async fn sync(&self, access_token: &str) -> Result<Vec<SyncedTransaction>>;
}

#[cfg(feature = "plaid")]
pub use plaid::PlaidClient;

#[cfg(feature = "plaid")]
mod plaid {
    use async_trait::async_trait;
    use log::debug;
    use reqwest::Client;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    use super::TransactionFeed;
    use crate::config::{PlaidConfig, PLAID_API_VERSION};
    use crate::error::{InsightError, Result};
    use crate::schema::SyncedTransaction;

    const SYNC_PAGE_SIZE: u32 = 100;
    const SANDBOX_INSTITUTION: &str = "ins_35";

    #[derive(Serialize)]
    struct SyncRequest<'a> {
        client_id: &'a str,
        secret: &'a str,
        access_token: &'a str,
        count: u32,
        options: SyncOptions,
    }

    #[derive(Serialize)]
    struct SyncOptions {
        include_original_description: bool,
    }

    #[derive(Deserialize)]
    struct SyncResponse {
        #[serde(default)]
        added: Vec<SyncedTransaction>,
    }

    #[derive(Deserialize)]
    struct PublicTokenResponse {
        public_token: String,
    }

    #[derive(Deserialize)]
    struct PlaidErrorBody {
        error_type: Option<String>,
        error_code: Option<String>,
        error_message: Option<String>,
    }

    /// Plaid `/transactions/sync` client.
    #[derive(Clone)]
    pub struct PlaidClient {
        client: Client,
        config: PlaidConfig,
    }

    impl PlaidClient {
        pub fn new(config: PlaidConfig) -> Self {
            Self {
                client: Client::new(),
                config,
            }
        }

        async fn post<B: Serialize, R: for<'de> Deserialize<'de>>(
            &self,
            path: &str,
            body: &B,
        ) -> Result<R> {
            let url = format!("{}{}", self.config.host(), path);
            let res = self
                .client
                .post(&url)
                .header("Plaid-Version", PLAID_API_VERSION)
                .json(body)
                .send()
                .await?;
            let status = res.status();

            if !status.is_success() {
                let err_text = res.text().await?;
                let detail = match serde_json::from_str::<PlaidErrorBody>(&err_text) {
                    Ok(body) => format!(
                        "{} {}: {}",
                        body.error_type.unwrap_or_default(),
                        body.error_code.unwrap_or_default(),
                        body.error_message.unwrap_or_default()
                    ),
                    Err(_) => err_text,
                };
                return Err(InsightError::Provider(format!(
                    "Plaid {} failed (status {}): {}",
                    path, status, detail
                )));
            }

            Ok(res.json().await?)
        }

        /// Creates a sandbox public token for the test institution using
        /// custom credentials.
        pub async fn create_sandbox_public_token(
            &self,
            username: &str,
            password: &str,
        ) -> Result<String> {
            let body = json!({
                "client_id": self.config.client_id,
                "secret": self.config.secret,
                "institution_id": SANDBOX_INSTITUTION,
                "initial_products": ["auth", "transactions"],
                "options": {
                    "override_username": username,
                    "override_password": password,
                }
            });
            let response: PublicTokenResponse =
                self.post("/sandbox/public_token/create", &body).await?;
            Ok(response.public_token)
        }
    }

    #[async_trait]
    impl TransactionFeed for PlaidClient {
        async fn sync(&self, access_token: &str) -> Result<Vec<SyncedTransaction>> {
            let request = SyncRequest {
                client_id: &self.config.client_id,
                secret: &self.config.secret,
                access_token,
                count: SYNC_PAGE_SIZE,
                options: SyncOptions {
                    include_original_description: true,
                },
            };

            let response: SyncResponse = self.post("/transactions/sync", &request).await?;
            debug!("Plaid sync returned {} added transaction(s)", response.added.len());
            Ok(response.added)
        }
    }
}
