use crate::fetcher::{Fetcher, Pacer};
use crate::model::FetchError;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

pub struct HttpFetcher {
    client: Client,
    pacer: Pacer,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration, min_interval: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            pacer: Pacer::new(min_interval),
        })
    }
}

#[async_trait::async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.pacer.wait().await;
        debug!(url, "GET");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.text().await?)
    }
}
