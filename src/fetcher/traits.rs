use crate::model::FetchError;

#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// Returns the body of a successful GET.
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}
