pub mod traits;
pub mod http;
pub mod pacer;

pub use http::HttpFetcher;
pub use pacer::Pacer;
pub use traits::Fetcher;

/// Audiobook-only search on the catalog, most relevant first.
pub fn search_url(catalog_host: &str, author: &str) -> String {
    format!(
        "https://{}/search?query={}&format=audiobook-overdrive%2Caudiobook-overdrive-provisional&sortBy=relevance",
        catalog_host,
        urlencoding::encode(author)
    )
}
