// Catalog page parsing: search result pages and title detail pages, plus
// the award list pages rosters are built from.

pub mod availability;
pub mod award;
pub mod search;
mod text;

pub use search::SearchPage;

/// Parser bound to one OverDrive catalog host.
#[derive(Debug, Clone)]
pub struct OverDriveParser {
    catalog_host: String,
}

impl OverDriveParser {
    pub fn new(catalog_host: impl Into<String>) -> Self {
        Self {
            catalog_host: catalog_host.into(),
        }
    }

    pub fn catalog_host(&self) -> &str {
        &self.catalog_host
    }

    /// Canonical detail page of a title; also where it is borrowed from.
    pub fn borrow_url(&self, book_id: &str) -> String {
        media_url(&self.catalog_host, book_id)
    }
}

pub fn media_url(catalog_host: &str, book_id: &str) -> String {
    format!("https://{}/media/{}", catalog_host, book_id)
}
