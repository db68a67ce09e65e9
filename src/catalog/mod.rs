//! Remote book catalog: listing and per-book detail records.

pub mod model;

pub use model::{Author, BookDetail, CatalogBook, Resource, TableOfContents, TocEntry};

use serde::de::DeserializeOwned;

use crate::error::{CatalogError, ChefResult};
use crate::fetch::Fetch;
use model::CatalogListing;

/// Reads catalog JSON through a [`Fetch`] implementation.
pub struct CatalogClient<'a> {
    fetcher: &'a dyn Fetch,
    base_url: String,
}

impl<'a> CatalogClient<'a> {
    pub fn new(fetcher: &'a dyn Fetch, base_url: &str) -> Self {
        Self {
            fetcher,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// `GET <base>/books`.
    pub fn list_books(&self) -> ChefResult<Vec<CatalogBook>> {
        let listing: CatalogListing = self.read("books")?;
        Ok(listing.into_books())
    }

    /// `GET <base>/<slug>`.
    pub fn book_detail(&self, slug: &str) -> ChefResult<BookDetail> {
        self.read(slug)
    }

    fn read<T: DeserializeOwned>(&self, endpoint: &str) -> ChefResult<T> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let data = self.fetcher.fetch(&url)?;
        serde_json::from_slice(&data).map_err(|e| {
            CatalogError::Malformed {
                url,
                message: e.to_string(),
            }
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::error::{ChefError, FetchError, FetchResult};

    struct MapFetcher(HashMap<String, String>);

    impl Fetch for MapFetcher {
        fn fetch(&self, url: &str) -> FetchResult<Vec<u8>> {
            self.0
                .get(url)
                .map(|body| body.clone().into_bytes())
                .ok_or_else(|| FetchError::Status {
                    url: url.into(),
                    status: 404,
                })
        }
    }

    #[test]
    fn list_and_detail() {
        let fetcher = MapFetcher(HashMap::from([
            (
                "https://api.test/books".to_string(),
                r#"{"books": [{"slug": "intro", "subject": "Math", "title": "Intro"}]}"#.to_string(),
            ),
            (
                "https://api.test/intro".to_string(),
                r#"{"cnx_id": "i-1", "title": "Intro"}"#.to_string(),
            ),
        ]));
        let client = CatalogClient::new(&fetcher, "https://api.test/");

        let books = client.list_books().unwrap();
        assert_eq!(books.len(), 1);
        let detail = client.book_detail(&books[0].slug).unwrap();
        assert_eq!(detail.cnx_id.as_deref(), Some("i-1"));
    }

    #[test]
    fn malformed_json_is_a_catalog_error() {
        let fetcher = MapFetcher(HashMap::from([(
            "https://api.test/books".to_string(),
            "<html>maintenance</html>".to_string(),
        )]));
        let client = CatalogClient::new(&fetcher, "https://api.test");
        let err = client.list_books().unwrap_err();
        assert!(matches!(err, ChefError::Catalog(CatalogError::Malformed { .. })));
        assert!(err.is_book_scoped());
    }
}
