//! Page source backed by plain HTTP requests against an image search endpoint.
//!
//! Instead of scrolling a browser, every `request_more` fetches the next
//! results page (`ijn` parameter) and appends it to the rendered snapshot.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::extract::{PageSource, PageSourceError};
use crate::utils::HttpClient;

/// Default image search endpoint
pub const DEFAULT_SEARCH_URL: &str = "https://www.google.com/search";

/// HTTP-backed [`PageSource`]
#[derive(Debug)]
pub struct HttpPageSource {
    client: HttpClient,
    base_url: String,
    query: String,
    page: usize,
    pages: Vec<String>,
    disposed: bool,
}

impl HttpPageSource {
    /// Load the first results page for `query`
    pub async fn open(
        client: HttpClient,
        base_url: impl Into<String>,
        query: impl Into<String>,
    ) -> Result<Self, PageSourceError> {
        let mut source = Self {
            client,
            base_url: base_url.into(),
            query: query.into(),
            page: 0,
            pages: Vec::new(),
            disposed: false,
        };

        let first = source.fetch_page(0).await?.ok_or_else(|| {
            PageSourceError::Unavailable("search endpoint rejected the first page".to_string())
        })?;
        source.pages.push(first);
        Ok(source)
    }

    /// URL of the `page`-th results page
    pub fn page_url(&self, page: usize) -> String {
        format!(
            "{}?q={}&tbm=isch&ijn={}",
            self.base_url,
            urlencoding::encode(&self.query),
            page
        )
    }

    /// Fetch one page; `None` when the endpoint answers with a non-2xx status
    async fn fetch_page(&self, page: usize) -> Result<Option<String>, PageSourceError> {
        let url = self.page_url(page);
        debug!(page, url = %url, "Requesting results page");

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            warn!(page, status = %response.status(), "Results page request failed");
            return Ok(None);
        }

        Ok(Some(response.text().await?))
    }

    fn ensure_open(&self) -> Result<(), PageSourceError> {
        if self.disposed {
            return Err(PageSourceError::Unavailable(
                "page source already disposed".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn current_markup(&mut self) -> Result<String, PageSourceError> {
        self.ensure_open()?;
        Ok(self.pages.concat())
    }

    async fn request_more(&mut self) -> Result<(), PageSourceError> {
        self.ensure_open()?;
        self.page += 1;
        match self.fetch_page(self.page).await {
            Ok(Some(markup)) => self.pages.push(markup),
            Ok(None) => {}
            // A lost page is an empty page; the stall counter decides when to stop
            Err(e) => warn!(page = self.page, error = %e, "Results page request failed"),
        }
        Ok(())
    }

    async fn dispose(&mut self) -> Result<(), PageSourceError> {
        self.disposed = true;
        self.pages.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ControlProbe;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn page(locators: &[&str]) -> String {
        locators
            .iter()
            .map(|l| format!(r#"<div class="rg_meta">{{"ou":"{}"}}</div>"#, l))
            .collect()
    }

    #[tokio::test]
    async fn test_pages_are_appended() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "apple fruit"))
            .and(query_param("ijn", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page(&["https://a.example/1.jpg"])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("ijn", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page(&["https://a.example/2.jpg"])))
            .mount(&server)
            .await;

        let client = HttpClient::new().unwrap();
        let mut source = HttpPageSource::open(client, format!("{}/search", server.uri()), "apple fruit")
            .await
            .unwrap();

        let first = source.current_markup().await.unwrap();
        assert!(first.contains("1.jpg"));
        assert!(!first.contains("2.jpg"));

        source.request_more().await.unwrap();
        let both = source.current_markup().await.unwrap();
        assert!(both.contains("1.jpg") && both.contains("2.jpg"));

        assert_eq!(source.advance_control().await.unwrap(), ControlProbe::Absent);
    }

    #[tokio::test]
    async fn test_missing_page_is_not_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("ijn", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page(&["https://a.example/1.jpg"])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("ijn", "1"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = HttpClient::new().unwrap();
        let mut source = HttpPageSource::open(client, format!("{}/search", server.uri()), "pears")
            .await
            .unwrap();
        let before = source.current_markup().await.unwrap();
        source.request_more().await.unwrap();
        assert_eq!(source.current_markup().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_timed_out_page_keeps_snapshot() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("ijn", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page(&["https://a.example/1.jpg"])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("ijn", "1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(page(&["https://a.example/2.jpg"]))
                    .set_delay(std::time::Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let client = HttpClient::with_settings("test", std::time::Duration::from_millis(300)).unwrap();
        let mut source = HttpPageSource::open(client, format!("{}/search", server.uri()), "figs")
            .await
            .unwrap();
        let before = source.current_markup().await.unwrap();

        source.request_more().await.unwrap();
        assert_eq!(source.current_markup().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_unreachable_first_page_is_fatal() {
        let client = HttpClient::with_settings("test", std::time::Duration::from_secs(2)).unwrap();
        let result = HttpPageSource::open(client, "http://127.0.0.1:9/search", "figs").await;
        assert!(matches!(result, Err(PageSourceError::Network(_))));
    }

    #[tokio::test]
    async fn test_rejected_first_page_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = HttpClient::new().unwrap();
        let result = HttpPageSource::open(client, format!("{}/search", server.uri()), "pears").await;
        assert!(matches!(result, Err(PageSourceError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_disposed_source_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;

        let client = HttpClient::new().unwrap();
        let mut source = HttpPageSource::open(client, format!("{}/search", server.uri()), "kiwi")
            .await
            .unwrap();
        source.dispose().await.unwrap();
        assert!(source.current_markup().await.is_err());
        assert!(source.request_more().await.is_err());
    }

    #[test]
    fn test_page_url_encodes_query() {
        let source = HttpPageSource {
            client: HttpClient::new().unwrap(),
            base_url: DEFAULT_SEARCH_URL.to_string(),
            query: "apple fruit".to_string(),
            page: 0,
            pages: Vec::new(),
            disposed: false,
        };
        assert_eq!(
            source.page_url(2),
            "https://www.google.com/search?q=apple%20fruit&tbm=isch&ijn=2"
        );
    }
}
