//! Wikipedia REST API specific code
//!
//! We only use the `/page/related/{title}` endpoint which returns a list of pages related to
//! the given one:
//!
//! ```json
//! { "pages": [ { "title": "...", "description": "...", "thumbnail": { "source": "..." }, ... } ] }
//! ```
//!
//! Only `title` is mandatory, everything else is kept when present.
//!

use std::time::Duration;

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{FetchError, Related};

/// Public English Wikipedia REST API
pub const WIKIPEDIA_API: &str = "https://en.wikipedia.org/api/rest_v1";

/// Default per-request timeout
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Where the articles themselves live
const WIKIPEDIA_PAGE: &str = "https://en.wikipedia.org/wiki/";

/// Add this and the title to `base_url`
const RELATED: &str = "/page/related/";

/// Everything that can not stay as-is inside a single path segment
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Thumbnail {
    pub source: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct PageUrl {
    pub page: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ContentUrls {
    pub desktop: Option<PageUrl>,
}

/// One entry of the `pages` array
///
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RelatedArticle {
    /// Page title, the only thing we really need
    pub title: String,
    /// Short description
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<Thumbnail>,
    #[serde(default)]
    pub content_urls: Option<ContentUrls>,
}

impl RelatedArticle {
    pub fn new(title: &str) -> Self {
        RelatedArticle {
            title: title.to_string(),
            description: None,
            thumbnail: None,
            content_urls: None,
        }
    }

    pub fn thumbnail_url(&self) -> Option<&str> {
        self.thumbnail.as_ref().map(|t| t.source.as_str())
    }

    /// Page URL as given by the API or built from the title.
    ///
    pub fn url(&self) -> String {
        match self.content_urls.as_ref().and_then(|u| u.desktop.as_ref()) {
            Some(u) => u.page.clone(),
            None => format!("{}{}", WIKIPEDIA_PAGE, path_segment(&self.title)),
        }
    }
}

/// What the API sends back
///
#[derive(Debug, Deserialize)]
struct RelatedPages {
    pages: Vec<RelatedArticle>,
}

/// Spaces become underscores then the whole thing is percent-encoded.
///
pub fn path_segment(place: &str) -> String {
    utf8_percent_encode(&place.replace(' ', "_"), SEGMENT).to_string()
}

/// Parse the body of a `/page/related` answer.
///
pub fn parse_related(body: &str) -> Result<Vec<RelatedArticle>, FetchError> {
    let data: RelatedPages = serde_json::from_str(body)?;
    Ok(data.pages)
}

/// This is the Wikipedia client/source struct.
///
#[derive(Clone, Debug)]
pub struct Wikipedia {
    /// Base site url taken from config
    pub base_url: String,
    /// Per-request timeout, set on `client`
    pub timeout: Duration,
    /// reqwest client
    pub client: Client,
}

impl Wikipedia {
    #[tracing::instrument]
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        trace!("wikipedia::new");

        let client = Client::builder().timeout(timeout).build()?;
        Ok(Wikipedia {
            base_url: base_url.trim_end_matches('/').to_owned(),
            timeout,
            client,
        })
    }

    /// Full URL for the related pages of `place`.
    ///
    pub fn related_url(&self, place: &str) -> String {
        format!("{}{}{}", self.base_url, RELATED, path_segment(place))
    }
}

#[async_trait]
impl Related for Wikipedia {
    fn name(&self) -> String {
        "wikipedia".to_string()
    }

    /// Single call API
    ///
    #[tracing::instrument(skip(self))]
    async fn related(&self, place: &str) -> Result<Vec<RelatedArticle>, FetchError> {
        let url = self.related_url(place);
        trace!("Fetching related pages from {}…", url);

        let resp = http_get!(self, &url)
            .await
            .map_err(|e| FetchError::from_transport(&url, e))?;

        // Check status
        //
        match resp.status() {
            StatusCode::OK => {
                trace!("OK");
            }
            code => {
                return Err(FetchError::Status(code.as_u16(), url));
            }
        }

        let body = resp
            .text()
            .await
            .map_err(|e| FetchError::from_transport(&url, e))?;
        debug!("got {} bytes", body.len());

        parse_related(&body)
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn setup_wikipedia(server: &MockServer) -> Wikipedia {
        Wikipedia::new(&server.base_url(), Duration::from_secs(5)).unwrap()
    }

    #[rstest]
    #[case("San Francisco", "San_Francisco")]
    #[case("San José", "San_Jos%C3%A9")]
    #[case("AC/DC", "AC%2FDC")]
    #[case("Brussels", "Brussels")]
    fn test_path_segment(#[case] place: &str, #[case] want: &str) {
        assert_eq!(want, path_segment(place));
    }

    #[test]
    fn test_new_always_has_timeout() {
        let site = Wikipedia::new(WIKIPEDIA_API, FETCH_TIMEOUT).unwrap();
        assert_eq!(Duration::from_secs(5), site.timeout);
        assert_eq!(WIKIPEDIA_API, site.base_url);

        let site = Wikipedia::new("http://localhost:8080/", Duration::from_millis(200)).unwrap();
        assert_eq!(Duration::from_millis(200), site.timeout);
        assert_eq!("http://localhost:8080", site.base_url);
    }

    #[test]
    fn test_related_url() {
        let site = Wikipedia::new(WIKIPEDIA_API, FETCH_TIMEOUT).unwrap();
        assert_eq!(
            "https://en.wikipedia.org/api/rest_v1/page/related/San_Jos%C3%A9",
            site.related_url("San José")
        );
    }

    #[test]
    fn test_parse_related_in_order() {
        let body = json!({ "pages": [ { "title": "A" }, { "title": "B" }, { "title": "C" } ] });
        let pages = parse_related(&body.to_string()).unwrap();
        let titles: Vec<_> = pages.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(vec!["A", "B", "C"], titles);
    }

    #[test]
    fn test_parse_related_extra_fields() {
        let body = json!({ "pages": [ {
            "title": "Heredia",
            "description": "City in Costa Rica",
            "thumbnail": { "source": "https://upload.example/h.jpg", "width": 320 },
            "content_urls": { "desktop": { "page": "https://en.wikipedia.org/wiki/Heredia" } },
            "pageid": 42
        } ] });
        let pages = parse_related(&body.to_string()).unwrap();
        assert_eq!(1, pages.len());
        assert_eq!(Some("https://upload.example/h.jpg"), pages[0].thumbnail_url());
        assert_eq!("https://en.wikipedia.org/wiki/Heredia", pages[0].url());
    }

    #[test]
    fn test_article_url_from_title() {
        let a = RelatedArticle::new("Central Valley");
        assert_eq!("https://en.wikipedia.org/wiki/Central_Valley", a.url());
    }

    #[rstest]
    #[case("not json at all")]
    #[case("{}")]
    #[case(r#"{ "pages": "nope" }"#)]
    #[case(r#"{ "pages": [ { "description": "no title" } ] }"#)]
    fn test_parse_related_malformed(#[case] body: &str) {
        let res = parse_related(body);
        assert!(matches!(res, Err(FetchError::Decode(_))));
    }

    #[tokio::test]
    async fn test_fetch_related() {
        let server = MockServer::start_async().await;
        let body = json!({ "pages": [ { "title": "A" }, { "title": "B" }, { "title": "C" } ] });
        let m = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/page/related/San_Francisco")
                    .header("user-agent", crate::version());
                then.status(200)
                    .header("content-type", "application/json")
                    .body(body.to_string());
            })
            .await;

        let site = setup_wikipedia(&server);
        let pages = site.related("San Francisco").await.unwrap();
        m.assert_async().await;

        let titles: Vec<_> = pages.into_iter().map(|p| p.title).collect();
        assert_eq!(vec!["A", "B", "C"], titles);
    }

    #[tokio::test]
    async fn test_fetch_related_empty() {
        let server = MockServer::start_async().await;
        let m = server
            .mock_async(|when, then| {
                when.method(GET).path("/page/related/Nowhere");
                then.status(200).body(r#"{ "pages": [] }"#);
            })
            .await;

        let site = setup_wikipedia(&server);
        let pages = site.related("Nowhere").await.unwrap();
        m.assert_async().await;
        assert!(pages.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_related_not_found() {
        let server = MockServer::start_async().await;
        let m = server
            .mock_async(|when, then| {
                when.method(GET).path("/page/related/Atlantis");
                then.status(404).body("not found");
            })
            .await;

        let site = setup_wikipedia(&server);
        let res = site.related("Atlantis").await;
        m.assert_async().await;
        assert!(matches!(res, Err(FetchError::Status(404, _))));
    }

    #[tokio::test]
    async fn test_fetch_related_malformed() {
        let server = MockServer::start_async().await;
        let _m = server
            .mock_async(|when, then| {
                when.method(GET).path("/page/related/Garbage");
                then.status(200).body("<html>oops</html>");
            })
            .await;

        let site = setup_wikipedia(&server);
        let res = site.related("Garbage").await;
        assert!(matches!(res, Err(FetchError::Decode(_))));
    }

    #[tokio::test]
    async fn test_fetch_related_timeout() {
        let server = MockServer::start_async().await;
        let _m = server
            .mock_async(|when, then| {
                when.method(GET).path("/page/related/Slow");
                then.status(200)
                    .delay(Duration::from_secs(2))
                    .body(r#"{ "pages": [] }"#);
            })
            .await;

        let site = Wikipedia::new(&server.base_url(), Duration::from_millis(200)).unwrap();
        let res = site.related("Slow").await;
        assert!(matches!(res, Err(FetchError::Timeout(_))));
    }
}
