//! Authenticated HTTP transport for the knowledge-base v2 API.
//!
//! Wraps `reqwest` with basic auth and cursor-following pagination over the
//! collection endpoints. Collection fetches are fail-fast: a single page
//! error aborts the whole fetch for that entity type. Content and attachment
//! failures are tolerated upstream, in the orchestrator.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use wikimirror_shared::{Attachment, MirrorError, Page, Result, Space};

/// Path prefix of the v2 API under the site root.
const API_BASE_PATH: &str = "/wiki/api/v2";

/// Collection page size requested on every paginated call.
const PAGE_LIMIT: &str = "100";

/// User-Agent string for all requests.
const USER_AGENT: &str = concat!("wikimirror/", env!("CARGO_PKG_VERSION"));

/// Per-request timeout. There is no run-wide deadline; this is the only
/// bound on a hung worker.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Wire envelope
// ---------------------------------------------------------------------------

/// One page of a paginated collection response.
#[derive(Debug, Deserialize)]
struct Paged<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
    #[serde(rename = "_links", default)]
    links: Option<Links>,
}

#[derive(Debug, Deserialize)]
struct Links {
    #[serde(default)]
    next: Option<String>,
}

// ---------------------------------------------------------------------------
// ApiClient
// ---------------------------------------------------------------------------

/// Authenticated client for one site. Cheap to clone; clones share the
/// underlying connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    api_base: Url,
    site_root: Url,
    email: String,
    token: String,
}

impl ApiClient {
    /// Client for a production site: API base is `https://{domain}/wiki/api/v2`.
    pub fn new(domain: &str, email: &str, token: &str) -> Result<Self> {
        let api_base = Url::parse(&format!("https://{domain}{API_BASE_PATH}"))
            .map_err(|e| MirrorError::config(format!("invalid domain '{domain}': {e}")))?;
        Self::with_base_url(api_base, email, token)
    }

    /// Client pointed at an explicit API base URL. The site root used to
    /// resolve relative download links is derived from the base's origin.
    /// Deployments differ in their base-path conventions; this constructor
    /// covers the non-default ones (and test servers).
    pub fn with_base_url(api_base: Url, email: &str, token: &str) -> Result<Self> {
        let mut site_root = api_base.clone();
        site_root.set_path("/");
        site_root.set_query(None);

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| MirrorError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_base,
            site_root,
            email: email.to_string(),
            token: token.to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.api_base.as_str().trim_end_matches('/'))
    }

    /// GET an API path and decode the JSON response.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let url = self.endpoint(path);

        let response = self
            .http
            .get(&url)
            .query(query)
            .basic_auth(&self.email, Some(&self.token))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| MirrorError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| MirrorError::Network(format!("{url}: body read failed: {e}")))?;

        if !status.is_success() {
            return Err(MirrorError::Api {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| MirrorError::decode(format!("{path}: {e}")))
    }

    /// Follow continuation cursors until the collection at `path` is
    /// exhausted, concatenating results in page order.
    ///
    /// Terminates when the response carries no continuation link, when the
    /// cursor cannot be extracted from it, or when the extracted cursor is
    /// empty. Any single page-fetch error aborts the whole collection fetch.
    async fn fetch_all<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let mut all: Vec<T> = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut query: Vec<(&str, &str)> = vec![("limit", PAGE_LIMIT)];
            if let Some(c) = cursor.as_deref() {
                query.push(("cursor", c));
            }

            let page: Paged<T> = self.get_json(path, &query).await?;
            all.extend(page.results);

            match self.next_cursor(page.links.as_ref()) {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        debug!(path, count = all.len(), "collection fetch complete");
        Ok(all)
    }

    /// Extract the `cursor` query parameter from a continuation link.
    fn next_cursor(&self, links: Option<&Links>) -> Option<String> {
        let next = links?.next.as_deref()?;
        if next.is_empty() {
            return None;
        }
        let resolved = self.site_root.join(next).ok()?;
        let cursor = resolved
            .query_pairs()
            .find_map(|(key, value)| (key == "cursor").then(|| value.into_owned()))?;
        if cursor.is_empty() { None } else { Some(cursor) }
    }

    // -----------------------------------------------------------------------
    // Typed operations
    // -----------------------------------------------------------------------

    /// All spaces on the site.
    pub async fn spaces(&self) -> Result<Vec<Space>> {
        self.fetch_all("/spaces").await
    }

    /// All pages in a space (summaries, no body).
    pub async fn space_pages(&self, space_id: &str) -> Result<Vec<Page>> {
        self.fetch_all(&format!("/spaces/{space_id}/pages")).await
    }

    /// One page with its full storage-format body.
    pub async fn page(&self, page_id: &str) -> Result<Page> {
        self.get_json(&format!("/pages/{page_id}"), &[("body-format", "storage")])
            .await
    }

    /// All attachments on a page.
    pub async fn page_attachments(&self, page_id: &str) -> Result<Vec<Attachment>> {
        self.fetch_all(&format!("/pages/{page_id}/attachments")).await
    }

    /// Download a binary by absolute or site-relative link.
    pub async fn download(&self, link: &str) -> Result<Vec<u8>> {
        let url = match Url::parse(link) {
            Ok(absolute) => absolute,
            Err(_) => self.site_root.join(link).map_err(|e| {
                MirrorError::Network(format!("unresolvable download link '{link}': {e}"))
            })?,
        };

        let response = self
            .http
            .get(url.clone())
            .basic_auth(&self.email, Some(&self.token))
            .send()
            .await
            .map_err(|e| MirrorError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MirrorError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| MirrorError::Network(format!("{url}: body read failed: {e}")))?;
        Ok(bytes.to_vec())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(server: &MockServer) -> ApiClient {
        let base = Url::parse(&server.uri()).unwrap();
        ApiClient::with_base_url(base, "user@example.com", "token").unwrap()
    }

    #[tokio::test]
    async fn fetch_all_follows_cursors_in_page_order() {
        let server = MockServer::start().await;

        let first = serde_json::json!({
            "results": [
                { "id": "1", "key": "AAA", "name": "Alpha" },
                { "id": "2", "key": "BBB", "name": "Beta" }
            ],
            "_links": { "next": "/wiki/api/v2/spaces?limit=100&cursor=abc" }
        });
        let second = serde_json::json!({
            "results": [
                { "id": "3", "key": "CCC", "name": "Gamma" }
            ],
            "_links": {}
        });

        Mock::given(method("GET"))
            .and(path("/spaces"))
            .and(query_param_is_missing("cursor"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&first))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/spaces"))
            .and(query_param("cursor", "abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&second))
            .expect(1)
            .mount(&server)
            .await;

        let spaces = test_client(&server).spaces().await.unwrap();
        let keys: Vec<&str> = spaces.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, ["AAA", "BBB", "CCC"]);
    }

    #[tokio::test]
    async fn fetch_all_stops_on_empty_cursor() {
        let server = MockServer::start().await;

        // Continuation link present but its cursor parameter is empty.
        let body = serde_json::json!({
            "results": [ { "id": "1", "key": "AAA", "name": "Alpha" } ],
            "_links": { "next": "/wiki/api/v2/spaces?limit=100&cursor=" }
        });

        Mock::given(method("GET"))
            .and(path("/spaces"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .expect(1)
            .mount(&server)
            .await;

        let spaces = test_client(&server).spaces().await.unwrap();
        assert_eq!(spaces.len(), 1);
    }

    #[tokio::test]
    async fn fetch_all_propagates_page_errors() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/spaces"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = test_client(&server).spaces().await.unwrap_err();
        match err {
            MirrorError::Api { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("expected Api error, got: {other}"),
        }
    }

    #[tokio::test]
    async fn page_requests_storage_body() {
        let server = MockServer::start().await;

        let body = serde_json::json!({
            "id": "99",
            "status": "current",
            "title": "Welcome",
            "spaceId": "111",
            "body": { "storage": { "value": "<p>hi</p>", "representation": "storage" } }
        });

        Mock::given(method("GET"))
            .and(path("/pages/99"))
            .and(query_param("body-format", "storage"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let page = test_client(&server).page("99").await.unwrap();
        assert_eq!(page.storage_body(), Some("<p>hi</p>"));
    }

    #[tokio::test]
    async fn attachments_decode_both_link_shapes() {
        let server = MockServer::start().await;

        let body = serde_json::json!({
            "results": [
                { "id": "a1", "title": "one.png", "downloadLink": "/dl/one.png" },
                { "id": "a2", "title": "two.png", "downloadLink": { "url": "/dl/two.png" } },
                { "id": "a3", "title": "three.png" }
            ]
        });

        Mock::given(method("GET"))
            .and(path("/pages/99/attachments"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let attachments = test_client(&server).page_attachments("99").await.unwrap();
        assert_eq!(attachments[0].download_url, "/dl/one.png");
        assert_eq!(attachments[1].download_url, "/dl/two.png");
        assert_eq!(attachments[2].download_url, "");
    }

    #[tokio::test]
    async fn download_resolves_relative_links_against_site_root() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/wiki/download/att/1/file.bin"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"payload".to_vec()))
            .mount(&server)
            .await;

        let bytes = test_client(&server)
            .download("/wiki/download/att/1/file.bin")
            .await
            .unwrap();
        assert_eq!(bytes, b"payload");
    }

    #[tokio::test]
    async fn download_reports_http_status_on_failure() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = test_client(&server).download("/gone").await.unwrap_err();
        assert!(matches!(err, MirrorError::Api { status: 404, .. }));
    }
}
