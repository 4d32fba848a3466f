//! REST client for the remote scan service.
//!
//! Every call is fire-and-report: failures are logged and turned into an
//! empty list, `None` or `false`. Nothing here retries or caches.

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::Url;
use thiserror::Error;
use tracing::{debug, error};

use crate::config::RemoteConfig;
use crate::model::{NewScannedCode, ScannedCode};

const RESOURCE: &str = "codigos";

#[derive(Error, Debug)]
enum RemoteError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid base url {url:?}: {reason}")]
    BaseUrl { url: String, reason: String },

    #[error("invalid scan id {0:?}")]
    Id(String),
}

/// What the app needs from a remote scan service.
pub trait RemoteCodes {
    fn list(&self) -> Vec<ScannedCode>;
    fn get_by_id(&self, id: &str) -> Option<ScannedCode>;
    fn create(&self, code: &NewScannedCode) -> Option<ScannedCode>;
    fn delete_by_id(&self, id: &str) -> bool;
}

pub struct HttpRemote {
    base_url: String,
    client: Client,
}

impl HttpRemote {
    pub fn new(config: &RemoteConfig) -> Self {
        Self::with_timeout(&config.base_url, config.timeout)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                error!(error = %e, "could not configure http client, using defaults");
                Client::new()
            });

        HttpRemote {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self) -> Result<Url, RemoteError> {
        self.resource_url(&[])
    }

    /// The id becomes one percent-encoded path segment.
    fn item_url(&self, id: &str) -> Result<Url, RemoteError> {
        // the url crate silently drops dot segments, which would turn an item
        // request into a request on the whole collection
        if matches!(id, "" | "." | "..") {
            return Err(RemoteError::Id(id.to_string()));
        }
        self.resource_url(&[id])
    }

    fn resource_url(&self, extra: &[&str]) -> Result<Url, RemoteError> {
        let invalid = |reason: String| RemoteError::BaseUrl {
            url: self.base_url.clone(),
            reason,
        };
        let mut url = Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| invalid("cannot hold a path".to_string()))?
            .pop_if_empty()
            .push(RESOURCE)
            .extend(extra);
        Ok(url)
    }

    fn try_list(&self) -> Result<Vec<ScannedCode>, RemoteError> {
        let codes = self.send(self.client.get(self.collection_url()?))?.json()?;
        Ok(codes)
    }

    fn try_get(&self, id: &str) -> Result<ScannedCode, RemoteError> {
        let code = self.send(self.client.get(self.item_url(id)?))?.json()?;
        Ok(code)
    }

    fn try_create(&self, code: &NewScannedCode) -> Result<ScannedCode, RemoteError> {
        let created = self
            .send(self.client.post(self.collection_url()?).json(code))?
            .json()?;
        Ok(created)
    }

    fn try_delete(&self, id: &str) -> Result<(), RemoteError> {
        self.send(self.client.delete(self.item_url(id)?))?;
        Ok(())
    }

    fn send(&self, request: reqwest::blocking::RequestBuilder) -> Result<Response, RemoteError> {
        let response = request.send()?.error_for_status()?;
        debug!(url = %response.url(), status = %response.status(), "remote request ok");
        Ok(response)
    }
}

impl RemoteCodes for HttpRemote {
    fn list(&self) -> Vec<ScannedCode> {
        self.try_list().unwrap_or_else(|e| {
            error!(error = %e, "error retrieving remote scans");
            Vec::new()
        })
    }

    fn get_by_id(&self, id: &str) -> Option<ScannedCode> {
        self.try_get(id)
            .map_err(|e| error!(id, error = %e, "error retrieving remote scan"))
            .ok()
    }

    fn create(&self, code: &NewScannedCode) -> Option<ScannedCode> {
        self.try_create(code)
            .map_err(|e| error!(error = %e, "error creating remote scan"))
            .ok()
    }

    fn delete_by_id(&self, id: &str) -> bool {
        self.try_delete(id)
            .map_err(|e| error!(id, error = %e, "error deleting remote scan"))
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn remote(base_url: &str) -> HttpRemote {
        HttpRemote::with_timeout(base_url, Duration::from_secs(5))
    }

    /// The blocking client owns a runtime of its own, so it is built, used
    /// and dropped off the async test thread.
    async fn blocking<T, F>(f: F) -> T
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        tokio::task::spawn_blocking(f).await.unwrap()
    }

    #[test]
    fn base_url_is_joined_without_doubling() {
        let remote = remote("http://localhost:3000/");
        assert_eq!(remote.collection_url().unwrap().as_str(), "http://localhost:3000/codigos");
        assert_eq!(remote.item_url("abc").unwrap().as_str(), "http://localhost:3000/codigos/abc");

        let nested = HttpRemote::with_timeout("http://localhost:3000/api/", Duration::from_secs(1));
        assert_eq!(nested.item_url("abc").unwrap().as_str(), "http://localhost:3000/api/codigos/abc");
    }

    #[test]
    fn ids_are_encoded_as_one_segment() {
        let remote = remote("http://localhost:3000");
        assert_eq!(remote.item_url("a?b").unwrap().path(), "/codigos/a%3Fb");
        assert_eq!(remote.item_url("a/b").unwrap().path(), "/codigos/a%2Fb");
        assert_eq!(remote.item_url("a#b c").unwrap().path(), "/codigos/a%23b%20c");
        assert_eq!(remote.item_url("50%").unwrap().path(), "/codigos/50%25");
    }

    #[test]
    fn dot_ids_are_rejected() {
        let remote = remote("http://localhost:3000");
        for id in ["", ".", ".."] {
            assert!(matches!(remote.item_url(id), Err(RemoteError::Id(_))), "{id:?}");
        }
    }

    #[test]
    fn malformed_base_url_is_an_error() {
        assert!(matches!(remote("not a url").collection_url(), Err(RemoteError::BaseUrl { .. })));
        assert!(matches!(remote("mailto:someone").collection_url(), Err(RemoteError::BaseUrl { .. })));
        assert!(remote("not a url").list().is_empty());
    }

    #[tokio::test]
    async fn list_parses_remote_codes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/codigos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "1", "data": "ABC123", "type": "qr", "timestamp": 5}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let url = server.uri();
        let codes = blocking(move || remote(&url).list()).await;

        assert_eq!(codes.len(), 1);
        assert_eq!(codes[0].data, "ABC123");
        assert_eq!(codes[0].kind, "qr");
        assert_eq!(codes[0].timestamp, 5);
    }

    #[tokio::test]
    async fn get_missing_id_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/codigos/nope"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let url = server.uri();
        let found = blocking(move || remote(&url).get_by_id("nope")).await;

        assert_eq!(found, None);
    }

    #[tokio::test]
    async fn get_sends_reserved_characters_encoded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/codigos/a%3Fb"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(
                {"id": "a?b", "data": "x", "type": "qr", "timestamp": 1}
            )))
            .expect(1)
            .mount(&server)
            .await;

        let url = server.uri();
        let found = blocking(move || remote(&url).get_by_id("a?b")).await;

        assert_eq!(found.map(|c| c.id), Some("a?b".to_string()));
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests[0].url.query(), None);
    }

    #[tokio::test]
    async fn create_returns_server_copy() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/codigos"))
            .and(body_json(json!({"data": "DEF456", "type": "code128"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!(
                {"id": "srv-1", "data": "DEF456", "type": "code128"}
            )))
            .expect(1)
            .mount(&server)
            .await;

        let url = server.uri();
        let created =
            blocking(move || remote(&url).create(&NewScannedCode::new("DEF456", "code128"))).await;

        let created = created.unwrap();
        assert_eq!(created.id, "srv-1");
        assert_eq!(created.kind, "code128");
    }

    #[tokio::test]
    async fn delete_reports_success() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/codigos/srv-1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let url = server.uri();
        assert!(blocking(move || remote(&url).delete_by_id("srv-1")).await);
    }

    #[tokio::test]
    async fn delete_with_slash_stays_on_one_item() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/codigos/a%2Fb"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let url = server.uri();
        assert!(blocking(move || remote(&url).delete_by_id("a/b")).await);
    }

    #[tokio::test]
    async fn dot_id_never_reaches_the_collection() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let url = server.uri();
        let deleted = blocking(move || remote(&url).delete_by_id("..")).await;

        assert!(!deleted);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn server_error_is_swallowed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let url = server.uri();
        let (codes, found) = blocking(move || {
            let remote = remote(&url);
            (remote.list(), remote.get_by_id("x"))
        })
        .await;

        assert!(codes.is_empty());
        assert_eq!(found, None);
    }

    #[tokio::test]
    async fn unparseable_body_is_empty_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/codigos"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let url = server.uri();
        assert!(blocking(move || remote(&url).list()).await.is_empty());
    }

    #[test]
    fn unreachable_host_never_fails() {
        // nothing listens on the discard port locally
        let remote = HttpRemote::with_timeout("http://127.0.0.1:9", Duration::from_millis(500));

        assert!(remote.list().is_empty());
        assert_eq!(remote.get_by_id("x"), None);
        assert_eq!(remote.create(&NewScannedCode::new("x", "qr")), None);
        assert!(!remote.delete_by_id("x"));
    }
}
