use std::{sync::Arc, time::Duration};

use reqwest::{Client, Method};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::{
    auth::TokenManager,
    config::{ClientOptions, Config},
    envelope::{self, Resource, Response, SingleResponse},
    error::{self, Error, Result},
    query::{same_origin, validate_next_url},
    scope::Scope,
};

struct Inner {
    http: Client,
    base_url: Url,
    tokens: TokenManager,
}

/// App Store Connect API client.
///
/// Cloning is cheap: clones share the connection pool and the token cache.
/// The `with_*` scoping methods return a clone whose calls are bounded by a
/// cancellation token or deadline.
#[derive(Clone)]
pub struct AppStoreConnectClient {
    inner: Arc<Inner>,
    scope: Scope,
}

impl AppStoreConnectClient {
    pub fn new(config: Config, options: ClientOptions) -> Result<Self> {
        let tokens = TokenManager::new(config, &options);
        Self::with_token_manager(tokens, options)
    }

    /// Client that sends `token` as-is instead of signing its own.
    pub fn with_static_token(token: impl Into<String>, options: ClientOptions) -> Result<Self> {
        Self::with_token_manager(TokenManager::fixed(token), options)
    }

    pub fn with_token_manager(tokens: TokenManager, options: ClientOptions) -> Result<Self> {
        options.validate()?;
        let http = Client::builder()
            .user_agent(options.user_agent.as_str())
            .use_rustls_tls()
            .timeout(options.timeout)
            .build()?;
        Ok(Self {
            inner: Arc::new(Inner {
                http,
                base_url: options.base_url,
                tokens,
            }),
            scope: Scope::new(),
        })
    }

    pub fn with_cancellation(&self, token: CancellationToken) -> Self {
        Self {
            inner: self.inner.clone(),
            scope: self.scope.clone().with_cancellation(token),
        }
    }

    pub fn with_deadline(&self, deadline: Instant) -> Self {
        Self {
            inner: self.inner.clone(),
            scope: self.scope.clone().with_deadline(deadline),
        }
    }

    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    pub fn token_manager(&self) -> &TokenManager {
        &self.inner.tokens
    }

    pub async fn bearer(&self) -> Result<String> {
        self.scope.run(self.inner.tokens.token()).await
    }

    /// Absolute URLs (pagination cursors) are used verbatim once they pass
    /// the origin check; anything else is joined onto the base URL. Either
    /// way the result must stay on the base URL's origin.
    pub fn resolve(&self, path_or_url: &str) -> Result<Url> {
        let base = &self.inner.base_url;
        match Url::parse(path_or_url) {
            Ok(_) => validate_next_url(base, path_or_url),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let url = base.join(path_or_url.trim_start_matches('/'))?;
                if !same_origin(base, &url) {
                    return Err(Error::validation(format!(
                        "path {path_or_url:?} resolves outside {}",
                        base.origin().ascii_serialization()
                    )));
                }
                Ok(url)
            }
            Err(e) => Err(Error::validation(format!(
                "invalid request target {path_or_url:?}: {e}"
            ))),
        }
    }

    /// Sends one request and returns the raw body of a 2xx response.
    ///
    /// Non-2xx responses are classified into [`Error::Api`] or
    /// [`Error::Http`]. Nothing is retried.
    pub async fn do_request(
        &self,
        method: Method,
        path_or_url: &str,
        body: Option<Vec<u8>>,
    ) -> Result<Vec<u8>> {
        let url = self.resolve(path_or_url)?;
        self.scope.run(self.send(method, url, body)).await
    }

    async fn send(&self, method: Method, url: Url, body: Option<Vec<u8>>) -> Result<Vec<u8>> {
        let bearer = self.inner.tokens.token().await?;
        let mut req = self
            .inner
            .http
            .request(method.clone(), url.clone())
            .header("Authorization", format!("Bearer {}", bearer))
            .header("Content-Type", "application/json");
        if let Some(body) = body {
            req = req.body(body);
        }
        let res = req.send().await?;
        let status = res.status();
        let bytes = res.bytes().await?;
        debug!(%method, %url, %status, bytes = bytes.len(), "App Store Connect response");
        if !status.is_success() {
            return Err(error::classify(status, &bytes));
        }
        Ok(bytes.to_vec())
    }

    pub async fn get_raw(&self, path_or_url: &str) -> Result<Value> {
        let body = self.do_request(Method::GET, path_or_url, None).await?;
        envelope::decode(&body)
    }

    pub async fn get_single<A: DeserializeOwned>(
        &self,
        path_or_url: &str,
    ) -> Result<SingleResponse<A>> {
        let body = self.do_request(Method::GET, path_or_url, None).await?;
        envelope::decode_single(&body)
    }

    pub async fn get_list<A: DeserializeOwned>(&self, path_or_url: &str) -> Result<Response<A>> {
        let body = self.do_request(Method::GET, path_or_url, None).await?;
        envelope::decode_list(&body)
    }

    /// Fetches `initial_path` and every page its `links.next` chain points to.
    pub async fn list_all<A: DeserializeOwned>(
        &self,
        initial_path: &str,
    ) -> Result<Vec<Resource<A>>> {
        let mut items = Vec::new();
        let mut next_url: Option<String> = Some(initial_path.to_string());
        while let Some(url) = next_url.take() {
            let page: Response<A> = self.get_list(&url).await?;
            next_url = page
                .next_url()
                .filter(|next| *next != url)
                .map(str::to_string);
            items.extend(page.data);
        }
        Ok(items)
    }

    pub async fn post_json<B: Serialize, A: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<SingleResponse<A>> {
        let body = serde_json::to_vec(body).map_err(Error::Encode)?;
        let res = self.do_request(Method::POST, path, Some(body)).await?;
        envelope::decode_single(&res)
    }

    pub async fn patch_json<B: Serialize, A: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<SingleResponse<A>> {
        let body = serde_json::to_vec(body).map_err(Error::Encode)?;
        let res = self.do_request(Method::PATCH, path, Some(body)).await?;
        envelope::decode_single(&res)
    }

    /// For endpoints answering `204 No Content`; the body is never decoded.
    pub async fn send_no_content<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<()> {
        let body = body
            .map(serde_json::to_vec)
            .transpose()
            .map_err(Error::Encode)?;
        self.do_request(method, path, body).await?;
        Ok(())
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        self.send_no_content::<()>(Method::DELETE, path, None).await
    }
}

/// Rejects blank identifiers before any request is built.
pub(crate) fn require_id<'a>(what: &str, id: &'a str) -> Result<&'a str> {
    let id = id.trim();
    if id.is_empty() {
        return Err(Error::validation(format!("{what} is required")));
    }
    if id == "." || id == ".." {
        return Err(Error::validation(format!("{what} is not a valid id: {id:?}")));
    }
    let unsafe_char =
        |c: char| matches!(c, '/' | '?' | '#' | '\\' | '%') || c.is_whitespace() || c.is_control();
    if id.chars().any(unsafe_char) {
        return Err(Error::validation(format!("{what} contains invalid characters: {id:?}")));
    }
    Ok(id)
}
