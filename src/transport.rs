//! The HTTP channel every API call goes through.

use crate::config::Config;
use reqwest::{
    cookie::{CookieStore, Jar},
    multipart::Form,
    Client, Method, Request, Response, StatusCode,
};
use serde::Serialize;
use serde_json::Value;
use std::{
    fmt::{self, Debug, Formatter},
    sync::Arc,
};
use url::Url;

/// Something which needs to know when the server stops recognising our
/// credentials.
///
/// The [`Transport`] calls this for every `401 Unauthorized` response, which
/// means it may be called several times in quick succession when a batch of
/// in-flight requests all fail together. Implementations must be idempotent.
pub trait SessionInvalidationHandler: Send + Sync {
    fn on_unauthorized(&self);
}

/// A hook run on every outgoing request before it hits the network.
///
/// Returning an error short-circuits the call.
pub trait RequestInterceptor: Send + Sync {
    fn intercept(&self, request: Request) -> Result<Request, TransportError>;
}

/// The default [`RequestInterceptor`], which forwards everything unchanged.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct PassThrough;

impl RequestInterceptor for PassThrough {
    fn intercept(&self, request: Request) -> Result<Request, TransportError> {
        Ok(request)
    }
}

/// A request's payload.
#[derive(Debug)]
pub enum Body {
    Empty,
    Json(Value),
    Multipart(Form),
}

impl Body {
    pub fn json<D>(data: &D) -> Result<Body, TransportError>
    where
        D: Serialize + ?Sized,
    {
        Ok(Body::Json(serde_json::to_value(data)?))
    }
}

/// Per-call tweaks.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RequestOptions {
    pub query: Vec<(String, String)>,
    /// Don't tell the [`SessionInvalidationHandler`] about a `401`.
    ///
    /// Used when exchanging credentials, where a `401` just means "wrong
    /// password" and not "your session has expired".
    pub anonymous: bool,
}

impl RequestOptions {
    pub fn anonymous() -> Self {
        RequestOptions {
            anonymous: true,
            ..Default::default()
        }
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }
}

/// The shared HTTP client.
///
/// Credentials travel in a cookie which the server sets when logging in, so
/// nothing needs to be attached to requests manually.
#[derive(Clone)]
pub struct Transport {
    client: Client,
    api_root: String,
    api_url: Url,
    cookies: Arc<Jar>,
    request_interceptor: Arc<dyn RequestInterceptor>,
    invalidation_handler: Arc<dyn SessionInvalidationHandler>,
}

impl Transport {
    pub fn new(
        config: &Config,
        invalidation_handler: Arc<dyn SessionInvalidationHandler>,
    ) -> Result<Self, TransportError> {
        let api_root = config.api_root();
        let api_url = Url::parse(&api_root)?;
        let cookies = Arc::new(Jar::default());

        let client = Client::builder()
            .user_agent(&config.user_agent)
            .cookie_provider(Arc::clone(&cookies))
            .timeout(config.timeout)
            .build()
            .map_err(TransportError::Build)?;

        Ok(Transport {
            client,
            api_root,
            api_url,
            cookies,
            request_interceptor: Arc::new(PassThrough),
            invalidation_handler,
        })
    }

    pub fn with_request_interceptor<R>(self, interceptor: R) -> Self
    where
        R: RequestInterceptor + 'static,
    {
        Transport {
            request_interceptor: Arc::new(interceptor),
            ..self
        }
    }

    pub fn api_root(&self) -> &str { &self.api_root }

    /// Send a request to `path` (relative to the API root).
    ///
    /// Non-2xx responses are turned into [`TransportError::HttpStatus`]. A
    /// `401` will also notify the [`SessionInvalidationHandler`] before the
    /// error is handed back.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Body,
        options: &RequestOptions,
    ) -> Result<Response, TransportError> {
        let url = format!("{}{}", self.api_root, path);
        log::debug!("Sending a {} request to {}", method, url);

        let mut builder = self.client.request(method, &url);
        if !options.query.is_empty() {
            builder = builder.query(&options.query);
        }
        builder = match body {
            Body::Empty => builder,
            Body::Json(payload) => {
                log::trace!("Payload: {:#?}", payload);
                builder.json(&payload)
            },
            Body::Multipart(form) => builder.multipart(form),
        };

        let request = builder.build().map_err(TransportError::Build)?;
        let request = self.request_interceptor.intercept(request)?;
        let outcome = self.client.execute(request).await;

        self.inspect_response(outcome, options).await
    }

    async fn inspect_response(
        &self,
        outcome: Result<Response, reqwest::Error>,
        options: &RequestOptions,
    ) -> Result<Response, TransportError> {
        let response = outcome?;
        log::trace!("Headers: {:#?}", response.headers());

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED && !options.anonymous {
            log::info!("{} was rejected as unauthorized", response.url());
            self.invalidation_handler.on_unauthorized();
        }

        let reason = error_reason(response).await;
        log::debug!("Request failed with {} ({:?})", status, reason);

        Err(TransportError::HttpStatus { status, reason })
    }

    /// Send a request and decode the response body as JSON.
    ///
    /// An empty body decodes to [`Value::Null`].
    pub async fn json(
        &self,
        method: Method,
        path: &str,
        body: Body,
        options: &RequestOptions,
    ) -> Result<Value, TransportError> {
        let response = self.send(method, path, body, options).await?;
        let body = response.bytes().await?;
        log::trace!("Response: {}", String::from_utf8_lossy(&body));

        if body.iter().all(u8::is_ascii_whitespace) {
            Ok(Value::Null)
        } else {
            serde_json::from_slice(&body).map_err(Into::into)
        }
    }

    pub async fn get(&self, path: &str) -> Result<Value, TransportError> {
        self.get_with(path, &RequestOptions::default()).await
    }

    pub async fn get_with(
        &self,
        path: &str,
        options: &RequestOptions,
    ) -> Result<Value, TransportError> {
        self.json(Method::GET, path, Body::Empty, options).await
    }

    pub async fn post<D>(
        &self,
        path: &str,
        data: &D,
    ) -> Result<Value, TransportError>
    where
        D: Serialize + ?Sized,
    {
        self.json(Method::POST, path, Body::json(data)?, &Default::default())
            .await
    }

    pub async fn post_empty(&self, path: &str) -> Result<Value, TransportError> {
        self.json(Method::POST, path, Body::Empty, &Default::default())
            .await
    }

    pub async fn put<D>(
        &self,
        path: &str,
        data: &D,
    ) -> Result<Value, TransportError>
    where
        D: Serialize + ?Sized,
    {
        self.json(Method::PUT, path, Body::json(data)?, &Default::default())
            .await
    }

    pub async fn delete(&self, path: &str) -> Result<Value, TransportError> {
        self.json(Method::DELETE, path, Body::Empty, &Default::default())
            .await
    }

    /// The `Cookie` header we would currently send to the API.
    pub fn cookie_header(&self) -> Option<String> {
        let header = self.cookies.cookies(&self.api_url)?;
        header.to_str().ok().map(String::from)
    }

    /// Seed the cookie jar from a header previously returned by
    /// [`Transport::cookie_header()`].
    pub fn restore_cookies(&self, header: &str) {
        for cookie in header.split(';').map(str::trim).filter(|c| !c.is_empty())
        {
            self.cookies.add_cookie_str(cookie, &self.api_url);
        }
    }
}

impl Debug for Transport {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("api_root", &self.api_root)
            .finish()
    }
}

/// The backend reports failures as `{"error": "..."}`.
async fn error_reason(response: Response) -> Option<String> {
    let body = response.text().await.ok()?;

    match serde_json::from_str::<Value>(&body) {
        Ok(Value::Object(fields)) => fields
            .get("error")
            .or_else(|| fields.get("message"))
            .and_then(Value::as_str)
            .map(String::from),
        _ if !body.trim().is_empty() => Some(body.trim().to_string()),
        _ => None,
    }
}

/// Anything that can go wrong while talking to the server.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// We couldn't get a response out of the server.
    #[error(
        "{}",
        if *timeout { "The request timed out" } else { "Unable to reach the server" }
    )]
    Network {
        timeout: bool,
        #[source]
        inner: reqwest::Error,
    },
    /// The server responded, but not with a 2xx.
    #[error(
        "The server responded with {}{}",
        status,
        reason.as_ref().map(|r| format!(": {}", r)).unwrap_or_default()
    )]
    HttpStatus {
        status: StatusCode,
        reason: Option<String>,
    },
    /// A [`RequestInterceptor`] refused to let the request through.
    #[error("The request was rejected before it was sent: {}", reason)]
    Rejected { reason: String },
    #[error("Unable to build the request")]
    Build(#[source] reqwest::Error),
    #[error("Invalid URL")]
    Url(#[from] url::ParseError),
    #[error("Unable to encode or decode a JSON payload")]
    Json(#[from] serde_json::Error),
}

impl TransportError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            TransportError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            TransportError::Network { timeout, .. } => *timeout,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(inner: reqwest::Error) -> TransportError {
        if inner.is_builder() {
            TransportError::Build(inner)
        } else {
            TransportError::Network {
                timeout: inner.is_timeout(),
                inner,
            }
        }
    }
}
