use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::Stream;
use futures::stream::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response, header};
use serde::Deserialize;
use url::Url;

use crate::client_logger::ClientLogger;
use crate::error::{Error, Result};
use crate::observability::{CLIENT_REQUESTS, CLIENT_REQUEST_ERRORS, CLIENT_TTFB};
use crate::sse::process_sse;
use crate::types::{ChatRequest, Message};

const DEFAULT_API_URL: &str = "https://api.openai.com/v1/";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Incremental text fragments of one assistant turn.
///
/// The stream is finite and cannot be restarted.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// A language-model endpoint that streams chat completions.
#[async_trait::async_trait]
pub trait ModelClient: Send + Sync {
    /// Start a completion over the whole `conversation` and return its text
    /// fragments as they arrive.
    async fn stream_chat(&self, conversation: &[Message]) -> Result<TokenStream>;
}

/// Client for an OpenAI-compatible chat-completions endpoint.
#[derive(Clone)]
pub struct OpenAi {
    api_key: String,
    model: String,
    client: ReqwestClient,
    base_url: Url,
    timeout: Duration,
    logger: Option<Arc<dyn ClientLogger>>,
}

impl std::fmt::Debug for OpenAi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAi")
            .field("model", &self.model)
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl OpenAi {
    /// Create a new client for `model` using the default endpoint.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        Self::with_options(api_key, model, None, None)
    }

    /// Create a new client with custom settings.
    pub fn with_options(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::authentication("API key not provided"));
        }
        if HeaderValue::from_str(&format!("Bearer {api_key}")).is_err() {
            return Err(Error::authentication(
                "API key contains characters that cannot be sent in a header",
            ));
        }

        // Url::join drops the last path segment unless it ends in a slash.
        let mut base_url = base_url.unwrap_or(DEFAULT_API_URL).to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        let base_url = Url::parse(&base_url)?;

        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {e}"),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            api_key,
            model: model.into(),
            client,
            base_url,
            timeout,
            logger: None,
        })
    }

    /// Attach a logger that sees every request and streamed chunk.
    pub fn with_logger(mut self, logger: Arc<dyn ClientLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// The model this client completes with.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn completions_url(&self) -> Result<Url> {
        Ok(self.base_url.join("chat/completions")?)
    }

    /// Create and return default headers for API requests.
    fn default_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("text/event-stream"));
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|_| Error::authentication("API key is not a valid header value"))?;
        headers.insert(header::AUTHORIZATION, bearer);
        Ok(headers)
    }

    /// Process API response errors and convert to our Error type
    async fn process_error_response(response: Response) -> Error {
        let status_code = response.status().as_u16();

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|val| val.to_str().ok())
            .and_then(|val| val.parse::<u64>().ok());

        #[derive(Deserialize)]
        struct ErrorResponse {
            error: Option<ErrorDetail>,
        }

        #[derive(Deserialize)]
        struct ErrorDetail {
            #[serde(rename = "type")]
            error_type: Option<String>,
            message: Option<String>,
            param: Option<String>,
        }

        let error_body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response: {e}"),
                    Some(Box::new(e)),
                );
            }
        };

        let detail = serde_json::from_str::<ErrorResponse>(&error_body)
            .ok()
            .and_then(|e| e.error);
        let error_type = detail.as_ref().and_then(|e| e.error_type.clone());
        let error_param = detail.as_ref().and_then(|e| e.param.clone());
        let error_message = detail
            .and_then(|e| e.message)
            .unwrap_or_else(|| error_body.clone());

        // Map HTTP status code to appropriate error type
        match status_code {
            400 => Error::bad_request(error_message, error_param),
            401 => Error::authentication(error_message),
            403 => Error::permission(error_message),
            404 => Error::not_found(error_message),
            408 => Error::timeout(error_message, None),
            429 => Error::rate_limit(error_message, retry_after),
            500 => Error::internal_server(error_message),
            502..=504 => Error::service_unavailable(error_message, retry_after),
            _ => Error::api(status_code, error_type, error_message),
        }
    }

    fn record_error(&self, error: &Error) {
        CLIENT_REQUEST_ERRORS.click();
        if let Some(logger) = &self.logger {
            logger.log_error(error);
        }
    }

    async fn open_stream(&self, messages: &[Message]) -> Result<TokenStream> {
        let request = ChatRequest::new(&self.model, messages);
        if let Some(logger) = &self.logger {
            logger.log_request(&request);
        }
        CLIENT_REQUESTS.click();

        let started = Instant::now();
        let response = self
            .client
            .post(self.completions_url()?)
            .headers(self.default_headers()?)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::timeout(
                        format!("Request timed out: {e}"),
                        Some(self.timeout.as_secs_f64()),
                    )
                } else if e.is_connect() {
                    Error::connection(format!("Connection error: {e}"), Some(Box::new(e)))
                } else {
                    Error::http_client(format!("Request failed: {e}"), Some(Box::new(e)))
                }
            })?;
        CLIENT_TTFB.add(started.elapsed().as_secs_f64());

        if !response.status().is_success() {
            return Err(Self::process_error_response(response).await);
        }

        let logger = self.logger.clone();
        let fragments = process_sse(response.bytes_stream()).filter_map(move |chunk| {
            let fragment = match chunk {
                Ok(chunk) => {
                    if let Some(logger) = &logger {
                        logger.log_chunk(&chunk);
                    }
                    chunk.text().map(|text| Ok(text.to_string()))
                }
                Err(err) => {
                    if let Some(logger) = &logger {
                        logger.log_error(&err);
                    }
                    Some(Err(err))
                }
            };
            futures::future::ready(fragment)
        });
        Ok(Box::pin(fragments))
    }
}

#[async_trait::async_trait]
impl ModelClient for OpenAi {
    async fn stream_chat(&self, conversation: &[Message]) -> Result<TokenStream> {
        match self.open_stream(conversation).await {
            Ok(stream) => Ok(stream),
            Err(err) => {
                self.record_error(&err);
                Err(err)
            }
        }
    }
}
