//! HTTP plumbing shared by every Cloud Controller operation.

use cloudpush_protocol::{CcErrorBody, Envelope, Outcome, Page, Warnings};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::{ClientConfig, PollingConfig};
use crate::error::CcError;

/// Characters escaped in a URL path segment.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Response header carrying advisory warnings: comma-separated,
/// each entry query-escaped.
pub const WARNINGS_HEADER: &str = "X-Cf-Warnings";

/// Cloud Controller v2 client.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    api_url: String,
    polling: PollingConfig,
}

impl Client {
    pub fn new(config: &ClientConfig) -> Result<Self, CcError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if !config.access_token.is_empty() {
            let value = HeaderValue::from_str(&format!("bearer {}", config.access_token))
                .map_err(|_| CcError::InvalidArgument("access token is not a valid header value"))?;
            headers.insert(AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(config.dial_timeout)
            .danger_accept_invalid_certs(config.skip_ssl_validation)
            .build()?;

        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            polling: config.polling,
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn polling(&self) -> PollingConfig {
        self.polling
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    /// Sends a request and decodes a JSON response body.
    pub(crate) async fn make<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
    ) -> Outcome<T, CcError> {
        let resp = match req.send().await {
            Ok(resp) => resp,
            Err(e) => return Outcome::err(e.into(), Warnings::new()),
        };
        let warnings = parse_warnings(resp.headers());
        Outcome::new(decode(resp).await, warnings)
    }

    /// Sends a request whose successful response has no meaningful body.
    pub(crate) async fn make_empty(&self, req: RequestBuilder) -> Outcome<(), CcError> {
        let resp = match req.send().await {
            Ok(resp) => resp,
            Err(e) => return Outcome::err(e.into(), Warnings::new()),
        };
        let warnings = parse_warnings(resp.headers());
        Outcome::new(check_status(resp).await.map(|_| ()), warnings)
    }

    /// Fetches every page of a v2 collection, following `next_url`.
    pub(crate) async fn get_all_pages<E: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Outcome<Vec<Envelope<E>>, CcError> {
        let mut warnings = Warnings::new();
        let mut resources = Vec::new();
        let mut req = self.http.get(self.url(path)).query(query);

        loop {
            let page: Page<E> = match self.make(req).await.merge_into(&mut warnings) {
                Ok(page) => page,
                Err(e) => return Outcome::err(e, warnings),
            };
            resources.extend(page.resources);

            match page.next_url {
                Some(next) if !next.is_empty() => {
                    debug!(next = %next, "following next page");
                    req = self.http.get(self.url(&next));
                }
                _ => break,
            }
        }

        Outcome::ok(resources, warnings)
    }
}

async fn check_status(resp: Response) -> Result<Vec<u8>, CcError> {
    let status = resp.status();
    let body = resp.bytes().await?.to_vec();
    if !status.is_success() {
        return Err(api_error(status, &body));
    }
    Ok(body)
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, CcError> {
    let body = check_status(resp).await?;
    Ok(serde_json::from_slice(&body)?)
}

fn api_error(status: StatusCode, body: &[u8]) -> CcError {
    let parsed = serde_json::from_slice::<CcErrorBody>(body).unwrap_or_else(|_| CcErrorBody {
        description: String::from_utf8_lossy(body).into_owned(),
        ..CcErrorBody::default()
    });

    if status == StatusCode::NOT_FOUND {
        return CcError::ResourceNotFound(parsed.description);
    }

    warn!(
        status = status.as_u16(),
        error_code = %parsed.error_code,
        "cloud controller returned an error"
    );
    CcError::Api {
        status: status.as_u16(),
        code: parsed.code,
        error_code: parsed.error_code,
        description: parsed.description,
    }
}

/// Escapes a value for use as one URL path segment.
pub(crate) fn segment(value: &str) -> String {
    utf8_percent_encode(value, SEGMENT).to_string()
}

/// Decodes the warnings header of a response, preserving order.
pub fn parse_warnings(headers: &HeaderMap) -> Warnings {
    headers
        .get_all(WARNINGS_HEADER)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            let spaced = s.replace('+', " ");
            percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
        })
        .collect()
}
