//! RightScale Cloud Management API 1.5 client.
//!
//! Implements [`ResourceClient`] over HTTPS. Requests authenticate with an
//! OAuth2 access token obtained from the account's refresh token; the token
//! is fetched on first use and reused for the lifetime of the client.

mod error;

use reqwest::header::{HeaderMap, HeaderValue, LOCATION};
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::client::{ClientFuture, Created, ResourceClient};
use crate::config::RightScaleConfig;
use crate::fields::Fields;
use crate::locator::Locator;
use crate::schema::CLOUD_HREF;

pub use error::Cm15Error;

/// Namespace served by this client.
pub const NAMESPACE: &str = "rs_cm";

const API_VERSION: &str = "1.5";
const TOKEN_PATH: &str = "/api/oauth2";

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// HTTP client for the CM 1.5 API.
#[derive(Debug)]
pub struct Cm15Client {
    http: reqwest::Client,
    base_url: String,
    refresh_token: String,
    account_id: Option<String>,
    access_token: Mutex<Option<String>>,
}

impl Cm15Client {
    /// Builds a client from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Cm15Error::Config`] when the configuration is invalid or
    /// the HTTP client cannot be initialised.
    pub fn new(config: &RightScaleConfig) -> Result<Self, Cm15Error> {
        config
            .validate()
            .map_err(|err| Cm15Error::Config(err.to_string()))?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|err| Cm15Error::Config(err.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url(&config.api_host),
            refresh_token: config.refresh_token.clone(),
            account_id: config.account_id.clone(),
            access_token: Mutex::new(None),
        })
    }

    fn url(&self, href: &str) -> String {
        if href.starts_with("https://") || href.starts_with("http://") {
            href.to_owned()
        } else {
            format!("{}{href}", self.base_url)
        }
    }

    fn headers(&self) -> Result<HeaderMap, Cm15Error> {
        let mut headers = HeaderMap::new();
        headers.insert("X-Api-Version", HeaderValue::from_static(API_VERSION));
        if let Some(account) = &self.account_id {
            let value = HeaderValue::from_str(account)
                .map_err(|err| Cm15Error::Config(format!("invalid account id: {err}")))?;
            headers.insert("X-Account", value);
        }
        Ok(headers)
    }

    async fn token(&self) -> Result<String, Cm15Error> {
        let mut cached = self.access_token.lock().await;
        if let Some(token) = cached.as_ref() {
            return Ok(token.clone());
        }

        let url = self.url(TOKEN_PATH);
        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", self.refresh_token.as_str()),
            ])
            .send()
            .await
            .map_err(|err| Cm15Error::Auth {
                status: 0,
                message: err.to_string(),
            })?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Cm15Error::Auth {
                status: status.as_u16(),
                message: message.trim().to_owned(),
            });
        }
        let token: TokenResponse = response.json().await.map_err(|err| Cm15Error::Auth {
            status: status.as_u16(),
            message: err.to_string(),
        })?;
        debug!("obtained access token");
        *cached = Some(token.access_token.clone());
        Ok(token.access_token)
    }

    async fn send(
        &self,
        method: Method,
        href: &str,
        body: Option<&Fields>,
    ) -> Result<Response, Cm15Error> {
        let url = self.url(href);
        let action = format!("{method} {url}");
        let token = self.token().await?;
        let mut request: RequestBuilder = self
            .http
            .request(method, &url)
            .headers(self.headers()?)
            .bearer_auth(token);
        if let Some(fields) = body {
            request = request.json(fields);
        }
        debug!(%action, "sending request");

        let response = request.send().await.map_err(|source| Cm15Error::Http {
            action: action.clone(),
            source,
        })?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(Cm15Error::NotFound {
                href: href.to_owned(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Cm15Error::Status {
                action,
                status: status.as_u16(),
                body: body.trim().to_owned(),
            });
        }
        Ok(response)
    }

    async fn fetch(&self, href: &str) -> Result<Fields, Cm15Error> {
        let response = self
            .send(Method::GET, &format!("{href}?view=full"), None)
            .await
            .map_err(|err| match err {
                Cm15Error::NotFound { .. } => Cm15Error::NotFound {
                    href: href.to_owned(),
                },
                other => other,
            })?;
        let action = format!("GET {}", self.url(href));
        let value: Value = response.json().await.map_err(|source| Cm15Error::Http {
            action: action.clone(),
            source,
        })?;
        match value {
            Value::Object(fields) => Ok(fields),
            other => Err(Cm15Error::Decode {
                action,
                message: format!("expected a JSON object, got {other}"),
            }),
        }
    }
}

fn base_url(host: &str) -> String {
    let trimmed = host.trim().trim_end_matches('/');
    if trimmed.starts_with("https://") || trimmed.starts_with("http://") {
        trimmed.to_owned()
    } else {
        format!("https://{trimmed}")
    }
}

fn without_cloud_href(fields: &Fields) -> Fields {
    let mut body = fields.clone();
    body.remove(CLOUD_HREF);
    body
}

/// Pairs a new locator with its fetched fields.
///
/// The instance already exists once the locator is known, so a failed
/// follow-up read still yields the locator with no fields.
fn created_from_fetch(locator: Locator, fetched: Result<Fields, Cm15Error>) -> Created {
    match fetched {
        Ok(fields) => Created { locator, fields },
        Err(err) => {
            warn!(%locator, error = %err, "instance created but its fields could not be read");
            Created {
                locator,
                fields: Fields::new(),
            }
        }
    }
}

/// Extracts the resource href from a `Location` header value.
fn href_from_location(location: &str) -> Option<String> {
    let trimmed = location.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.starts_with('/') {
        return Some(trimmed.to_owned());
    }
    Url::parse(trimmed)
        .ok()
        .map(|url| url.path().to_owned())
        .filter(|path| path.len() > 1)
}

/// Instances are terminated rather than deleted.
fn delete_target(href: &str) -> (Method, String) {
    if href.contains("/instances/") {
        (Method::POST, format!("{href}/terminate"))
    } else {
        (Method::DELETE, href.to_owned())
    }
}

fn lock_target(href: &str, locked: bool) -> String {
    let action = if locked { "lock" } else { "unlock" };
    format!("{href}/{action}")
}

impl ResourceClient for Cm15Client {
    type Error = Cm15Error;

    fn create<'a>(
        &'a self,
        namespace: &'a str,
        collection: &'a str,
        fields: &'a Fields,
    ) -> ClientFuture<'a, Created, Self::Error> {
        Box::pin(async move {
            if namespace != NAMESPACE {
                return Err(Cm15Error::UnsupportedNamespace {
                    namespace: namespace.to_owned(),
                });
            }
            let cloud_href = fields
                .get(CLOUD_HREF)
                .and_then(Value::as_str)
                .ok_or_else(|| Cm15Error::MissingCloudHref {
                    collection: collection.to_owned(),
                })?;

            let collection_href = format!("{cloud_href}/{collection}");
            let response = self
                .send(
                    Method::POST,
                    &collection_href,
                    Some(&without_cloud_href(fields)),
                )
                .await?;
            let href = response
                .headers()
                .get(LOCATION)
                .and_then(|value| value.to_str().ok())
                .and_then(href_from_location)
                .ok_or(Cm15Error::MissingLocation)?;

            let fetched = self.fetch(&href).await;
            Ok(created_from_fetch(Locator::new(namespace, href), fetched))
        })
    }

    fn update<'a>(
        &'a self,
        locator: &'a Locator,
        fields: &'a Fields,
    ) -> ClientFuture<'a, (), Self::Error> {
        Box::pin(async move {
            self.send(Method::PUT, &locator.href, Some(&without_cloud_href(fields)))
                .await?;
            Ok(())
        })
    }

    fn delete<'a>(&'a self, locator: &'a Locator) -> ClientFuture<'a, (), Self::Error> {
        Box::pin(async move {
            let (method, target) = delete_target(&locator.href);
            self.send(method, &target, None)
                .await
                .map_err(|err| match err {
                    Cm15Error::NotFound { .. } => Cm15Error::NotFound {
                        href: locator.href.clone(),
                    },
                    other => other,
                })?;
            Ok(())
        })
    }

    fn read<'a>(&'a self, locator: &'a Locator) -> ClientFuture<'a, Fields, Self::Error> {
        Box::pin(async move { self.fetch(&locator.href).await })
    }

    fn set_lock<'a>(
        &'a self,
        locator: &'a Locator,
        collection: &'a str,
        locked: bool,
    ) -> ClientFuture<'a, (), Self::Error> {
        Box::pin(async move {
            debug!(%locator, collection, locked, "changing lock state");
            self.send(Method::POST, &lock_target(&locator.href, locked), None)
                .await?;
            Ok(())
        })
    }
}
