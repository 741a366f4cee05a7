use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode, Url};

use crate::error::ShopifyError;
use crate::pagination::PageSequence;
use crate::types::{CustomersPage, OrdersPage, ProductsPage, ResourcePage};

const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";
const DEFAULT_RETRY_AFTER_SECS: u64 = 2;

/// Per-deployment settings shared by every tenant's client.
#[derive(Debug, Clone)]
pub struct AdminClientOptions {
    /// Path segment such as `"2024-01"`.
    pub api_version: String,
    pub timeout_secs: u64,
    /// `limit` query parameter, 1..=250.
    pub page_limit: u32,
    /// Pause before every page after the first.
    pub inter_request_delay_ms: u64,
}

impl Default for AdminClientOptions {
    fn default() -> Self {
        Self {
            api_version: "2024-01".to_owned(),
            timeout_secs: 30,
            page_limit: 250,
            inter_request_delay_ms: 0,
        }
    }
}

impl AdminClientOptions {
    #[must_use]
    pub fn from_app_config(config: &shopdash_core::AppConfig) -> Self {
        Self {
            api_version: config.shopify_api_version.clone(),
            timeout_secs: config.shopify_request_timeout_secs,
            page_limit: config.shopify_page_limit,
            inter_request_delay_ms: config.shopify_inter_request_delay_ms,
        }
    }
}

/// Authenticated client for one store's Admin REST API.
///
/// Every request carries the store's access token in the
/// `X-Shopify-Access-Token` header. Non-2xx responses become typed errors;
/// nothing is retried.
pub struct ShopifyAdminClient {
    client: Client,
    /// `https://{domain}/admin/api/{version}/`, always with a trailing slash.
    base_url: Url,
    shop_domain: String,
    page_limit: u32,
    inter_request_delay: Duration,
}

/// Build the API root for a shop domain.
///
/// A bare domain gets `https://`; a value that already carries an
/// `http(s)://` scheme is used as given.
pub(crate) fn admin_base_url(shop_domain: &str, api_version: &str) -> Result<Url, ShopifyError> {
    let invalid = |reason: &str| ShopifyError::InvalidShopDomain {
        domain: shop_domain.to_owned(),
        reason: reason.to_owned(),
    };

    let trimmed = shop_domain.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(invalid("domain is empty"));
    }
    let origin = if trimmed.starts_with("https://") || trimmed.starts_with("http://") {
        trimmed.to_owned()
    } else if trimmed.contains('/') || trimmed.contains(char::is_whitespace) {
        return Err(invalid("expected a bare host name such as shop.myshopify.com"));
    } else {
        format!("https://{trimmed}")
    };

    let url = Url::parse(&format!("{origin}/admin/api/{api_version}/"))
        .map_err(|e| invalid(&e.to_string()))?;
    if url.host_str().is_none() {
        return Err(invalid("missing host"));
    }
    Ok(url)
}

impl ShopifyAdminClient {
    /// Creates a client bound to one shop and access token.
    ///
    /// # Errors
    ///
    /// - [`ShopifyError::InvalidShopDomain`] if the domain cannot form a URL.
    /// - [`ShopifyError::InvalidAccessToken`] if the token is not a legal
    ///   header value.
    /// - [`ShopifyError::Http`] if the underlying `reqwest::Client` cannot be
    ///   constructed.
    pub fn new(
        shop_domain: &str,
        access_token: &str,
        options: &AdminClientOptions,
    ) -> Result<Self, ShopifyError> {
        let base_url = admin_base_url(shop_domain, &options.api_version)?;

        let mut token =
            HeaderValue::from_str(access_token).map_err(|_| ShopifyError::InvalidAccessToken)?;
        token.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(ACCESS_TOKEN_HEADER, token);

        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .default_headers(headers)
            .user_agent(concat!("shopdash/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url,
            shop_domain: shop_domain.trim().to_owned(),
            page_limit: options.page_limit,
            inter_request_delay: Duration::from_millis(options.inter_request_delay_ms),
        })
    }

    #[must_use]
    pub fn shop_domain(&self) -> &str {
        &self.shop_domain
    }

    /// Lazy page sequence over `customers.json`.
    #[must_use]
    pub fn customers(&self) -> PageSequence<'_, CustomersPage> {
        PageSequence::new(self)
    }

    /// Lazy page sequence over `products.json`.
    #[must_use]
    pub fn products(&self) -> PageSequence<'_, ProductsPage> {
        PageSequence::new(self)
    }

    /// Lazy page sequence over `orders.json?status=any`, line items included.
    #[must_use]
    pub fn orders(&self) -> PageSequence<'_, OrdersPage> {
        PageSequence::new(self)
    }

    pub(crate) async fn pause_between_pages(&self) {
        if !self.inter_request_delay.is_zero() {
            tokio::time::sleep(self.inter_request_delay).await;
        }
    }

    /// Fetches one page and returns it with the raw `Link` header.
    ///
    /// # Errors
    ///
    /// - [`ShopifyError::RateLimited`] on HTTP 429.
    /// - [`ShopifyError::Unauthorized`] on HTTP 401 or 403.
    /// - [`ShopifyError::NotFound`] on HTTP 404.
    /// - [`ShopifyError::UnexpectedStatus`] on any other non-2xx status.
    /// - [`ShopifyError::Http`] on network or TLS failure.
    /// - [`ShopifyError::Deserialize`] if the body does not match `P`.
    pub(crate) async fn fetch_page<P: ResourcePage>(
        &self,
        page_info: Option<&str>,
    ) -> Result<(P, Option<String>), ShopifyError> {
        let url = self.page_url::<P>(page_info)?;
        tracing::debug!(domain = %self.shop_domain, resource = P::RESOURCE, %url, "fetching page");

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.split('.').next())
                .and_then(|s| s.trim().parse::<u64>().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            return Err(ShopifyError::RateLimited {
                domain: self.shop_domain.clone(),
                retry_after_secs,
            });
        }

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ShopifyError::Unauthorized {
                domain: self.shop_domain.clone(),
                status: status.as_u16(),
            });
        }

        if status == StatusCode::NOT_FOUND {
            return Err(ShopifyError::NotFound {
                url: url.to_string(),
            });
        }

        if !status.is_success() {
            return Err(ShopifyError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let link_header = response
            .headers()
            .get(reqwest::header::LINK)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        let body = response.text().await?;
        let page = serde_json::from_str::<P>(&body).map_err(|e| ShopifyError::Deserialize {
            context: format!("{} page from {}", P::RESOURCE, self.shop_domain),
            source: e,
        })?;

        Ok((page, link_header))
    }

    /// Builds the request URL for one page.
    ///
    /// The first page carries the resource's filters; follow-up pages carry
    /// only `limit` and `page_info`.
    pub(crate) fn page_url<P: ResourcePage>(
        &self,
        page_info: Option<&str>,
    ) -> Result<Url, ShopifyError> {
        let mut url = self
            .base_url
            .join(P::ENDPOINT)
            .map_err(|e| ShopifyError::InvalidShopDomain {
                domain: self.shop_domain.clone(),
                reason: e.to_string(),
            })?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("limit", &self.page_limit.to_string());
            match page_info {
                Some(cursor) => {
                    query.append_pair("page_info", cursor);
                }
                None => {
                    for (key, value) in P::FIRST_PAGE_FILTERS {
                        query.append_pair(key, value);
                    }
                }
            }
        }

        Ok(url)
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
