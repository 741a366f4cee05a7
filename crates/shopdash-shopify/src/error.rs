use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShopifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("rate limited by {domain} (retry after {retry_after_secs}s)")]
    RateLimited {
        domain: String,
        retry_after_secs: u64,
    },

    #[error("access token rejected by {domain} (HTTP {status})")]
    Unauthorized { domain: String, status: u16 },

    #[error("endpoint not found: {url}")]
    NotFound { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("pagination limit reached for {resource} on {domain}: exceeded {max_pages} pages")]
    PaginationLimit {
        domain: String,
        resource: &'static str,
        max_pages: usize,
    },

    #[error("invalid shop domain \"{domain}\": {reason}")]
    InvalidShopDomain { domain: String, reason: String },

    #[error("access token is not a valid header value")]
    InvalidAccessToken,

    #[error("malformed {resource} {id}: {reason}")]
    Normalization {
        resource: &'static str,
        id: String,
        reason: String,
    },
}

impl ShopifyError {
    /// `true` for record-level data problems, as opposed to transport or API
    /// failures.
    #[must_use]
    pub fn is_malformed_record(&self) -> bool {
        matches!(self, ShopifyError::Normalization { .. })
    }
}
