use std::sync::Arc;

/// Error returned by the [`crate::rpc::SwapApi`] implementations.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("unexpected HTTP status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("unexpected response: {0}")]
    InvalidResponse(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,
}

impl From<reqwest::Error> for RpcError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_timeout() {
            Self::Timeout
        } else if let Some(status) = value.status() {
            Self::Status {
                status: status.as_u16(),
                message: value.to_string(),
            }
        } else if value.is_decode() {
            Self::InvalidResponse(value.to_string())
        } else if value.is_builder() {
            Self::InvalidRequest(value.to_string())
        } else {
            Self::Transport(value.to_string())
        }
    }
}

impl From<url::ParseError> for RpcError {
    fn from(value: url::ParseError) -> Self {
        Self::InvalidRequest(value.to_string())
    }
}

/// Error returned by the [`crate::store::SwapCatalog`] and
/// [`crate::store::CursorStore`] implementations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no polling cursor for contract {contract} on {blockchain}")]
    CursorNotFound { contract: String, blockchain: String },

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Reasons a raw swap event can not be turned into a trade.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("swap event has {0} fields, at least 5 expected")]
    MissingFields(usize),

    #[error("zero input amount in field {0}")]
    ZeroInput(usize),

    #[error("zero output amount in field {0}")]
    ZeroOutput(usize),

    #[error("input amount in field {0} is out of range")]
    AmountOutOfRange(usize),
}

/// Scraper level error.
#[derive(Debug, thiserror::Error)]
pub enum ScraperError {
    #[error("scraper is closed")]
    Closed,

    #[error("scraper task failed: {0}")]
    TaskFailed(String),

    #[error("scraper is already closed")]
    AlreadyClosed,

    #[error("scraper terminated: {0}")]
    Terminated(Arc<ScraperError>),

    #[error("shutdown requested while publishing trades")]
    ShuttingDown,

    #[error("trade receiver dropped")]
    ReceiverDropped,

    #[error("{count} consecutive update failures, last: {last}")]
    TooManyFailures {
        count: u32,
        #[source]
        last: Box<ScraperError>,
    },

    #[error("rpc error: {0}")]
    Rpc(#[from] RpcError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),
}
