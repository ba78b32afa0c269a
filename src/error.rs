use thiserror::Error;

use crate::scrapers::types::FeedKind;

/// Failure to retrieve a document from the origin
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned status {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("{url} returned an empty body")]
    EmptyBody { url: String },
}

impl FetchError {
    /// Short machine-readable tag used in logs and reports
    pub fn reason(&self) -> &'static str {
        match self {
            FetchError::Network { .. } => "network",
            FetchError::HttpStatus { .. } => "http_status",
            FetchError::EmptyBody { .. } => "empty_body",
        }
    }

    pub fn url(&self) -> &str {
        match self {
            FetchError::Network { url, .. }
            | FetchError::HttpStatus { url, .. }
            | FetchError::EmptyBody { url } => url,
        }
    }
}

/// Failure to turn a detail page into a record
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("no script block carries the embedded listing payload")]
    MarkerNotFound,

    #[error("embedded listing payload is not valid JSON: {0}")]
    JsonDecode(#[from] serde_json::Error),

    /// Lists the flags that were set. An empty list means none was.
    #[error("expected exactly one sale type flag to be set, found {set_flags:?}")]
    AmbiguousSaleTypeFlags { set_flags: Vec<String> },
}

impl ExtractError {
    pub fn reason(&self) -> &'static str {
        match self {
            ExtractError::MarkerNotFound => "marker_not_found",
            ExtractError::JsonDecode(_) => "json_decode",
            ExtractError::AmbiguousSaleTypeFlags { .. } => "ambiguous_sale_type_flags",
        }
    }
}

/// Why a single detail page produced no record
#[derive(Error, Debug)]
pub enum DetailError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extract(#[from] ExtractError),
}

impl DetailError {
    pub fn reason(&self) -> &'static str {
        match self {
            DetailError::Fetch(e) => e.reason(),
            DetailError::Extract(e) => e.reason(),
        }
    }
}

/// Column set of a row disagrees with the schema fixed by the first row
#[derive(Error, Debug, PartialEq)]
pub enum SchemaError {
    #[error("row {row} has columns {found:?}, expected {expected:?}")]
    ColumnMismatch {
        row: usize,
        expected: Vec<String>,
        found: Vec<String>,
    },
}

/// Errors that stop a feed or the whole run
#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("first page of feed {feed} is unreachable: {source}")]
    FirstPageUnreachable {
        feed: FeedKind,
        #[source]
        source: FetchError,
    },

    #[error("invalid configuration: {0}")]
    Config(#[from] config::ConfigError),

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

pub type Result<T, E = CrawlError> = std::result::Result<T, E>;
