use thiserror::Error;
use url::Url;

/// Reasons a string is rejected as a feed URL.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum UrlValidationError {
    /// The string could not be parsed as an absolute URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// The URL has no host component.
    #[error("URL has no host")]
    MissingHost,
}

/// Validates a string as an absolute feed URL.
///
/// A feed URL must parse as an absolute URI, use the `http` or `https`
/// scheme, and carry a non-empty host. Relative references such as
/// `/path/to/file` fail to parse and are rejected.
///
/// # Errors
///
/// - [`UrlValidationError::InvalidUrl`] if the string does not parse
/// - [`UrlValidationError::UnsupportedScheme`] for any scheme but http/https
/// - [`UrlValidationError::MissingHost`] if the host is empty
///
/// # Examples
///
/// ```
/// use feeds_mgmt::util::validate_url;
///
/// let url = validate_url("http://feeds.example.com/a.xml").unwrap();
/// assert_eq!(url.host_str(), Some("feeds.example.com"));
///
/// assert!(validate_url("/path/to/file").is_err());
/// assert!(validate_url("ftp://example.com/feed").is_err());
/// ```
pub fn validate_url(raw: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(raw)?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(UrlValidationError::MissingHost),
    }
}

/// Returns true if `raw` is an absolute http/https URL with a non-empty host.
///
/// Total over any input; never panics.
pub fn is_valid_absolute_url(raw: &str) -> bool {
    validate_url(raw).is_ok()
}
