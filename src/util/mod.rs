//! Utility functions shared by the HTTP layer and the storage backends.
//!
//! - **URL validation**: the absolute http/https predicate every feed URL must
//!   satisfy before it reaches a repository
//!
//! # Examples
//!
//! ```
//! use feeds_mgmt::util::is_valid_absolute_url;
//!
//! assert!(is_valid_absolute_url("https://example.com/feed.xml"));
//! assert!(!is_valid_absolute_url("/relative/feed.xml"));
//! ```

mod url_validator;

pub use url_validator::{is_valid_absolute_url, validate_url, UrlValidationError};
