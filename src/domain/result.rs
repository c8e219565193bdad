//! Result type alias for geopublish

use super::errors::GeoPublishError;

/// Result type alias for geopublish operations
///
/// # Examples
///
/// ```
/// use geopublish::domain::result::Result;
/// use geopublish::domain::errors::GeoPublishError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(GeoPublishError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, GeoPublishError>;
