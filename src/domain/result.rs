//! Result type alias for Cloak

use super::errors::CloakError;

/// Result type alias for Cloak operations
///
/// # Examples
///
/// ```
/// use cloak::domain::result::Result;
/// use cloak::domain::errors::CloakError;
///
/// fn failing_function() -> Result<()> {
///     Err(CloakError::Validation("missing resourceType".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, CloakError>;
