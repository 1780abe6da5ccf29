//! Domain models and types for Cloak.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Records** ([`Resource`]) - a single FHIR resource in JSON form
//! - **Element trees** ([`ElementNode`]) - the navigable form the engine transforms
//! - **Error types** ([`CloakError`], [`ErrorKind`])
//! - **Result type alias** ([`Result`]) and the [`context::ResultExt`] extension
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, CloakError>`], and every error can
//! be classified with [`CloakError::kind`]:
//!
//! ```rust
//! use cloak::domain::{CloakError, ErrorKind};
//!
//! let err = CloakError::Configuration("Unknown method 'scramble'".to_string());
//! assert_eq!(err.kind(), ErrorKind::Configuration);
//! ```

pub mod context;
pub mod element;
pub mod errors;
pub mod resource;
pub mod result;

// Re-export commonly used types for convenience
pub use element::ElementNode;
pub use errors::{CloakError, ErrorKind};
pub use resource::Resource;
pub use result::Result;
