//! Construction-time context for scope-sensitive processors
//!
//! The date-shift key prefix depends on where records come from (a file, a
//! folder, or nowhere in particular). It has to be fixed before the processor
//! registry is built, so building a registry requires a [`ResolvedContext`],
//! and the only ways to obtain one are [`EngineContext::resolve`] and
//! [`ResolvedContext::from_parameters`].

use crate::config::{DateShiftScope, ParameterConfig};
use crate::domain::{CloakError, Result};
use std::path::{Path, PathBuf};

/// Where the records handled by an engine come from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineContext {
    file_name: Option<PathBuf>,
    folder_name: Option<PathBuf>,
}

impl EngineContext {
    /// No file or folder context
    pub fn none() -> Self {
        Self::default()
    }

    /// Records come from one file
    pub fn for_file(file_name: impl Into<PathBuf>) -> Self {
        Self {
            file_name: Some(file_name.into()),
            folder_name: None,
        }
    }

    /// Records come from one folder
    pub fn for_folder(folder_name: impl Into<PathBuf>) -> Self {
        Self {
            file_name: None,
            folder_name: Some(folder_name.into()),
        }
    }

    /// Records come from a file inside a folder
    pub fn new(file_name: Option<PathBuf>, folder_name: Option<PathBuf>) -> Self {
        Self {
            file_name,
            folder_name,
        }
    }

    /// Resolve the key prefix for a scope
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the scope needs a file or folder name
    /// that this context does not carry
    pub fn resolve(&self, scope: DateShiftScope) -> Result<ResolvedContext> {
        let key_prefix =
            resolve_prefix(scope, self.file_name.as_deref(), self.folder_name.as_deref())?;
        Ok(ResolvedContext { scope, key_prefix })
    }
}

/// Context whose key prefix is fixed; required to build a processor registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedContext {
    scope: DateShiftScope,
    key_prefix: String,
}

impl ResolvedContext {
    /// Take the scope and any pre-resolved prefix straight from the parameters
    pub fn from_parameters(parameters: &ParameterConfig) -> Self {
        Self {
            scope: parameters.date_shift_scope,
            key_prefix: parameters.date_shift_key_prefix.clone().unwrap_or_default(),
        }
    }

    /// Date-shift scope
    pub fn scope(&self) -> DateShiftScope {
        self.scope
    }

    /// Resolved key prefix (empty for resource scope)
    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }
}

/// Compute the date-shift key prefix for a scope
///
/// - `Resource`: empty
/// - `File`: the file's base name
/// - `Folder`: the folder's base name, trailing separators ignored
///
/// # Errors
///
/// Returns a configuration error when the scope's name is missing or has no base name
pub fn resolve_prefix(
    scope: DateShiftScope,
    file_name: Option<&Path>,
    folder_name: Option<&Path>,
) -> Result<String> {
    let (name, what) = match scope {
        DateShiftScope::Resource => return Ok(String::new()),
        DateShiftScope::File => (file_name, "file"),
        DateShiftScope::Folder => (folder_name, "folder"),
    };

    let name = name.ok_or_else(|| {
        CloakError::Configuration(format!(
            "Date shift scope '{scope}' requires a {what} name"
        ))
    })?;

    let base = base_name(&name.to_string_lossy());
    if base.is_empty() {
        return Err(CloakError::Configuration(format!(
            "Cannot derive a date shift key prefix from {what} name '{}'",
            name.display()
        )));
    }
    Ok(base)
}

fn base_name(path: &str) -> String {
    path.trim_end_matches(['/', '\\'])
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(DateShiftScope::File, Some("data/in/a.json"), None, "a.json")]
    #[test_case(DateShiftScope::File, Some("C:\\data\\b.ndjson"), None, "b.ndjson")]
    #[test_case(DateShiftScope::Folder, None, Some("/data/site-7/"), "site-7")]
    #[test_case(DateShiftScope::Folder, None, Some("exports\\\\"), "exports")]
    #[test_case(DateShiftScope::Resource, Some("ignored.json"), Some("ignored"), "")]
    fn test_resolve_prefix(
        scope: DateShiftScope,
        file: Option<&str>,
        folder: Option<&str>,
        expected: &str,
    ) {
        let prefix = resolve_prefix(scope, file.map(Path::new), folder.map(Path::new)).unwrap();
        assert_eq!(prefix, expected);
    }

    #[test]
    fn test_file_scope_without_file_name() {
        let err = EngineContext::none()
            .resolve(DateShiftScope::File)
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_folder_scope_with_root_only() {
        let err = EngineContext::for_folder("///")
            .resolve(DateShiftScope::Folder)
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_from_parameters_uses_explicit_prefix() {
        let parameters = ParameterConfig {
            date_shift_scope: DateShiftScope::File,
            date_shift_key_prefix: Some("batch-42.json".to_string()),
            ..Default::default()
        };
        let resolved = ResolvedContext::from_parameters(&parameters);
        assert_eq!(resolved.scope(), DateShiftScope::File);
        assert_eq!(resolved.key_prefix(), "batch-42.json");
    }
}
