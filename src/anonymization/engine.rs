//! Main anonymization engine
//!
//! This module provides the [`AnonymizerEngine`], which applies an ordered rule
//! set to FHIR records.
//!
//! # Architecture
//!
//! The engine coordinates four components, all built once at construction:
//! - **Rule set**: ordered selectors paired with a method and its options
//! - **Processor registry**: one processor per method, seeded with keys
//! - **Validator**: optional input/output structural checks
//! - **Log dispatch**: optional `tracing` sink scoped to this engine
//!
//! # Rule precedence
//!
//! Rules run in declared order and the first rule to match a node claims it.
//! Later rules skip claimed nodes and everything below them. When a later rule
//! matches an ancestor of claimed nodes, it runs on the ancestor and the
//! claimed nodes are put back afterwards. `resourceType` markers are always
//! put back, but a nested resource whose content was removed entirely is
//! dropped along with its marker.
//!
//! # Examples
//!
//! ```
//! use cloak::anonymization::{AnonymizationSettings, AnonymizerEngine};
//! use cloak::config::{AnonymizerConfig, RuleConfig};
//!
//! # fn example() -> cloak::domain::Result<()> {
//! let config = AnonymizerConfig {
//!     rules: vec![
//!         RuleConfig::new("Patient.name.family", "keep"),
//!         RuleConfig::new("Patient.name", "redact"),
//!     ],
//!     ..Default::default()
//! };
//! let engine = AnonymizerEngine::new(config)?;
//!
//! let input = r#"{"resourceType":"Patient","name":[{"family":"Chalmers","given":["Peter"]}]}"#;
//! let output = engine.anonymize_json(input, &AnonymizationSettings::default())?;
//! assert_eq!(
//!     output.as_deref(),
//!     Some(r#"{"resourceType":"Patient","name":[{"family":"Chalmers"}]}"#)
//! );
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

use crate::adapters::fhir_json;
use crate::anonymization::context::{EngineContext, ResolvedContext};
use crate::anonymization::processors::ProcessContext;
use crate::anonymization::registry::ProcessorRegistry;
use crate::anonymization::rules::{AnonymizationRule, RuleSet};
use crate::anonymization::settings::AnonymizationSettings;
use crate::anonymization::validation::{RecordValidator, StructuralValidator};
use crate::config::{load_config, AnonymizerConfig, ProcessingErrorPolicy};
use crate::domain::{CloakError, ElementNode, ErrorKind, Resource, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// One navigation step from a node to a descendant: the child's name, its
/// position among same-named siblings, and whether it is an array entry
type Step = (String, usize, bool);

/// A node that must survive a broader rule, with the way back to it
struct Protected {
    steps: Vec<Step>,
    node: ElementNode,
}

/// Rule-driven anonymization engine
///
/// # Thread Safety
///
/// The engine is immutable after construction and can be shared across
/// threads with `Arc`. Calls need no synchronization.
pub struct AnonymizerEngine {
    rules: RuleSet,
    registry: ProcessorRegistry,
    policy: ProcessingErrorPolicy,
    validator: Arc<dyn RecordValidator>,
    dispatch: Option<tracing::Dispatch>,
}

impl std::fmt::Debug for AnonymizerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnonymizerEngine")
            .field("rules", &self.rules.len())
            .field("processors", &self.registry.len())
            .field("policy", &self.policy)
            .finish()
    }
}

/// Builder for [`AnonymizerEngine`]
pub struct AnonymizerEngineBuilder {
    config: AnonymizerConfig,
    context: Option<EngineContext>,
    validator: Option<Arc<dyn RecordValidator>>,
    dispatch: Option<tracing::Dispatch>,
}

impl AnonymizerEngineBuilder {
    /// Resolve the date-shift key prefix from a file or folder context
    ///
    /// Without a context, `parameters.date_shift_key_prefix` is used verbatim.
    pub fn context(mut self, context: EngineContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Replace the default [`StructuralValidator`]
    pub fn validator(mut self, validator: Arc<dyn RecordValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Send this engine's log events to a dedicated dispatcher
    pub fn log_dispatch(mut self, dispatch: tracing::Dispatch) -> Self {
        self.dispatch = Some(dispatch);
        self
    }

    /// Build the engine
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the configuration is invalid, the
    /// context cannot be resolved for the scope, a rule names an unknown
    /// method or an invalid selector, or a rule's processor is missing its key
    /// or options
    pub fn build(self) -> Result<AnonymizerEngine> {
        let Self {
            config,
            context,
            validator,
            dispatch,
        } = self;

        let build = || -> Result<AnonymizerEngine> {
            config.validate().map_err(CloakError::Configuration)?;

            let scope = config.parameters.date_shift_scope;
            let resolved = match &context {
                Some(context) => context.resolve(scope)?,
                None => ResolvedContext::from_parameters(&config.parameters),
            };

            let registry = ProcessorRegistry::build(&config.parameters, &resolved)?;
            let mut rules = RuleSet::from_config(&config.rules)?;
            rules.prepare(&registry)?;

            tracing::info!(
                rules = rules.len(),
                scope = %scope,
                policy = %config.processing_error,
                "Anonymizer engine ready"
            );

            Ok(AnonymizerEngine {
                rules,
                registry,
                policy: config.processing_error,
                validator: validator.unwrap_or_else(|| Arc::new(StructuralValidator::new())),
                dispatch: dispatch.clone(),
            })
        };

        match &dispatch {
            Some(dispatch) => tracing::dispatcher::with_default(dispatch, build),
            None => build(),
        }
    }
}

impl AnonymizerEngine {
    /// Start building an engine from a configuration
    pub fn builder(config: AnonymizerConfig) -> AnonymizerEngineBuilder {
        AnonymizerEngineBuilder {
            config,
            context: None,
            validator: None,
            dispatch: None,
        }
    }

    /// Create an engine from an already-resolved configuration
    ///
    /// An explicit `date_shift_key_prefix` in the parameters is used verbatim.
    ///
    /// # Errors
    ///
    /// See [`AnonymizerEngineBuilder::build`]
    pub fn new(config: AnonymizerConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    /// Load a configuration file and create an engine for a file or folder context
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the file cannot be loaded, or any
    /// error from [`AnonymizerEngineBuilder::build`]
    pub fn from_file(path: impl AsRef<Path>, context: &EngineContext) -> Result<Self> {
        let config = load_config(path)?;
        Self::builder(config).context(context.clone()).build()
    }

    /// Ordered rules
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Processing-error policy
    pub fn policy(&self) -> ProcessingErrorPolicy {
        self.policy
    }

    /// Anonymize an element tree
    ///
    /// When the element is a resource root, the settings' validation switches
    /// apply to it; other elements are transformed without validation.
    ///
    /// Returns `Ok(None)` when a processing error occurred under the `skip` policy.
    ///
    /// # Errors
    ///
    /// Returns configuration and validation errors, and processing errors under
    /// the `throw` policy
    pub fn anonymize_element(
        &self,
        element: &ElementNode,
        settings: &AnonymizationSettings,
    ) -> Result<Option<ElementNode>> {
        self.in_log_scope(|| {
            if settings.validate_input && element.resource_type().is_some() {
                let input = match element.to_resource() {
                    Ok(input) => input,
                    Err(e) => return self.on_failure(e, element.name()),
                };
                self.validator.validate_input(&input)?;
            }

            let Some(tree) = self.transform(element.clone())? else {
                return Ok(None);
            };

            if settings.validate_output && tree.resource_type().is_some() {
                let output = match tree.to_resource() {
                    Ok(output) => output,
                    Err(e) => return self.on_failure(e, tree.name()),
                };
                self.validator.validate_output(&output)?;
            }
            Ok(Some(tree))
        })
    }

    /// Anonymize a resource
    ///
    /// Input validation runs before any transformation and is never
    /// suppressed. Output validation runs only when a result exists.
    ///
    /// # Errors
    ///
    /// Returns configuration and validation errors, and processing errors under
    /// the `throw` policy
    pub fn anonymize_resource(
        &self,
        resource: &Resource,
        settings: &AnonymizationSettings,
    ) -> Result<Option<Resource>> {
        self.in_log_scope(|| self.anonymize_resource_inner(resource, settings))
    }

    /// Parse, anonymize and serialize one JSON resource
    ///
    /// # Errors
    ///
    /// Returns a parse error for malformed input, plus everything
    /// [`AnonymizerEngine::anonymize_resource`] returns
    pub fn anonymize_json(
        &self,
        text: &str,
        settings: &AnonymizationSettings,
    ) -> Result<Option<String>> {
        self.in_log_scope(|| {
            let resource = fhir_json::parse(text)?;
            match self.anonymize_resource_inner(&resource, settings)? {
                Some(anonymized) => fhir_json::serialize(&anonymized, settings.pretty_output).map(Some),
                None => Ok(None),
            }
        })
    }

    fn anonymize_resource_inner(
        &self,
        resource: &Resource,
        settings: &AnonymizationSettings,
    ) -> Result<Option<Resource>> {
        if settings.validate_input {
            self.validator.validate_input(resource)?;
        }

        let tree = ElementNode::from_resource(resource);
        let Some(tree) = self.transform(tree)? else {
            return Ok(None);
        };

        let anonymized = match tree.to_resource() {
            Ok(anonymized) => anonymized,
            Err(e) => return self.on_failure(e, resource.resource_type()),
        };

        if settings.validate_output {
            self.validator.validate_output(&anonymized)?;
        }
        Ok(Some(anonymized))
    }

    /// Apply the rules under the processing-error policy
    fn transform(&self, mut tree: ElementNode) -> Result<Option<ElementNode>> {
        let started = Instant::now();
        let resource_type = tree.name().to_string();

        match self.apply(&mut tree) {
            Ok(()) => {
                tracing::debug!(
                    resource_type = %resource_type,
                    elapsed_us = started.elapsed().as_micros() as u64,
                    "Record anonymized"
                );
                Ok(Some(tree))
            }
            Err(e) => self.on_failure(e, &resource_type),
        }
    }

    fn on_failure<T>(&self, error: CloakError, resource_type: &str) -> Result<Option<T>> {
        if error.kind() == ErrorKind::Processing && self.policy == ProcessingErrorPolicy::Skip {
            tracing::warn!(
                resource_type = %resource_type,
                error = %error,
                "Record skipped after processing error"
            );
            return Ok(None);
        }
        tracing::error!(resource_type = %resource_type, error = %error, "Anonymization failed");
        Err(error)
    }

    fn in_log_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        match &self.dispatch {
            Some(dispatch) => tracing::dispatcher::with_default(dispatch, f),
            None => f(),
        }
    }

    /// Run every rule against the tree, in place
    fn apply(&self, tree: &mut ElementNode) -> Result<()> {
        let mut claimed: Vec<Vec<usize>> = Vec::new();
        let bare = bare_resources(tree);

        for rule in &self.rules {
            let processor = self.registry.get(rule.method())?;
            let roots = tree.resource_roots();
            let locations = rule.selector().select(tree);
            let mut applied = 0usize;

            for location in locations {
                if claimed.iter().any(|c| location.starts_with(c)) {
                    continue;
                }
                if tree.get(&location).is_none() {
                    continue;
                }

                let (resource_type, resource_id) = enclosing_resource(tree, &roots, &location);
                let location_text = tree.location_of(&location);
                let protected = protected_descendants(tree, &location, &claimed);
                let context = ProcessContext {
                    resource_type: &resource_type,
                    resource_id: resource_id.as_deref(),
                    location: &location_text,
                };

                if let Some(node) = tree.get_mut(&location) {
                    processor
                        .process(node, &context, rule.prepared())
                        .map_err(|e| e.at_path(&location_text))?;
                    for kept in protected {
                        graft(node, &kept.steps, kept.node);
                    }
                }

                claimed.retain(|c| !c.starts_with(&location));
                claimed.push(location);
                applied += 1;
            }

            log_rule(rule, applied);
        }

        drop_emptied_resources(tree, &bare);
        Ok(())
    }
}

fn log_rule(rule: &AnonymizationRule, applied: usize) {
    if applied > 0 {
        tracing::trace!(
            selector = %rule.selector(),
            method = %rule.method(),
            nodes = applied,
            "Rule applied"
        );
    }
}

/// Type and id of the innermost resource containing a location
fn enclosing_resource(
    tree: &ElementNode,
    roots: &[Vec<usize>],
    location: &[usize],
) -> (String, Option<String>) {
    roots
        .iter()
        .filter(|root| location.starts_with(root))
        .max_by_key(|root| root.len())
        .and_then(|root| tree.get(root))
        .and_then(|node| {
            node.resource_type()
                .map(|rt| (rt.to_string(), node.resource_id().map(str::to_string)))
        })
        .unwrap_or_else(|| (tree.name().to_string(), None))
}

fn has_content(node: &ElementNode) -> bool {
    node.value().is_some() || node.children().iter().any(has_content)
}

fn holds_only_marker(node: &ElementNode) -> bool {
    node.children()
        .iter()
        .all(|child| child.is_resource_type_marker() || !has_content(child))
}

/// Resource roots below the top of the tree, deepest first
fn nested_resources(tree: &ElementNode) -> Vec<Vec<usize>> {
    let mut roots: Vec<Vec<usize>> = tree
        .resource_roots()
        .into_iter()
        .filter(|root| !root.is_empty())
        .collect();
    roots.sort_by_key(|root| std::cmp::Reverse(root.len()));
    roots
}

/// Nested resources that hold nothing but their `resourceType`
fn bare_resources(tree: &ElementNode) -> Vec<Vec<Step>> {
    nested_resources(tree)
        .into_iter()
        .filter(|root| tree.get(root).is_some_and(holds_only_marker))
        .map(|root| steps_for(tree, &root))
        .collect()
}

/// Clear nested resources left with nothing but their `resourceType`
///
/// Resources that were already bare in the input stay. Deeper resources go
/// first so that emptying one can empty its container.
fn drop_emptied_resources(tree: &mut ElementNode, bare: &[Vec<Step>]) {
    for root in nested_resources(tree) {
        let emptied = tree
            .get(&root)
            .is_some_and(holds_only_marker)
            && !bare.contains(&steps_for(tree, &root));
        if emptied {
            if let Some(node) = tree.get_mut(&root) {
                node.clear();
            }
        }
    }
}

/// Snapshot of the claimed nodes and `resourceType` markers below a location
fn protected_descendants(
    tree: &ElementNode,
    location: &[usize],
    claimed: &[Vec<usize>],
) -> Vec<Protected> {
    let Some(node) = tree.get(location) else {
        return Vec::new();
    };

    let mut relative: Vec<Vec<usize>> = claimed
        .iter()
        .filter(|c| c.len() > location.len() && c.starts_with(location))
        .map(|c| c[location.len()..].to_vec())
        .collect();
    collect_markers(node, &mut Vec::new(), &mut relative);
    relative.sort();
    relative.dedup();

    relative
        .into_iter()
        .filter_map(|path| {
            let kept = node.get(&path)?.clone();
            Some(Protected {
                steps: steps_for(node, &path),
                node: kept,
            })
        })
        .collect()
}

fn collect_markers(node: &ElementNode, path: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
    for (index, child) in node.children().iter().enumerate() {
        path.push(index);
        if child.is_resource_type_marker() {
            out.push(path.clone());
        } else {
            collect_markers(child, path, out);
        }
        path.pop();
    }
}

fn steps_for(node: &ElementNode, path: &[usize]) -> Vec<Step> {
    let mut steps = Vec::with_capacity(path.len());
    let mut current = node;
    for &index in path {
        let siblings = current.children();
        let child = &siblings[index];
        let ordinal = siblings[..index]
            .iter()
            .filter(|c| c.name() == child.name())
            .count();
        steps.push((child.name().to_string(), ordinal, child.is_array_item()));
        current = child;
    }
    steps
}

/// Put a node back at its named position, creating empty parents as needed
fn graft(node: &mut ElementNode, steps: &[Step], kept: ElementNode) {
    let Some(((name, ordinal, is_array_item), rest)) = steps.split_first() else {
        *node = kept;
        return;
    };

    let existing = node
        .children()
        .iter()
        .filter(|c| c.name() == name.as_str())
        .count();
    for _ in existing..=*ordinal {
        let mut filler = ElementNode::new(name.as_str());
        filler.set_array_item(*is_array_item);
        node.push_child(filler);
    }

    if let Some(child) = node
        .children_mut()
        .iter_mut()
        .filter(|c| c.name() == name.as_str())
        .nth(*ordinal)
    {
        graft(child, rest, kept);
    }
}
