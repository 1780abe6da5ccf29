//! Per-call anonymization settings

/// Options for a single anonymization call
///
/// The default performs no validation and produces compact output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnonymizationSettings {
    /// Validate the record before transforming it
    pub validate_input: bool,
    /// Validate the transformed record
    pub validate_output: bool,
    /// Pretty-print serialized output
    pub pretty_output: bool,
}

impl AnonymizationSettings {
    /// Settings with input and output validation enabled
    pub fn validated() -> Self {
        Self {
            validate_input: true,
            validate_output: true,
            pretty_output: false,
        }
    }

    pub fn with_validate_input(mut self, enabled: bool) -> Self {
        self.validate_input = enabled;
        self
    }

    pub fn with_validate_output(mut self, enabled: bool) -> Self {
        self.validate_output = enabled;
        self
    }

    pub fn with_pretty_output(mut self, enabled: bool) -> Self {
        self.pretty_output = enabled;
        self
    }
}
