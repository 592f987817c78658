//! Device configuration
//!
//! Every backend device takes a `Config` at creation and hands it to the
//! shaders it builds.

/// Shader layer configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Reject `set_buffer` calls whose element type or element count disagree
    /// with the type the backend reflected for the parameter
    pub validate_types: bool,

    /// Emit a TRACE log line for every GPU upload performed by `begin()`
    pub trace_uploads: bool,

    /// Device label used as a prefix in log messages
    pub label: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            validate_types: true,
            trace_uploads: cfg!(debug_assertions),
            label: String::from("prism"),
        }
    }
}

impl Config {
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_validate_types(mut self, validate: bool) -> Self {
        self.validate_types = validate;
        self
    }

    pub fn with_trace_uploads(mut self, trace: bool) -> Self {
        self.trace_uploads = trace;
        self
    }
}
