use thiserror::Error;

pub type ProjectionResult<T> = Result<T, ProjectionError>;

#[derive(Error, Debug)]
pub enum ProjectionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON conversion error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed schema or metadata: unknown types, duplicate bindings, cycles
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Unknown class '{0}'")]
    UnknownClass(String),

    #[error("Class '{class}' has no property '{property}'")]
    UnknownProperty { class: String, property: String },

    #[error("Cannot read '{segment}' from a {kind} value")]
    NotTraversable { segment: String, kind: &'static str },

    #[error("Failed to construct '{class}': {reason}")]
    ObjectConstruction { class: String, reason: String },

    #[error("Expression evaluation error: {0}")]
    Eval(String),

    #[error("Export error: {0}")]
    Export(String),
}

impl ProjectionError {
    /// True for errors caused by a malformed schema rather than by data
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ProjectionError::Schema(_)
                | ProjectionError::UnknownClass(_)
                | ProjectionError::ObjectConstruction { .. }
        )
    }
}
