use std::path::PathBuf;

/// Result alias used throughout the compiler core.
pub type Result<T> = std::result::Result<T, CompileError>;

/// A compile error. Every variant keeps the context needed to act on it
/// (symbol name, resource, line number, search dirs) rather than just a
/// message, so callers can branch on the kind.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// A referenced symbol does not resolve to a file on the search path.
    #[error("function {name} not found in search dirs [{}]", display_dirs(.search_dirs))]
    FunctionNotFound {
        name: String,
        search_dirs: Vec<PathBuf>,
    },

    /// A `@require` target is missing from the symbol table, or the
    /// source a require wrapper is applied to lacks the function header.
    #[error("required function {name} not found: {reason}")]
    RequiredFunctionNotFound {
        name: String,
        required_by: Option<String>,
        reason: String,
    },

    /// The host code contains more than one `# FUNCTIONS` line.
    #[error("duplicated FUNCTIONS directive at line {line}")]
    DuplicatedFunctionsDirective { line: usize },

    /// Two `@embed` directives in one pass share the same `AS` name.
    #[error(
        "embed name {as_name} for resource {resource} at line {line} already used at line {first_line}"
    )]
    DuplicatedAsName {
        as_name: String,
        resource: String,
        line: usize,
        first_line: usize,
    },

    /// The embedded resource is neither a regular file nor a directory.
    #[error("unsupported embedded resource {resource} (as {as_name}) at line {line}: {source}")]
    UnsupportedEmbeddedResource {
        as_name: String,
        resource: PathBuf,
        line: usize,
        #[source]
        source: std::io::Error,
    },

    /// A processor is missing a configuration key it needs.
    #[error("{processor} processor: missing required configuration field {field}")]
    InitValidation {
        processor: &'static str,
        field: String,
    },

    /// A function file is not valid UTF-8.
    #[error(
        "function {name}: {} is not valid UTF-8 (invalid byte at offset {valid_up_to})",
        .path.display()
    )]
    NonUtf8Source {
        name: String,
        path: PathBuf,
        valid_up_to: usize,
    },

    #[error("template {template}: {message}")]
    Template { template: String, message: String },

    #[error("configuration error in {}: {message}", .path.display())]
    Config { path: PathBuf, message: String },

    #[error("invalid ignore pattern '{pattern}': {source}")]
    InvalidIgnorePattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot archive embedded directory {}: {source}", .resource.display())]
    Archive {
        resource: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The rewrite fixpoint did not stabilise within the configured cap.
    #[error("compilation did not converge after {iterations} iterations")]
    NotConverged { iterations: usize },
}

fn display_dirs(dirs: &[PathBuf]) -> String {
    dirs.iter()
        .map(|d| d.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl CompileError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CompileError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn template(template: impl Into<String>, message: impl ToString) -> Self {
        CompileError::Template {
            template: template.into(),
            message: message.to_string(),
        }
    }

    pub fn config(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        CompileError::Config {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Stable identifier of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            CompileError::FunctionNotFound { .. } => "FunctionNotFound",
            CompileError::RequiredFunctionNotFound { .. } => "RequiredFunctionNotFound",
            CompileError::DuplicatedFunctionsDirective { .. } => "DuplicatedFunctionsDirective",
            CompileError::DuplicatedAsName { .. } => "DuplicatedAsName",
            CompileError::UnsupportedEmbeddedResource { .. } => "UnsupportedEmbeddedResource",
            CompileError::InitValidation { .. } => "InitValidation",
            CompileError::NonUtf8Source { .. } => "NonUtf8Source",
            CompileError::Template { .. } => "Template",
            CompileError::Config { .. } => "Config",
            CompileError::InvalidIgnorePattern { .. } => "InvalidIgnorePattern",
            CompileError::Io { .. } => "Io",
            CompileError::Archive { .. } => "Archive",
            CompileError::NotConverged { .. } => "NotConverged",
        }
    }

    /// Serialize the error with its kind, message and context fields.
    pub fn to_json_value(&self) -> serde_json::Value {
        use serde_json::json;

        let context = match self {
            CompileError::FunctionNotFound { name, search_dirs } => json!({
                "name": name,
                "search_dirs": search_dirs.iter().map(|d| d.display().to_string()).collect::<Vec<_>>(),
            }),
            CompileError::RequiredFunctionNotFound {
                name, required_by, ..
            } => json!({ "name": name, "required_by": required_by }),
            CompileError::DuplicatedFunctionsDirective { line } => json!({ "line": line }),
            CompileError::DuplicatedAsName {
                as_name,
                resource,
                line,
                first_line,
            } => json!({
                "as_name": as_name,
                "resource": resource,
                "line": line,
                "first_line": first_line,
            }),
            CompileError::UnsupportedEmbeddedResource {
                as_name,
                resource,
                line,
                ..
            } => json!({
                "as_name": as_name,
                "resource": resource.display().to_string(),
                "line": line,
            }),
            CompileError::InitValidation { processor, field } => {
                json!({ "processor": processor, "field": field })
            }
            CompileError::NonUtf8Source {
                name,
                path,
                valid_up_to,
            } => json!({
                "name": name,
                "path": path.display().to_string(),
                "valid_up_to": valid_up_to,
            }),
            CompileError::Template { template, .. } => json!({ "template": template }),
            CompileError::Config { path, .. }
            | CompileError::Io { path, .. }
            | CompileError::Archive { resource: path, .. } => {
                json!({ "path": path.display().to_string() })
            }
            CompileError::InvalidIgnorePattern { pattern, .. } => json!({ "pattern": pattern }),
            CompileError::NotConverged { iterations } => json!({ "iterations": iterations }),
        };

        json!({
            "kind": self.kind(),
            "message": self.to_string(),
            "context": context,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_not_found_lists_search_dirs() {
        let err = CompileError::FunctionNotFound {
            name: "Log::info".to_string(),
            search_dirs: vec![PathBuf::from("src"), PathBuf::from("vendor/src")],
        };
        assert_eq!(
            err.to_string(),
            "function Log::info not found in search dirs [src, vendor/src]"
        );
        assert_eq!(err.kind(), "FunctionNotFound");
    }

    #[test]
    fn json_value_carries_context() {
        let err = CompileError::DuplicatedAsName {
            as_name: "config".to_string(),
            resource: "b.txt".to_string(),
            line: 12,
            first_line: 4,
        };
        let value = err.to_json_value();
        assert_eq!(value["kind"], "DuplicatedAsName");
        assert_eq!(value["context"]["first_line"], 4);
        assert_eq!(value["context"]["line"], 12);
    }
}
