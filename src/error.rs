use thiserror::Error;

use crate::value::Kind;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    #[error("Config not found: {0}")]
    ConfigNotFound(String),
    #[error("Config syntax error{}: {message}", .line.map(|l| format!(" on line {l}")).unwrap_or_default())]
    ConfigSyntax { message: String, line: Option<usize> },
    #[error("{kind} '{name}' is defined more than once")]
    DuplicateDefinition { kind: &'static str, name: String },
    #[error("Variable '{name}' declared as {declared} but redefined as {found}")]
    TypeMismatch { name: String, declared: Kind, found: Kind },
    #[error("Cannot convert {from} value '{text}' to {to}")]
    Conversion { from: Kind, to: Kind, text: String },
    #[error("Variable '{0}' is defined in terms of itself")]
    RecursiveDefinition(String),
    #[error("Unknown target: {0}")]
    UnknownTarget(String),
    #[error("Unknown reference: {0}")]
    UnknownReference(String),
    #[error("Invalid date string: {0}")]
    InvalidDateString(String),
    #[error("Expression error: {0}")]
    Expression(String),
    #[error("Settings error: {0}")]
    Settings(String),
}

pub type Result<T> = std::result::Result<T, CatalogError>;

impl CatalogError {
    pub fn syntax(message: impl Into<String>) -> Self {
        Self::ConfigSyntax { message: message.into(), line: None }
    }
    /// Attaches a line number to syntax errors that do not carry one yet.
    pub fn at_line(self, number: usize) -> Self {
        match self {
            Self::ConfigSyntax { message, line: None } => Self::ConfigSyntax { message, line: Some(number) },
            other => other,
        }
    }
}

// Helper conversions
impl From<config::ConfigError> for CatalogError {
    fn from(e: config::ConfigError) -> Self { Self::Settings(e.to_string()) }
}
impl From<std::io::Error> for CatalogError {
    fn from(e: std::io::Error) -> Self { Self::ConfigNotFound(e.to_string()) }
}
