//! Error types for schema generation and validation.

/// Errors raised while turning a schema model into SQL.
///
/// Validation problems are reported as [`ValidationIssue`]s instead; these
/// errors only cover input that cannot be assigned any meaningful SQL.
///
/// [`ValidationIssue`]: crate::validate::ValidationIssue
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DdlError {
    /// An auto-increment column that the dialect cannot express.
    #[error(
        "Column '{table}.{column}' is auto-increment but has type '{data_type}'; \
         {dialect} requires an integer primary key"
    )]
    InvalidAutoIncrement {
        /// Owning table.
        table: String,
        /// Offending column.
        column: String,
        /// Declared column type.
        data_type: String,
        /// Dialect name.
        dialect: String,
    },

    /// A default value that cannot be rendered for the dialect.
    #[error("Default value for '{table}.{column}' cannot be rendered: {reason}")]
    UnsupportedDefault {
        /// Owning table.
        table: String,
        /// Offending column.
        column: String,
        /// Why rendering failed.
        reason: String,
    },

    /// A table-level or index-level construct the dialect family cannot emit.
    #[error("{dialect} cannot express {construct} on '{object}'")]
    UnsupportedConstruct {
        /// Qualified object name (table or index).
        object: String,
        /// The construct (e.g. "partitioning").
        construct: String,
        /// Dialect name.
        dialect: String,
    },

    /// An index or constraint names a column that the table does not have.
    #[error("'{object}' references unknown column '{column}' of table '{table}'")]
    UnknownColumn {
        /// Owning table.
        table: String,
        /// The referencing index or constraint.
        object: String,
        /// Missing column.
        column: String,
    },

    /// A table without any column.
    #[error("Table '{0}' has no columns")]
    EmptyTable(String),

    /// A function definition whose body contradicts its declared language.
    #[error("Function '{function}' is malformed: {reason}")]
    MalformedFunction {
        /// Function name.
        function: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Multiple errors occurred.
    #[error("Multiple errors occurred:\n{}", .0.iter().map(|e| format!("  - {e}")).collect::<Vec<_>>().join("\n"))]
    Multiple(Vec<DdlError>),
}

impl DdlError {
    /// Folds a list of errors into a single error.
    ///
    /// Returns `None` for an empty list and the error itself for a
    /// single-element list.
    #[must_use]
    pub fn from_many(mut errors: Vec<Self>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(Self::Multiple(errors)),
        }
    }
}

/// Result type for generation operations.
pub type Result<T> = std::result::Result<T, DdlError>;
