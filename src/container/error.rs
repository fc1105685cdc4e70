//! Dependency container errors.

use thiserror::Error;

use crate::container::BoxError;

/// Errors raised while registering or resolving dependencies.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// A dependency with this name exists and overwrite was not requested.
    #[error("dependency `{0}` is already registered")]
    DuplicateKey(String),

    /// The declaration names neither (or both) of a module and a builder.
    #[error("dependency `{0}` must declare exactly one of a module reference or a builder")]
    InvalidSpec(String),

    /// Resolution of a name that was never registered.
    #[error("unknown dependency `{0}`")]
    UnknownDependency(String),

    /// The module resolver has no export under the referenced name.
    #[error("module `{module}` for dependency `{name}` could not be resolved")]
    ModuleNotFound { name: String, module: String },

    /// A constructor, builder or configure hook failed.
    #[error("failed to construct dependency `{name}`: {source}")]
    Construction {
        name: String,
        #[source]
        source: BoxError,
    },

    /// The resolved instance is not of the requested type.
    #[error("dependency `{name}` is not a `{expected}`")]
    TypeMismatch { name: String, expected: &'static str },
}

/// Result type for container operations.
pub type ContainerResult<T> = Result<T, ContainerError>;
