use thiserror::Error;

/// Error type returned by hooks and JSON operator constructors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Rejected hook registrations.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("hook type {0} is an interface, a concrete type is expected")]
    InterfaceType(String),

    #[error("type {0} has no Equal(T) bool method")]
    NoEqualMethod(String),

    #[error("type {0} is not a struct, cannot ignore its unexported fields")]
    NotStruct(String),
}
