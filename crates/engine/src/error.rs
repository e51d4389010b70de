//! Error types for the runtime environment

/// Error type for target location and environment access
#[derive(Debug, thiserror::Error)]
pub enum EnvironmentError {
    /// The locator has no address for this target
    #[error("Target not found: {0}")]
    TargetNotFound(String),

    /// The locator resolved the target to a null address
    #[error("Locator returned null for: {0}")]
    NullPointer(String),

    /// No accessor is registered for this interface, or it returned null
    #[error("Interface not available: {0}")]
    InterfaceUnavailable(String),

    /// A session was started while another one is still active
    #[error("Session already active")]
    SessionAlreadyActive,
}
