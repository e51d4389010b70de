//! Error type for hook operations

use grouphook_engine::EnvironmentError;
use grouphook_sdk::VTableSlot;

/// Error type for hook operations
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    /// The target's address or owning instance could not be found
    ///
    /// Expected on engine version mismatches. Modules opt out instead of
    /// propagating further.
    #[error("Target unresolved: {0}")]
    TargetUnresolved(#[from] EnvironmentError),

    /// A second primitive was about to be installed on one hook point
    #[error("Hook '{0}' already has an installed primitive")]
    DoubleInstall(String),

    /// A decision was set while no dispatch of that hook is running
    #[error("Decision set outside of a dispatch for '{0}'")]
    DecisionOutsideDispatch(String),

    /// The primitive is being installed further up this call stack
    #[error("Hook '{0}' is being installed")]
    InstallInProgress(String),

    /// The hook has no primitive for the current environment
    #[error("Hook '{0}' is not attached")]
    NotAttached(String),

    /// The hook is listed in the disabled hooks of the config
    #[error("Hook '{0}' is disabled by config")]
    DisabledByConfig(String),

    /// An instance accessor returned no object
    #[error("No live instance for '{0}'")]
    InstanceUnavailable(String),

    /// The virtual slot does not exist in the table
    #[error("{slot} out of range for '{name}' ({count} entries)")]
    InvalidSlot {
        name: String,
        slot: VTableSlot,
        count: usize,
    },

    #[error("Failed to create detour: {0}")]
    DetourCreation(String),

    #[error("Failed to enable hook: {0}")]
    EnableFailed(String),

    #[error("Failed to disable hook: {0}")]
    DisableFailed(String),

    #[error("Memory protection failed: {0}")]
    MemoryProtection(String),

    /// The target id is registered with a different recipe
    #[error("Unknown hook target: {0}")]
    UnknownTarget(String),
}
