//! Low-level interception primitives
//!
//! A primitive wraps one physical interception technique for one target:
//! a function detour, an instance vtable swap or a shared vtable slot swap.
//! It is built once per hook point and only toggled afterwards.

use super::error::HookError;

/// Interception technique used by a primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    /// Entry point of a free function redirected to the dispatcher
    FunctionDetour,
    /// One object's vtable pointer replaced with a patched private copy
    InstanceVTableSwap,
    /// One slot of a class-wide vtable overwritten
    GlobalVTableSwap,
    /// Embedder supplied primitive
    Custom,
}

impl std::fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PrimitiveKind::FunctionDetour => "detour",
            PrimitiveKind::InstanceVTableSwap => "instance vtable",
            PrimitiveKind::GlobalVTableSwap => "global vtable",
            PrimitiveKind::Custom => "custom",
        };
        f.write_str(name)
    }
}

/// One physical interception of one target
///
/// The original entry point is fixed when the primitive is built and does
/// not change across install/uninstall cycles. Dropping an installed
/// primitive uninstalls it.
pub trait InterceptionPrimitive: Send + Sync {
    fn kind(&self) -> PrimitiveKind;

    /// Redirect the real call site to the dispatcher
    fn install(&self) -> Result<(), HookError>;

    /// Restore the real call site
    fn uninstall(&self) -> Result<(), HookError>;

    fn is_installed(&self) -> bool;

    /// Entry point of the pre-redirection code
    fn original(&self) -> *const ();
}

/// Builds a primitive for a named target and a dispatcher address
pub type PrimitiveFactory =
    dyn Fn(&str, *const ()) -> Result<Box<dyn InterceptionPrimitive>, HookError> + Send + Sync;
