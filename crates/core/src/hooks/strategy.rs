//! How a hook point builds its primitive
//!
//! Every hook point shares one dispatch algorithm; the strategy value is the
//! only thing that differs between a function detour, a per-instance vtable
//! swap and a class-wide vtable swap.

use std::ffi::c_void;
use std::ptr::NonNull;
use std::sync::Arc;

use grouphook_engine::InstanceAccessor;
use grouphook_sdk::VTableSlot;

use super::error::HookError;
use super::inline::FunctionDetour;
use super::primitive::{InterceptionPrimitive, PrimitiveFactory, PrimitiveKind};
use super::slot::{resolve_member_slot, MemberFnRepr};
use super::vtable::{vtable_of, GlobalVTableSwap, InstanceVTableSwap};

/// Recipe for the primitive of one hook point
#[derive(Clone)]
pub enum InterceptionStrategy {
    /// Detour a free function at a resolved address
    Function { target: NonNull<c_void> },

    /// Swap the vtable of one live instance
    InstanceMethod {
        instance: NonNull<c_void>,
        slot: VTableSlot,
        entries: Option<usize>,
    },

    /// Patch the class-wide table of whichever instance the accessor
    /// reports; the accessor is consulted again whenever the original is
    /// called on the current instance
    SharedMethod {
        accessor: InstanceAccessor,
        slot: VTableSlot,
    },

    /// Embedder supplied primitive
    Custom(Arc<PrimitiveFactory>),
}

// SAFETY: Raw addresses are only dereferenced while building the primitive,
// which happens under the hook point's install lock
unsafe impl Send for InterceptionStrategy {}
unsafe impl Sync for InterceptionStrategy {}

impl std::fmt::Debug for InterceptionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Function { target } => f
                .debug_struct("Function")
                .field("target", &target.as_ptr())
                .finish(),
            Self::InstanceMethod {
                instance,
                slot,
                entries,
            } => f
                .debug_struct("InstanceMethod")
                .field("instance", &instance.as_ptr())
                .field("slot", slot)
                .field("entries", entries)
                .finish(),
            Self::SharedMethod { slot, .. } => {
                f.debug_struct("SharedMethod").field("slot", slot).finish()
            }
            Self::Custom(_) => f.write_str("Custom"),
        }
    }
}

impl InterceptionStrategy {
    pub fn function(target: NonNull<c_void>) -> Self {
        Self::Function { target }
    }

    pub fn instance_method(instance: NonNull<c_void>, slot: VTableSlot) -> Self {
        Self::InstanceMethod {
            instance,
            slot,
            entries: None,
        }
    }

    /// Instance swap whose slot is decoded from a member function pointer
    pub fn instance_member(
        name: &str,
        instance: NonNull<c_void>,
        member: MemberFnRepr<'_>,
    ) -> Result<Self, HookError> {
        let slot = resolve_member_slot(member).ok_or_else(|| {
            HookError::UnknownTarget(format!("{}: member pointer is not virtual", name))
        })?;
        Ok(Self::instance_method(instance, slot))
    }

    pub fn shared_method(accessor: InstanceAccessor, slot: VTableSlot) -> Self {
        Self::SharedMethod { accessor, slot }
    }

    pub fn custom<F>(factory: F) -> Self
    where
        F: Fn(&str, *const ()) -> Result<Box<dyn InterceptionPrimitive>, HookError>
            + Send
            + Sync
            + 'static,
    {
        Self::Custom(Arc::new(factory))
    }

    /// Bound the probed table length of an instance swap
    pub fn with_entries(self, count: Option<usize>) -> Self {
        match self {
            Self::InstanceMethod { instance, slot, .. } => Self::InstanceMethod {
                instance,
                slot,
                entries: count,
            },
            other => other,
        }
    }

    /// Primitive kind this strategy produces
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Self::Function { .. } => PrimitiveKind::FunctionDetour,
            Self::InstanceMethod { .. } => PrimitiveKind::InstanceVTableSwap,
            Self::SharedMethod { .. } => PrimitiveKind::GlobalVTableSwap,
            Self::Custom(_) => PrimitiveKind::Custom,
        }
    }

    /// Accessor for the current receiver, for shared method hooks
    pub fn accessor(&self) -> Option<&InstanceAccessor> {
        match self {
            Self::SharedMethod { accessor, .. } => Some(accessor),
            _ => None,
        }
    }

    /// Build the primitive, leaving it uninstalled
    pub fn build(
        &self,
        name: &str,
        dispatcher: *const (),
    ) -> Result<Box<dyn InterceptionPrimitive>, HookError> {
        match self {
            Self::Function { target } => {
                let detour =
                    unsafe { FunctionDetour::new(name, target.as_ptr() as *const (), dispatcher)? };
                Ok(Box::new(detour))
            }
            Self::InstanceMethod {
                instance,
                slot,
                entries,
            } => {
                let swap =
                    unsafe { InstanceVTableSwap::new(name, *instance, *slot, *entries, dispatcher)? };
                Ok(Box::new(swap))
            }
            Self::SharedMethod { accessor, slot } => {
                let instance =
                    accessor().ok_or_else(|| HookError::InstanceUnavailable(name.to_string()))?;
                let swap = unsafe {
                    GlobalVTableSwap::new(name, vtable_of(instance), *slot, dispatcher)?
                };
                Ok(Box::new(swap))
            }
            Self::Custom(factory) => factory(name, dispatcher),
        }
    }
}
