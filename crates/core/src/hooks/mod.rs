//! Hook system
//!
//! Any number of listeners share one interception of a target function:
//! - [`HookPoint`] runs the listeners and decides whether the original runs
//! - Primitives redirect the real call site: function detours
//!   ([`FunctionDetour`]), per-instance vtable copies ([`InstanceVTableSwap`])
//!   and class-wide slot patches ([`GlobalVTableSwap`])
//! - [`HookRegistry`] keeps listeners across attach/detach of the targets
//!   listed in [`HookId`]

mod decision;
pub mod error;
pub mod inline;
pub mod landing;
pub mod point;
pub mod primitive;
pub mod registry;
pub mod slot;
pub mod strategy;
pub mod target;
pub mod targets;
pub mod vtable;

pub use decision::Decision;
pub use error::HookError;
pub use inline::FunctionDetour;
pub use landing::{land, ActiveSlot, StaticTarget};
pub use point::{BoundOriginal, HookPoint, InstallState, ListenerFn, ListenerId};
pub use primitive::{InterceptionPrimitive, PrimitiveFactory, PrimitiveKind};
pub use registry::{HookRegistry, HookStatus, HookSummary};
pub use slot::{resolve_member_slot, MemberFnRepr};
pub use strategy::InterceptionStrategy;
pub use target::{HookId, HookTarget, Scope};
pub use vtable::{GlobalVTableSwap, InstanceVTableSwap};
