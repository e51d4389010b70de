//! grouphook - Multiplexed function interception
//!
//! Lets independent feature modules observe, modify or replace calls to
//! functions of a host program they do not own, through one shared
//! interception per target.
//!
//! # Re-exports
//!
//! This crate re-exports the SDK and engine crates for convenience:
//! - [`sdk`] - Interface types, version strings, slot tables and signatures
//! - [`engine`] - Target locator, environment and session signal

pub use grouphook_engine as engine;
pub use grouphook_sdk as sdk;

#[doc(hidden)]
pub use paste;

pub mod config;
pub mod hooks;
pub mod logging;
pub mod module;

pub use config::{ConfigError, ConfigResult, HookConfig};
pub use hooks::{
    Decision, HookError, HookId, HookPoint, HookRegistry, HookStatus, HookSummary, HookTarget,
    InterceptionPrimitive, InterceptionStrategy, ListenerId, PrimitiveKind, Scope,
};
pub use module::ModuleHook;
