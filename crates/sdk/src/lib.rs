//! grouphook SDK - Signature Traits and Engine Type Definitions
//!
//! This crate contains the type-level vocabulary shared by the hooking
//! framework and the code that feeds it. It has no dependencies and
//! compiles quickly, allowing parallel compilation of dependent crates.
//!
//! # Modules
//!
//! - [`function`] - Typed function signatures for interception targets
//! - [`interfaces`] - Opaque engine interface types and plain engine structs
//! - [`versions`] - Interface version strings
//! - [`vtables`] - Versioned virtual table slot layouts

pub mod function;
pub mod interfaces;
pub mod versions;
pub mod vtables;

pub use function::{Dispatch, Function, Method};
pub use interfaces::*;
pub use versions::INTERFACE_VERSIONS;
pub use vtables::{VTableLayout, VTableSlot, DESTRUCTOR_SLOTS};
