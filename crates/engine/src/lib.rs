//! grouphook engine - Runtime Environment Collaborators
//!
//! This crate holds everything the interception core consumes from the
//! outside world:
//! - Locating raw target addresses by name ([`TargetLocator`])
//! - Reaching live foreign objects by interface name ([`Environment`])
//! - Announcing when that environment becomes available or goes away
//!   ([`SessionSignal`])
//!
//! # Architecture
//!
//! The embedding plugin builds an [`Environment`] once its interfaces are
//! known and hands it to the hook registry at load time. Targets that only
//! exist while a game session is running are attached when the session
//! signal fires `Started` and detached on `Ended`.
//!
//! # Thread Safety
//!
//! Instance accessors and locators are `Send + Sync`; raw addresses are
//! carried as integers inside them and only turned back into pointers on
//! request. The thread that built the environment is recorded for
//! [`Environment::is_main_thread`] checks.

pub mod environment;
pub mod error;
pub mod locator;
pub mod session;

pub use environment::{Environment, EnvironmentBuilder, InstanceAccessor};
pub use error::EnvironmentError;
pub use locator::{AddressTable, FnLocator, TargetLocator};
pub use session::{SessionEvent, SessionSignal, SessionTracker, SessionTransition, SubscriptionKey};
