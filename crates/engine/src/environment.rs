//! Runtime environment handed to the hook registry
//!
//! Bundles the target locator with accessors for the live foreign objects
//! whose vtables get patched. Built once by the embedder when its engine
//! interfaces are known.

use std::collections::HashMap;
use std::ffi::c_void;
use std::ptr::NonNull;
use std::sync::Arc;
use std::thread::ThreadId;

use crate::error::EnvironmentError;
use crate::locator::TargetLocator;

/// Returns the current instance of a foreign object, if any
///
/// Accessors are consulted at call time, so an accessor over a mutable
/// global always reports whichever object is current.
pub type InstanceAccessor = Arc<dyn Fn() -> Option<NonNull<c_void>> + Send + Sync>;

/// Locator plus named instance accessors
pub struct Environment {
    locator: Arc<dyn TargetLocator>,
    interfaces: HashMap<String, InstanceAccessor>,
    main_thread_id: ThreadId,
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("interfaces", &self.interfaces.keys().collect::<Vec<_>>())
            .field("main_thread_id", &self.main_thread_id)
            .finish()
    }
}

impl Environment {
    /// Start building an environment around a locator
    pub fn builder(locator: Arc<dyn TargetLocator>) -> EnvironmentBuilder {
        EnvironmentBuilder {
            locator,
            interfaces: HashMap::new(),
        }
    }

    /// Resolve a target's raw address
    pub fn locate(&self, name: &str) -> Result<NonNull<c_void>, EnvironmentError> {
        let result = self.locator.locate(name);
        match &result {
            Ok(ptr) => tracing::debug!("Located '{}' at {:p}", name, ptr.as_ptr()),
            Err(e) => tracing::warn!("Failed to locate '{}': {}", name, e),
        }
        result
    }

    /// Current instance of an interface
    pub fn instance(&self, name: &str) -> Result<NonNull<c_void>, EnvironmentError> {
        let accessor = self.accessor(name)?;
        accessor().ok_or_else(|| EnvironmentError::InterfaceUnavailable(name.to_string()))
    }

    /// Accessor for an interface, for consumers that re-read it at call time
    pub fn accessor(&self, name: &str) -> Result<InstanceAccessor, EnvironmentError> {
        self.interfaces
            .get(name)
            .cloned()
            .ok_or_else(|| EnvironmentError::InterfaceUnavailable(name.to_string()))
    }

    /// Whether an accessor is registered for this interface
    pub fn has_interface(&self, name: &str) -> bool {
        self.interfaces.contains_key(name)
    }

    /// Check if current thread is the thread that built this environment
    pub fn is_main_thread(&self) -> bool {
        std::thread::current().id() == self.main_thread_id
    }
}

/// Builder for [`Environment`]
pub struct EnvironmentBuilder {
    locator: Arc<dyn TargetLocator>,
    interfaces: HashMap<String, InstanceAccessor>,
}

impl EnvironmentBuilder {
    /// Register a fixed interface pointer
    ///
    /// Null pointers are recorded as unavailable rather than rejected.
    pub fn with_interface(self, name: &str, ptr: *mut c_void) -> Self {
        let address = ptr as usize;
        self.with_accessor(name, move || NonNull::new(address as *mut c_void))
    }

    /// Register an accessor that is re-read on every request
    pub fn with_accessor<F>(mut self, name: &str, accessor: F) -> Self
    where
        F: Fn() -> Option<NonNull<c_void>> + Send + Sync + 'static,
    {
        self.interfaces.insert(name.to_string(), Arc::new(accessor));
        self
    }

    pub fn build(self) -> Environment {
        tracing::info!(
            "Environment ready with {} interface(s)",
            self.interfaces.len()
        );
        Environment {
            locator: self.locator,
            interfaces: self.interfaces,
            main_thread_id: std::thread::current().id(),
        }
    }
}
