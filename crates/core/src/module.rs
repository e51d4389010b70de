//! Per-module hook handles
//!
//! Feature modules own one [`ModuleHook`] per target they listen to. The
//! handle keeps the callback while the module is disabled and registers it
//! with the [`HookRegistry`] only while enabled.
//!
//! # Example
//!
//! ```ignore
//! let mut hook = ModuleHook::<HltvCameraSetMode>::new(registry.clone(), |args| {
//!     tracing::debug!("Camera mode -> {}", args.1);
//! });
//!
//! if hook.is_available() {
//!     hook.set_enabled(true)?;
//! }
//! ```

use std::sync::Arc;

use grouphook_sdk::Function;

use crate::hooks::{HookError, HookRegistry, HookTarget, ListenerFn, ListenerId};

/// Listener on `H` that unregisters itself when dropped
pub struct ModuleHook<H: HookTarget> {
    registry: Arc<HookRegistry>,
    callback: ListenerFn<H::Signature>,
    listener: Option<ListenerId>,
}

impl<H: HookTarget> ModuleHook<H> {
    /// Create a disabled handle
    pub fn new<C>(registry: Arc<HookRegistry>, callback: C) -> Self
    where
        C: Fn(&mut <H::Signature as Function>::Args) -> <H::Signature as Function>::Output
            + Send
            + Sync
            + 'static,
    {
        Self {
            registry,
            callback: Arc::new(callback),
            listener: None,
        }
    }

    /// Register or unregister the callback
    ///
    /// Enabling registers even when the target is not attached yet; the
    /// callback then runs once it is.
    pub fn set_enabled(&mut self, enabled: bool) -> Result<(), HookError> {
        match (enabled, self.listener) {
            (true, None) => {
                let id = self
                    .registry
                    .add_shared_listener::<H>(self.callback.clone())?;
                self.listener = Some(id);
            }
            (false, Some(id)) => {
                self.registry.remove_listener(H::ID, id);
                self.listener = None;
            }
            _ => {}
        }
        Ok(())
    }

    pub fn is_enabled(&self) -> bool {
        self.listener.is_some()
    }

    /// Whether the target is currently attached
    pub fn is_available(&self) -> bool {
        self.registry.is_available(H::ID)
    }

    /// Original entry point of the target
    pub fn original(&self) -> Result<H::Signature, HookError> {
        self.registry.original::<H>()
    }
}

impl<H: HookTarget> Drop for ModuleHook<H> {
    fn drop(&mut self) {
        if let Some(id) = self.listener.take() {
            self.registry.remove_listener(H::ID, id);
        }
    }
}
