//! Function detours
//!
//! Redirects a free function's entry point to the dispatcher. Trampoline
//! generation and instruction relocation are delegated to `retour`.

use std::sync::atomic::{AtomicBool, Ordering};

use retour::RawDetour;

use super::error::HookError;
use super::primitive::{InterceptionPrimitive, PrimitiveKind};

/// Detour of one function entry point
pub struct FunctionDetour {
    name: String,
    target: usize,
    detour: RawDetour,
    installed: AtomicBool,
}

// SAFETY: The detour only holds code addresses; enable/disable are
// serialized by the owning hook point's install lock
unsafe impl Send for FunctionDetour {}
unsafe impl Sync for FunctionDetour {}

impl FunctionDetour {
    /// Prepare a detour without enabling it
    ///
    /// # Safety
    /// - `target` must be the entry point of a function
    /// - `dispatcher` must have a signature compatible with the target
    pub unsafe fn new(
        name: &str,
        target: *const (),
        dispatcher: *const (),
    ) -> Result<Self, HookError> {
        tracing::debug!(
            "Creating detour '{}' at {:x} -> {:x}",
            name,
            target as usize,
            dispatcher as usize
        );

        let detour = RawDetour::new(target, dispatcher).map_err(|e| {
            tracing::error!("Failed to create detour '{}': {}", name, e);
            HookError::DetourCreation(format!("{}: {}", name, e))
        })?;

        Ok(Self {
            name: name.to_string(),
            target: target as usize,
            detour,
            installed: AtomicBool::new(false),
        })
    }

    /// Address of the detoured function
    pub fn target(&self) -> usize {
        self.target
    }
}

impl InterceptionPrimitive for FunctionDetour {
    fn kind(&self) -> PrimitiveKind {
        PrimitiveKind::FunctionDetour
    }

    fn install(&self) -> Result<(), HookError> {
        if self.installed.load(Ordering::Acquire) {
            return Ok(());
        }

        unsafe { self.detour.enable() }
            .map_err(|e| HookError::EnableFailed(format!("{}: {}", self.name, e)))?;

        self.installed.store(true, Ordering::Release);
        tracing::info!("Enabled detour '{}' at {:x}", self.name, self.target);
        Ok(())
    }

    fn uninstall(&self) -> Result<(), HookError> {
        if !self.installed.load(Ordering::Acquire) {
            return Ok(());
        }

        unsafe { self.detour.disable() }
            .map_err(|e| HookError::DisableFailed(format!("{}: {}", self.name, e)))?;

        self.installed.store(false, Ordering::Release);
        tracing::info!("Disabled detour '{}' at {:x}", self.name, self.target);
        Ok(())
    }

    fn is_installed(&self) -> bool {
        self.installed.load(Ordering::Acquire)
    }

    fn original(&self) -> *const () {
        self.detour.trampoline() as *const ()
    }
}

impl Drop for FunctionDetour {
    fn drop(&mut self) {
        if let Err(e) = self.uninstall() {
            tracing::error!("{}", e);
        }
    }
}
