//! VTable hooks via pointer replacement
//!
//! Two flavours:
//! - [`InstanceVTableSwap`] gives one object a private patched copy of its
//!   table, so only calls through that object are intercepted
//! - [`GlobalVTableSwap`] overwrites a slot of the class-wide table, so calls
//!   through every instance of the type are intercepted

use std::ffi::c_void;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, Ordering};

use grouphook_sdk::VTableSlot;

use super::error::HookError;
use super::primitive::{InterceptionPrimitive, PrimitiveKind};

/// Upper bound when probing a table of unknown length
const MAX_PROBED_ENTRIES: usize = 1024;

/// Count the leading entries of a vtable that point at executable memory
///
/// # Safety
/// `table` must point to a readable vtable.
pub unsafe fn count_vtable_entries(table: *const *const ()) -> usize {
    let mut count = 0;

    while count < MAX_PROBED_ENTRIES {
        let entry = *table.add(count);
        if entry.is_null() {
            break;
        }

        match region::query(entry as *const u8) {
            Ok(region) if region.is_executable() => count += 1,
            _ => break,
        }
    }

    count
}

/// Read the vtable pointer stored at the start of an object
///
/// # Safety
/// `instance` must point to a live object with a vtable.
pub unsafe fn vtable_of(instance: NonNull<c_void>) -> *mut *const () {
    *(instance.as_ptr() as *const *mut *const ())
}

/// One object redirected to a patched private copy of its vtable
///
/// The copy includes the entry preceding slot 0 (type info), so dynamic
/// casts on the object keep working while it is installed.
pub struct InstanceVTableSwap {
    name: String,
    instance: *mut *const *const (),
    original_table: *const *const (),
    shadow: Box<[*const ()]>,
    slot: VTableSlot,
    original: *const (),
    installed: AtomicBool,
    /// A later swap copied our shadow; it must outlive us
    leaked: AtomicBool,
}

// SAFETY: The pointers are only dereferenced in install/uninstall, which are
// serialized by the owning hook point's install lock
unsafe impl Send for InstanceVTableSwap {}
unsafe impl Sync for InstanceVTableSwap {}

impl InstanceVTableSwap {
    /// Copy and patch the instance's table without installing it
    ///
    /// `entries` is the table length when known, otherwise it is probed.
    ///
    /// # Safety
    /// - `instance` must be a live object whose first member is its vtable
    ///   pointer, and it must outlive the installed swap
    /// - `dispatcher` must have a signature compatible with the slot
    pub unsafe fn new(
        name: &str,
        instance: NonNull<c_void>,
        slot: VTableSlot,
        entries: Option<usize>,
        dispatcher: *const (),
    ) -> Result<Self, HookError> {
        let vptr_field = instance.as_ptr() as *mut *const *const ();
        let table = *vptr_field;
        let count = entries.unwrap_or_else(|| count_vtable_entries(table));

        if slot.index() >= count {
            return Err(HookError::InvalidSlot {
                name: name.to_string(),
                slot,
                count,
            });
        }

        let mut shadow = Vec::with_capacity(count + 1);
        shadow.push(*table.sub(1));
        for i in 0..count {
            shadow.push(*table.add(i));
        }

        let original = shadow[slot.index() + 1];
        shadow[slot.index() + 1] = dispatcher;

        tracing::debug!(
            "Prepared vtable copy for '{}': instance={:x}, vtable={:x}, {}={:x}, entries={}",
            name,
            instance.as_ptr() as usize,
            table as usize,
            slot,
            original as usize,
            count
        );

        Ok(Self {
            name: name.to_string(),
            instance: vptr_field,
            original_table: table,
            shadow: shadow.into_boxed_slice(),
            slot,
            original,
            installed: AtomicBool::new(false),
            leaked: AtomicBool::new(false),
        })
    }

    fn shadow_table(&self) -> *const *const () {
        // Entry 0 of the shadow is the type info slot
        unsafe { self.shadow.as_ptr().add(1) }
    }
}

impl InterceptionPrimitive for InstanceVTableSwap {
    fn kind(&self) -> PrimitiveKind {
        PrimitiveKind::InstanceVTableSwap
    }

    fn install(&self) -> Result<(), HookError> {
        if self.installed.load(Ordering::Acquire) {
            return Ok(());
        }

        unsafe {
            std::ptr::write_volatile(self.instance, self.shadow_table());
        }

        self.installed.store(true, Ordering::Release);
        tracing::info!(
            "Swapped vtable of '{}' instance at {:x} ({})",
            self.name,
            self.instance as usize,
            self.slot
        );
        Ok(())
    }

    fn uninstall(&self) -> Result<(), HookError> {
        if !self.installed.load(Ordering::Acquire) {
            return Ok(());
        }

        unsafe {
            if std::ptr::read_volatile(self.instance) != self.shadow_table() {
                // Someone else swapped after us, restoring would drop their hook
                tracing::warn!(
                    "VTable of '{}' instance changed since install, leaving it alone",
                    self.name
                );
                self.leaked.store(true, Ordering::Release);
            } else {
                std::ptr::write_volatile(self.instance, self.original_table);
            }
        }

        self.installed.store(false, Ordering::Release);
        tracing::info!("Restored vtable of '{}' instance", self.name);
        Ok(())
    }

    fn is_installed(&self) -> bool {
        self.installed.load(Ordering::Acquire)
    }

    fn original(&self) -> *const () {
        self.original
    }
}

impl Drop for InstanceVTableSwap {
    fn drop(&mut self) {
        if let Err(e) = self.uninstall() {
            tracing::error!("{}", e);
        }

        // The swap installed after ours restores the vptr to our shadow
        if self.leaked.load(Ordering::Acquire) {
            tracing::debug!("Leaking vtable copy of '{}'", self.name);
            std::mem::forget(std::mem::take(&mut self.shadow));
        }
    }
}

/// One slot of a class-wide vtable pointed at the dispatcher
pub struct GlobalVTableSwap {
    name: String,
    slot_address: *mut *const (),
    slot: VTableSlot,
    original: *const (),
    dispatcher: *const (),
    installed: AtomicBool,
}

// SAFETY: See InstanceVTableSwap
unsafe impl Send for GlobalVTableSwap {}
unsafe impl Sync for GlobalVTableSwap {}

impl GlobalVTableSwap {
    /// Record the slot's current entry without patching it
    ///
    /// # Safety
    /// - `table` must be a vtable with more than `slot` entries
    /// - `dispatcher` must have a signature compatible with the slot
    pub unsafe fn new(
        name: &str,
        table: *mut *const (),
        slot: VTableSlot,
        dispatcher: *const (),
    ) -> Result<Self, HookError> {
        if table.is_null() {
            return Err(HookError::InvalidSlot {
                name: name.to_string(),
                slot,
                count: 0,
            });
        }

        let slot_address = table.add(slot.index());
        let original = *slot_address;

        tracing::debug!(
            "Prepared global vtable hook '{}': vtable={:x}, {}={:x}",
            name,
            table as usize,
            slot,
            original as usize
        );

        Ok(Self {
            name: name.to_string(),
            slot_address,
            slot,
            original,
            dispatcher,
            installed: AtomicBool::new(false),
        })
    }

    fn write_slot(&self, value: *const ()) -> Result<(), HookError> {
        unsafe {
            // Previous protection is restored when the guard drops
            let _guard = region::protect_with_handle(
                self.slot_address as *const u8,
                std::mem::size_of::<usize>(),
                region::Protection::READ_WRITE,
            )
            .map_err(|e| HookError::MemoryProtection(format!("{}: {}", self.name, e)))?;

            std::ptr::write_volatile(self.slot_address, value);
        }
        Ok(())
    }
}

impl InterceptionPrimitive for GlobalVTableSwap {
    fn kind(&self) -> PrimitiveKind {
        PrimitiveKind::GlobalVTableSwap
    }

    fn install(&self) -> Result<(), HookError> {
        if self.installed.load(Ordering::Acquire) {
            return Ok(());
        }

        self.write_slot(self.dispatcher)?;
        self.installed.store(true, Ordering::Release);
        tracing::info!("Created global vtable hook '{}' at {}", self.name, self.slot);
        Ok(())
    }

    fn uninstall(&self) -> Result<(), HookError> {
        if !self.installed.load(Ordering::Acquire) {
            return Ok(());
        }

        self.write_slot(self.original)?;
        self.installed.store(false, Ordering::Release);
        tracing::info!("Removed global vtable hook '{}'", self.name);
        Ok(())
    }

    fn is_installed(&self) -> bool {
        self.installed.load(Ordering::Acquire)
    }

    fn original(&self) -> *const () {
        self.original
    }
}

impl Drop for GlobalVTableSwap {
    fn drop(&mut self) {
        if let Err(e) = self.uninstall() {
            tracing::error!("{}", e);
        }
    }
}
