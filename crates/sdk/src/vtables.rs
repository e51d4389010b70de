//! Versioned virtual table layouts
//!
//! Slot numbers for the virtual methods we intercept, one table per engine
//! type. Each table records the interface version its numbers were taken
//! from; a new engine build that reorders virtuals needs a new table, not a
//! pointer-to-member decode at runtime.

use crate::versions;

/// Index into a virtual dispatch table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VTableSlot(usize);

impl VTableSlot {
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Numeric slot index
    pub const fn index(self) -> usize {
        self.0
    }

    /// Offset of the slot from the start of the table in bytes
    pub const fn byte_offset(self) -> usize {
        self.0 * std::mem::size_of::<usize>()
    }
}

impl std::fmt::Display for VTableSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "slot[{}]", self.0)
    }
}

/// Vtable entries occupied by a virtual destructor
///
/// MSVC emits a single scalar deleting destructor, the Itanium ABI emits
/// the complete and deleting destructors.
#[cfg(windows)]
pub const DESTRUCTOR_SLOTS: usize = 1;

#[cfg(not(windows))]
pub const DESTRUCTOR_SLOTS: usize = 2;

/// Slot table for one engine type
pub trait VTableLayout {
    /// Interface version the slot numbers were taken from
    const VERSION: &'static str;

    /// Number of entries in the table, when known
    const SLOT_COUNT: Option<usize> = None;
}

/// `IVEngineClient013` (no virtual destructor)
pub struct EngineClientVTable;

impl EngineClientVTable {
    pub const GET_PLAYER_INFO: VTableSlot = VTableSlot::new(8);
}

impl VTableLayout for EngineClientVTable {
    const VERSION: &'static str = versions::ENGINE_CLIENT;
}

/// `IClientEngineTools` (derives `IBaseInterface`, destructor first)
pub struct ClientEngineToolsVTable;

impl ClientEngineToolsVTable {
    pub const SETUP_ENGINE_VIEW: VTableSlot = VTableSlot::new(DESTRUCTOR_SLOTS + 8);
    pub const IS_THIRD_PERSON_CAMERA: VTableSlot = VTableSlot::new(DESTRUCTOR_SLOTS + 12);
    pub const IN_TOOL_MODE: VTableSlot = VTableSlot::new(DESTRUCTOR_SLOTS + 13);
}

impl VTableLayout for ClientEngineToolsVTable {
    const VERSION: &'static str = versions::CLIENT_ENGINE_TOOLS;
    const SLOT_COUNT: Option<usize> = Some(DESTRUCTOR_SLOTS + 14);
}

/// `IGameEventManager2` (derives `IBaseInterface`, destructor first)
pub struct GameEventManagerVTable;

impl GameEventManagerVTable {
    pub const FIRE_EVENT: VTableSlot = VTableSlot::new(DESTRUCTOR_SLOTS + 6);
    pub const FIRE_EVENT_CLIENT_SIDE: VTableSlot = VTableSlot::new(DESTRUCTOR_SLOTS + 7);
}

impl VTableLayout for GameEventManagerVTable {
    const VERSION: &'static str = versions::GAME_EVENT_MANAGER;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_byte_offset() {
        let slot = VTableSlot::new(3);
        assert_eq!(slot.byte_offset(), 3 * std::mem::size_of::<usize>());
        assert_eq!(slot.to_string(), "slot[3]");
    }

    #[test]
    fn test_tool_slots_follow_destructor() {
        assert!(ClientEngineToolsVTable::SETUP_ENGINE_VIEW.index() >= DESTRUCTOR_SLOTS);
        assert!(
            ClientEngineToolsVTable::IN_TOOL_MODE.index()
                < ClientEngineToolsVTable::SLOT_COUNT.unwrap()
        );
    }
}
