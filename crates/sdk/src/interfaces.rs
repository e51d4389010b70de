//! Engine interface type definitions
//!
//! These are opaque types representing C++ engine interfaces.
//! We don't need their internal structure - just pointers.
//! The actual vtables are patched through raw pointer arithmetic.

/// Opaque type for IVEngineClient
/// Client-side engine interface (player info, local player, console commands)
#[repr(C)]
pub struct IVEngineClient {
    _opaque: [u8; 0],
}

/// Opaque type for IClientEngineTools
/// Hooks the tool framework uses to override the engine view
#[repr(C)]
pub struct IClientEngineTools {
    _opaque: [u8; 0],
}

/// Opaque type for IGameEventManager2
/// Legacy game event system (player_death, round_start, ...)
#[repr(C)]
pub struct IGameEventManager2 {
    _opaque: [u8; 0],
}

/// Opaque type for IGameEvent
/// Represents a single game event instance with key-value data
#[repr(C)]
pub struct IGameEvent {
    _opaque: [u8; 0],
}

/// Opaque type for C_HLTVCamera
/// The spectator camera singleton (not exposed through an interface factory)
#[repr(C)]
#[allow(non_camel_case_types)]
pub struct C_HLTVCamera {
    _opaque: [u8; 0],
}

/// Three component float vector
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vector {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Euler angles in degrees
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct QAngle {
    pub pitch: f32,
    pub yaw: f32,
    pub roll: f32,
}

/// Maximum player name length including the terminator
pub const MAX_PLAYER_NAME_LENGTH: usize = 32;

/// Length of the GUID string including the terminator
pub const SIGNED_GUID_LEN: usize = 33;

/// Player information filled in by `IVEngineClient::GetPlayerInfo`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct PlayerInfo {
    pub name: [u8; MAX_PLAYER_NAME_LENGTH],
    pub user_id: i32,
    pub guid: [u8; SIGNED_GUID_LEN],
    pub friends_id: u32,
    pub friends_name: [u8; MAX_PLAYER_NAME_LENGTH],
    pub fake_player: bool,
    pub is_hltv: bool,
    pub custom_files: [u32; 4],
    pub files_downloaded: u8,
}

impl Default for PlayerInfo {
    fn default() -> Self {
        Self {
            name: [0; MAX_PLAYER_NAME_LENGTH],
            user_id: 0,
            guid: [0; SIGNED_GUID_LEN],
            friends_id: 0,
            friends_name: [0; MAX_PLAYER_NAME_LENGTH],
            fake_player: false,
            is_hltv: false,
            custom_files: [0; 4],
            files_downloaded: 0,
        }
    }
}

impl PlayerInfo {
    /// Player name up to the first NUL byte
    pub fn name_bytes(&self) -> &[u8] {
        let end = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.name.len());
        &self.name[..end]
    }

    /// Overwrite the player name, truncating so the terminator always fits
    pub fn set_name(&mut self, name: &[u8]) {
        let len = name.len().min(MAX_PLAYER_NAME_LENGTH - 1);
        self.name = [0; MAX_PLAYER_NAME_LENGTH];
        self.name[..len].copy_from_slice(&name[..len]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_name_truncates() {
        let mut info = PlayerInfo::default();
        info.set_name(&[b'a'; 40]);

        assert_eq!(info.name_bytes().len(), MAX_PLAYER_NAME_LENGTH - 1);
        assert_eq!(info.name[MAX_PLAYER_NAME_LENGTH - 1], 0);
    }

    #[test]
    fn test_player_name_round_trip() {
        let mut info = PlayerInfo::default();
        info.set_name(b"caster");
        assert_eq!(info.name_bytes(), b"caster");
    }
}
