//! Interface version strings
//!
//! These strings must match exactly what the engine exports.
//! The vtable layouts in [`crate::vtables`] were taken from these versions.

/// Client engine interface
pub const ENGINE_CLIENT: &str = "VEngineClient013";

/// Client engine tools (tool framework view overrides)
pub const CLIENT_ENGINE_TOOLS: &str = "VCLIENTENGINETOOLS001";

/// Game event manager (legacy S1-style events)
pub const GAME_EVENT_MANAGER: &str = "GAMEEVENTSMANAGER002";

/// Spectator camera singleton, resolved by the embedding plugin
pub const HLTV_CAMERA: &str = "C_HLTVCamera";

/// Collected interface versions for iteration
pub const INTERFACE_VERSIONS: &[(&str, &str)] = &[
    ("EngineClient", ENGINE_CLIENT),
    ("ClientEngineTools", CLIENT_ENGINE_TOOLS),
    ("GameEventManager", GAME_EVENT_MANAGER),
    ("HLTVCamera", HLTV_CAMERA),
];
