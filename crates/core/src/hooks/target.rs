//! Interception target identifiers and attach recipes

use bitflags::bitflags;
use grouphook_engine::Environment;
use grouphook_sdk::Dispatch;

use super::error::HookError;
use super::landing::StaticTarget;
use super::strategy::InterceptionStrategy;

/// Stable identifier of every known interception target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HookId {
    EngineClientGetPlayerInfo,
    ClientEngineToolsInToolMode,
    ClientEngineToolsIsThirdPersonCamera,
    ClientEngineToolsSetupEngineView,
    GameEventManagerFireEventClientSide,
    HltvCameraSetCameraAngle,
    HltvCameraSetMode,
    HltvCameraSetPrimaryTarget,
    GetLocalPlayerIndex,
}

impl HookId {
    pub const ALL: [HookId; 9] = [
        HookId::EngineClientGetPlayerInfo,
        HookId::ClientEngineToolsInToolMode,
        HookId::ClientEngineToolsIsThirdPersonCamera,
        HookId::ClientEngineToolsSetupEngineView,
        HookId::GameEventManagerFireEventClientSide,
        HookId::HltvCameraSetCameraAngle,
        HookId::HltvCameraSetMode,
        HookId::HltvCameraSetPrimaryTarget,
        HookId::GetLocalPlayerIndex,
    ];

    /// Stable name, also the locator name of function targets
    pub const fn name(self) -> &'static str {
        match self {
            HookId::EngineClientGetPlayerInfo => "IVEngineClient::GetPlayerInfo",
            HookId::ClientEngineToolsInToolMode => "IClientEngineTools::InToolMode",
            HookId::ClientEngineToolsIsThirdPersonCamera => {
                "IClientEngineTools::IsThirdPersonCamera"
            }
            HookId::ClientEngineToolsSetupEngineView => "IClientEngineTools::SetupEngineView",
            HookId::GameEventManagerFireEventClientSide => {
                "IGameEventManager2::FireEventClientSide"
            }
            HookId::HltvCameraSetCameraAngle => "C_HLTVCamera::SetCameraAngle",
            HookId::HltvCameraSetMode => "C_HLTVCamera::SetMode",
            HookId::HltvCameraSetPrimaryTarget => "C_HLTVCamera::SetPrimaryTarget",
            HookId::GetLocalPlayerIndex => "GetLocalPlayerIndex",
        }
    }

    pub fn from_name(name: &str) -> Option<HookId> {
        HookId::ALL.into_iter().find(|id| id.name() == name)
    }
}

impl std::fmt::Display for HookId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

bitflags! {
    /// When a target's environment exists
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Scope: u8 {
        /// Attached when the registry loads, for the plugin's lifetime
        const PLUGIN = 1 << 0;
        /// Attached on session start, detached on session end
        const SESSION = 1 << 1;
    }
}

/// Registry recipe for one interception target
pub trait HookTarget: StaticTarget + Dispatch<<Self as StaticTarget>::Signature> {
    const ID: HookId;

    const SCOPE: Scope;

    /// Resolve the target in `env` and pick its primitive
    ///
    /// Fails with `TargetUnresolved` when the locator or the owning
    /// interface cannot provide it.
    fn interception(env: &Environment) -> Result<InterceptionStrategy, HookError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for id in HookId::ALL {
            assert_eq!(HookId::from_name(id.name()), Some(id));
        }
        assert_eq!(HookId::from_name("C_HLTVCamera::SetFov"), None);
    }

    #[test]
    fn test_names_are_unique() {
        let mut names: Vec<_> = HookId::ALL.iter().map(|id| id.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), HookId::ALL.len());
    }

    #[test]
    fn test_scope_flags() {
        let all = Scope::PLUGIN | Scope::SESSION;
        assert!(all.contains(Scope::SESSION));
        assert!(!Scope::PLUGIN.intersects(Scope::SESSION));
        assert_eq!(Scope::all(), all);
    }
}
