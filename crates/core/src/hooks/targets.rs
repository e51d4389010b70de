//! Built-in interception targets
//!
//! One marker type per [`HookId`], each with the signature of the engine
//! function and the recipe used to find it in an [`Environment`].

use grouphook_engine::Environment;
use grouphook_sdk::vtables::{ClientEngineToolsVTable, EngineClientVTable, GameEventManagerVTable};
use grouphook_sdk::{
    versions, C_HLTVCamera, IClientEngineTools, IGameEvent, IGameEventManager2, IVEngineClient,
    PlayerInfo, QAngle, VTableLayout, VTableSlot, Vector,
};

use super::error::HookError;
use super::registry::HookRegistry;
use super::strategy::InterceptionStrategy;
use super::target::{HookId, HookTarget, Scope};

macro_rules! builtin_target {
    (
        $(#[$meta:meta])*
        $name:ident: $sig:ty, $scope:expr, |$env:ident| $recipe:expr
    ) => {
        crate::hook_target! {
            $(#[$meta])*
            pub struct $name: $sig;
        }

        impl HookTarget for $name {
            const ID: HookId = HookId::$name;
            const SCOPE: Scope = $scope;

            fn interception($env: &Environment) -> Result<InterceptionStrategy, HookError> {
                $recipe
            }
        }
    };
}

/// Detour of the free function the locator knows under the hook's name
fn detour(env: &Environment, id: HookId) -> Result<InterceptionStrategy, HookError> {
    Ok(InterceptionStrategy::function(env.locate(id.name())?))
}

/// Private vtable copy for the interface's current instance
fn instance_method(
    env: &Environment,
    interface: &str,
    slot: VTableSlot,
    entries: Option<usize>,
) -> Result<InterceptionStrategy, HookError> {
    Ok(InterceptionStrategy::instance_method(env.instance(interface)?, slot).with_entries(entries))
}

/// Class-wide slot patch, receiver re-read through the interface accessor
fn shared_method(
    env: &Environment,
    interface: &str,
    slot: VTableSlot,
) -> Result<InterceptionStrategy, HookError> {
    // Fail early so the status reports the missing instance
    env.instance(interface)?;
    Ok(InterceptionStrategy::shared_method(env.accessor(interface)?, slot))
}

builtin_target! {
    /// `IVEngineClient::GetPlayerInfo(int ent_num, player_info_t *pinfo)`
    EngineClientGetPlayerInfo:
        extern "C" fn(*mut IVEngineClient, i32, *mut PlayerInfo) -> bool,
    Scope::PLUGIN,
    |env| instance_method(
        env,
        versions::ENGINE_CLIENT,
        EngineClientVTable::GET_PLAYER_INFO,
        EngineClientVTable::SLOT_COUNT,
    )
}

builtin_target! {
    /// `IClientEngineTools::InToolMode()`
    ClientEngineToolsInToolMode: extern "C" fn(*mut IClientEngineTools) -> bool,
    Scope::PLUGIN,
    |env| shared_method(env, versions::CLIENT_ENGINE_TOOLS, ClientEngineToolsVTable::IN_TOOL_MODE)
}

builtin_target! {
    /// `IClientEngineTools::IsThirdPersonCamera()`
    ClientEngineToolsIsThirdPersonCamera: extern "C" fn(*mut IClientEngineTools) -> bool,
    Scope::PLUGIN,
    |env| shared_method(
        env,
        versions::CLIENT_ENGINE_TOOLS,
        ClientEngineToolsVTable::IS_THIRD_PERSON_CAMERA,
    )
}

builtin_target! {
    /// `IClientEngineTools::SetupEngineView(Vector &origin, QAngle &angles, float &fov)`
    ClientEngineToolsSetupEngineView:
        extern "C" fn(*mut IClientEngineTools, *mut Vector, *mut QAngle, *mut f32) -> bool,
    Scope::PLUGIN,
    |env| shared_method(
        env,
        versions::CLIENT_ENGINE_TOOLS,
        ClientEngineToolsVTable::SETUP_ENGINE_VIEW,
    )
}

builtin_target! {
    /// `IGameEventManager2::FireEventClientSide(IGameEvent *event)`
    ///
    /// The manager is only usable while in game.
    GameEventManagerFireEventClientSide:
        extern "C" fn(*mut IGameEventManager2, *mut IGameEvent) -> bool,
    Scope::SESSION,
    |env| instance_method(
        env,
        versions::GAME_EVENT_MANAGER,
        GameEventManagerVTable::FIRE_EVENT_CLIENT_SIDE,
        GameEventManagerVTable::SLOT_COUNT,
    )
}

builtin_target! {
    /// `C_HLTVCamera::SetCameraAngle(QAngle &angle)`
    HltvCameraSetCameraAngle: extern "C" fn(*mut C_HLTVCamera, *mut QAngle),
    Scope::PLUGIN,
    |env| detour(env, HookId::HltvCameraSetCameraAngle)
}

builtin_target! {
    /// `C_HLTVCamera::SetMode(int mode)`
    HltvCameraSetMode: extern "C" fn(*mut C_HLTVCamera, i32),
    Scope::PLUGIN,
    |env| detour(env, HookId::HltvCameraSetMode)
}

builtin_target! {
    /// `C_HLTVCamera::SetPrimaryTarget(int entity)`
    HltvCameraSetPrimaryTarget: extern "C" fn(*mut C_HLTVCamera, i32),
    Scope::PLUGIN,
    |env| detour(env, HookId::HltvCameraSetPrimaryTarget)
}

builtin_target! {
    /// Global `GetLocalPlayerIndex()`
    GetLocalPlayerIndex: extern "C" fn() -> i32,
    Scope::PLUGIN,
    |env| detour(env, HookId::GetLocalPlayerIndex)
}

/// Register every built-in target with `registry`
pub(crate) fn register_builtin(registry: &HookRegistry) {
    registry.register::<EngineClientGetPlayerInfo>();
    registry.register::<ClientEngineToolsInToolMode>();
    registry.register::<ClientEngineToolsIsThirdPersonCamera>();
    registry.register::<ClientEngineToolsSetupEngineView>();
    registry.register::<GameEventManagerFireEventClientSide>();
    registry.register::<HltvCameraSetCameraAngle>();
    registry.register::<HltvCameraSetMode>();
    registry.register::<HltvCameraSetPrimaryTarget>();
    registry.register::<GetLocalPlayerIndex>();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::primitive::PrimitiveKind;
    use grouphook_engine::{AddressTable, EnvironmentError};
    use std::ffi::c_void;
    use std::sync::Arc;

    fn empty_env() -> Environment {
        Environment::builder(Arc::new(AddressTable::new())).build()
    }

    #[test]
    fn test_missing_targets_are_unresolved() {
        let env = empty_env();

        assert!(matches!(
            EngineClientGetPlayerInfo::interception(&env),
            Err(HookError::TargetUnresolved(EnvironmentError::InterfaceUnavailable(_)))
        ));
        assert!(matches!(
            ClientEngineToolsInToolMode::interception(&env),
            Err(HookError::TargetUnresolved(_))
        ));
        assert!(matches!(
            HltvCameraSetMode::interception(&env),
            Err(HookError::TargetUnresolved(EnvironmentError::TargetNotFound(_)))
        ));
    }

    #[test]
    fn test_recipes_pick_strategy_kind() {
        let mut object = [0usize; 2];
        let env = Environment::builder(Arc::new(
            AddressTable::new().with(HookId::GetLocalPlayerIndex.name(), 0x1000 as *const ()),
        ))
        .with_interface(versions::ENGINE_CLIENT, object.as_mut_ptr() as *mut c_void)
        .with_interface(versions::CLIENT_ENGINE_TOOLS, object.as_mut_ptr() as *mut c_void)
        .build();

        let kind = |s: Result<InterceptionStrategy, HookError>| s.unwrap().kind();

        assert_eq!(
            kind(EngineClientGetPlayerInfo::interception(&env)),
            PrimitiveKind::InstanceVTableSwap
        );
        assert_eq!(
            kind(ClientEngineToolsSetupEngineView::interception(&env)),
            PrimitiveKind::GlobalVTableSwap
        );
        assert_eq!(
            kind(GetLocalPlayerIndex::interception(&env)),
            PrimitiveKind::FunctionDetour
        );
    }

    #[test]
    fn test_scopes() {
        assert_eq!(GameEventManagerFireEventClientSide::SCOPE, Scope::SESSION);
        assert_eq!(HltvCameraSetCameraAngle::SCOPE, Scope::PLUGIN);
        assert_eq!(
            <GetLocalPlayerIndex as HookTarget>::ID,
            HookId::GetLocalPlayerIndex
        );
    }
}
