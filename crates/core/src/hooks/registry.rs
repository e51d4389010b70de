//! Hook registry
//!
//! One table entry per [`HookId`]. Listeners register against an id at any
//! time, whether or not the target can currently be found; the entry keeps
//! them in registration order and replays them onto a fresh [`HookPoint`]
//! every time the target's environment becomes available.
//!
//! # Lifecycle
//!
//! - [`HookRegistry::load`] attaches every [`Scope::PLUGIN`] target
//! - [`HookRegistry::bind_session`] attaches [`Scope::SESSION`] targets when
//!   a session starts and detaches them when it ends
//! - [`HookRegistry::unload`] detaches everything
//!
//! Construct the registry before any feature module and unload it after the
//! modules released their listeners. Detaching uninstalls the primitive but
//! keeps the listeners, and registry listener ids stay valid across
//! detach/attach cycles.

use std::any::Any;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use grouphook_engine::{Environment, SessionEvent, SessionSignal, SubscriptionKey};
use grouphook_sdk::{Function, Method};
use parking_lot::{Mutex, RwLock};

use super::decision::Decision;
use super::error::HookError;
use super::point::{BoundOriginal, HookPoint, ListenerFn, ListenerId};
use super::primitive::PrimitiveKind;
use super::strategy::InterceptionStrategy;
use super::target::{HookId, HookTarget, Scope};
use super::targets;
use crate::config::HookConfig;

const SLOT_TAKEN: &str = "entry point already serving another registry";

/// Attach state of one registry entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookStatus {
    /// No environment for the target yet, or it went away
    Detached,
    /// A hook point exists for the current environment
    Attached,
    /// The target could not be found or installed
    Unresolved(String),
    /// Listed in the config's disabled hooks
    Disabled,
}

impl std::fmt::Display for HookStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HookStatus::Detached => f.write_str("detached"),
            HookStatus::Attached => f.write_str("attached"),
            HookStatus::Unresolved(reason) => write!(f, "unresolved ({})", reason),
            HookStatus::Disabled => f.write_str("disabled"),
        }
    }
}

/// One line of [`HookRegistry::summary`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookSummary {
    pub id: HookId,
    pub kind: Option<PrimitiveKind>,
    pub status: HookStatus,
    pub installed: bool,
    pub listeners: usize,
}

/// Type-erased view of a [`TargetEntry`]
trait ErasedEntry: Send + Sync {
    fn id(&self) -> HookId;
    fn scope(&self) -> Scope;
    fn attach(&self, env: &Environment, config: &HookConfig);
    fn detach(&self);
    fn summary(&self) -> HookSummary;
    fn remove_listener(&self, id: ListenerId) -> bool;
    fn set_decision(&self, decision: Decision) -> Result<(), HookError>;
    fn set_enabled(&self, enabled: bool) -> Result<(), HookError>;
    fn as_any(&self) -> &dyn Any;
}

struct Registration<F: Function> {
    id: ListenerId,
    callback: ListenerFn<F>,
    /// Id on the current hook point, while attached
    inner: Option<ListenerId>,
}

struct EntryState<F: Function> {
    status: HookStatus,
    kind: Option<PrimitiveKind>,
    point: Option<Arc<HookPoint<F>>>,
    listeners: Vec<Registration<F>>,
    /// Install on first use instead of on attach
    lazy: bool,
}

/// Registry entry for one target
struct TargetEntry<H: HookTarget> {
    state: Mutex<EntryState<H::Signature>>,
    next_listener: AtomicU64,
    _target: PhantomData<fn() -> H>,
}

impl<H: HookTarget> TargetEntry<H> {
    fn new() -> Self {
        Self {
            state: Mutex::new(EntryState {
                status: HookStatus::Detached,
                kind: None,
                point: None,
                listeners: Vec::new(),
                lazy: false,
            }),
            next_listener: AtomicU64::new(1),
            _target: PhantomData,
        }
    }

    fn add_listener(&self, callback: ListenerFn<H::Signature>) -> ListenerId {
        let id = ListenerId::new(self.next_listener.fetch_add(1, Ordering::Relaxed));

        let lazy_point = {
            let mut state = self.state.lock();
            let inner = state
                .point
                .as_ref()
                .map(|point| point.add_shared_listener(callback.clone()));
            state.listeners.push(Registration {
                id,
                callback,
                inner,
            });

            tracing::debug!(
                "Registered listener {} on '{}' ({})",
                id,
                H::ID,
                state.status
            );

            if state.lazy {
                state.point.clone()
            } else {
                None
            }
        };

        if let Some(point) = lazy_point {
            self.install(&point);
        }

        id
    }

    /// Current hook point, or why there is none
    fn point(&self) -> Result<Arc<HookPoint<H::Signature>>, HookError> {
        let state = self.state.lock();
        match (&state.point, &state.status) {
            (Some(point), _) => Ok(point.clone()),
            (None, HookStatus::Disabled) => Err(HookError::DisabledByConfig(H::ID.to_string())),
            (None, HookStatus::Unresolved(reason)) => {
                Err(HookError::NotAttached(format!("{}: {}", H::ID, reason)))
            }
            (None, _) => Err(HookError::NotAttached(H::ID.to_string())),
        }
    }

    /// Install `point`, dropping it again if that fails
    fn install(&self, point: &Arc<HookPoint<H::Signature>>) {
        let error = match point.install() {
            Ok(()) | Err(HookError::InstallInProgress(_)) => return,
            Err(e) => e,
        };

        tracing::warn!("Hook '{}' could not be installed: {}", H::ID, error);

        let mut state = self.state.lock();
        if state
            .point
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, point))
        {
            H::slot().retract_if(point);
            state.point = None;
            for registration in state.listeners.iter_mut() {
                registration.inner = None;
            }
            state.status = HookStatus::Unresolved(error.to_string());
        }
    }
}

impl<H: HookTarget> ErasedEntry for TargetEntry<H> {
    fn id(&self) -> HookId {
        H::ID
    }

    fn scope(&self) -> Scope {
        H::SCOPE
    }

    fn attach(&self, env: &Environment, config: &HookConfig) {
        let name = H::ID.name();

        let point = {
            let mut state = self.state.lock();

            if state.point.is_some() {
                tracing::debug!("Hook '{}' is already attached", name);
                return;
            }

            if config.is_disabled(name) {
                tracing::info!("Hook '{}' disabled by config", name);
                state.status = HookStatus::Disabled;
                return;
            }

            let strategy = match H::interception(env) {
                Ok(strategy) => strategy,
                Err(e) => {
                    tracing::warn!("Hook '{}' unresolved: {}", name, e);
                    state.status = HookStatus::Unresolved(e.to_string());
                    return;
                }
            };

            let dispatcher = <H::Signature as Function>::dispatcher::<H>();
            let point = Arc::new(HookPoint::new(name, dispatcher, strategy));

            // The entry point lands in one hook point per process
            if !H::slot().try_publish(point.clone()) {
                tracing::warn!("Hook '{}' is already served by another registry", name);
                state.status = HookStatus::Unresolved(SLOT_TAKEN.to_string());
                return;
            }

            // Replay in registration order
            for registration in state.listeners.iter_mut() {
                registration.inner = Some(point.add_shared_listener(registration.callback.clone()));
            }

            state.kind = Some(point.kind());
            state.point = Some(point.clone());
            state.status = HookStatus::Attached;
            state.lazy = !config.install_on_attach;

            tracing::info!(
                "Attached hook '{}' ({}) with {} listener(s)",
                name,
                point.kind(),
                state.listeners.len()
            );

            point
        };

        if config.install_on_attach {
            self.install(&point);
        }
    }

    fn detach(&self) {
        let (point, owned) = {
            let mut state = self.state.lock();
            state.status = HookStatus::Detached;
            state.lazy = false;

            let Some(point) = state.point.take() else {
                return;
            };

            let owned = H::slot().retract_if(&point);
            for registration in state.listeners.iter_mut() {
                registration.inner = None;
            }
            (point, owned)
        };

        match point.uninstall() {
            Ok(()) => {
                // A restored detour frees its trampoline, so late landings
                // go to the real entry instead
                if let (true, InterceptionStrategy::Function { target }) =
                    (owned, point.strategy())
                {
                    H::slot().remember_original(unsafe {
                        <H::Signature as Function>::from_ptr(target.as_ptr() as *const ())
                    });
                }
            }
            Err(e) => tracing::warn!("Failed to uninstall hook '{}': {}", H::ID, e),
        }
        tracing::info!("Detached hook '{}'", H::ID);
    }

    fn summary(&self) -> HookSummary {
        let state = self.state.lock();
        HookSummary {
            id: H::ID,
            kind: state.kind,
            status: state.status.clone(),
            installed: state
                .point
                .as_ref()
                .map(|point| point.is_installed())
                .unwrap_or(false),
            listeners: state.listeners.len(),
        }
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        let mut state = self.state.lock();
        let Some(position) = state.listeners.iter().position(|r| r.id == id) else {
            return false;
        };

        let registration = state.listeners.remove(position);
        if let (Some(inner), Some(point)) = (registration.inner, &state.point) {
            point.remove_listener(inner);
        }

        tracing::debug!("Unregistered listener {} from '{}'", id, H::ID);
        true
    }

    fn set_decision(&self, decision: Decision) -> Result<(), HookError> {
        match self.point() {
            Ok(point) => point.set_decision(decision),
            Err(_) => Err(HookError::DecisionOutsideDispatch(H::ID.to_string())),
        }
    }

    fn set_enabled(&self, enabled: bool) -> Result<(), HookError> {
        let point = self.point()?;
        point.set_enabled(enabled)?;
        tracing::info!(
            "{} hook '{}'",
            if enabled { "Enabled" } else { "Disabled" },
            H::ID
        );
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Default)]
struct Environments {
    plugin: Option<Arc<Environment>>,
    session: Option<Arc<Environment>>,
}

/// Table of every interception target
pub struct HookRegistry {
    entries: DashMap<HookId, Arc<dyn ErasedEntry>>,
    config: RwLock<HookConfig>,
    environments: RwLock<Environments>,
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HookRegistry {
    /// Registry with every built-in target
    pub fn new() -> Self {
        let registry = Self::empty();
        targets::register_builtin(&registry);
        registry
    }

    /// Registry without any target
    pub fn empty() -> Self {
        Self {
            entries: DashMap::new(),
            config: RwLock::new(HookConfig::default()),
            environments: RwLock::new(Environments::default()),
        }
    }

    /// Add a target to the table
    ///
    /// If the target's environment is already up it is attached right away.
    ///
    /// # Returns
    /// `false` if the id is already registered with another recipe
    pub fn register<H: HookTarget>(&self) -> bool {
        let entry: Arc<dyn ErasedEntry> = match self.entries.entry(H::ID) {
            MapEntry::Occupied(existing) => {
                let same = existing.get().as_any().is::<TargetEntry<H>>();
                if !same {
                    tracing::warn!("Hook '{}' is already registered with another recipe", H::ID);
                }
                return same;
            }
            MapEntry::Vacant(vacant) => {
                let entry: Arc<dyn ErasedEntry> = Arc::new(TargetEntry::<H>::new());
                vacant.insert(entry.clone());
                entry
            }
        };

        if let Some(env) = self.environment_for(H::SCOPE) {
            let config = self.config.read().clone();
            entry.attach(&env, &config);
        }
        true
    }

    /// Store the config and attach every plugin-scoped target
    #[tracing::instrument(skip_all)]
    pub fn load(&self, env: Arc<Environment>, config: HookConfig) {
        *self.config.write() = config.clone();
        self.environments.write().plugin = Some(env.clone());

        tracing::info!("Loading hooks");
        self.attach_scope(Scope::PLUGIN, &env, &config);
    }

    /// Follow a session signal: attach session targets on start, detach
    /// them on end
    ///
    /// The subscription only holds a weak reference to the registry.
    pub fn bind_session(self: &Arc<Self>, signal: &SessionSignal) -> SubscriptionKey {
        let registry: Weak<Self> = Arc::downgrade(self);
        signal.subscribe(move |event| {
            let Some(registry) = registry.upgrade() else {
                return;
            };
            match event {
                SessionEvent::Started(env) => registry.session_started(env.clone()),
                SessionEvent::Ended => registry.session_ended(),
            }
        })
    }

    /// Attach every session-scoped target against `env`
    #[tracing::instrument(skip_all)]
    pub fn session_started(&self, env: Arc<Environment>) {
        self.environments.write().session = Some(env.clone());
        let config = self.config.read().clone();
        self.attach_scope(Scope::SESSION, &env, &config);
    }

    /// Detach every session-scoped target, keeping their listeners
    #[tracing::instrument(skip_all)]
    pub fn session_ended(&self) {
        self.environments.write().session = None;
        self.detach_scope(Scope::SESSION);
    }

    /// Detach every target
    #[tracing::instrument(skip_all)]
    pub fn unload(&self) {
        *self.environments.write() = Environments::default();
        self.detach_scope(Scope::all());
        tracing::info!("Hooks unloaded");
    }

    /// Register a listener on a target
    ///
    /// Works whether or not the target is attached; the listener joins every
    /// hook point the target gets from now on.
    pub fn add_listener<H, C>(&self, callback: C) -> Result<ListenerId, HookError>
    where
        H: HookTarget,
        C: Fn(&mut <H::Signature as Function>::Args) -> <H::Signature as Function>::Output
            + Send
            + Sync
            + 'static,
    {
        self.add_shared_listener::<H>(Arc::new(callback))
    }

    /// Register an already shared listener callback
    pub fn add_shared_listener<H: HookTarget>(
        &self,
        callback: ListenerFn<H::Signature>,
    ) -> Result<ListenerId, HookError> {
        if !self.entries.contains_key(&H::ID) {
            self.register::<H>();
        }
        self.with_entry::<H, _>(|entry| entry.add_listener(callback))
    }

    /// Unregister a listener
    ///
    /// # Returns
    /// `false` if the target or the listener is unknown
    pub fn remove_listener(&self, id: HookId, listener: ListenerId) -> bool {
        self.entry(id)
            .map(|entry| entry.remove_listener(listener))
            .unwrap_or(false)
    }

    /// Original entry point of an attached target
    ///
    /// Installs a lazily installed primitive first.
    pub fn original<H: HookTarget>(&self) -> Result<H::Signature, HookError> {
        self.hook_point::<H>()?.original()
    }

    /// Original of a shared method target, called on whichever instance is
    /// current at call time
    pub fn bound_original<H>(&self) -> Result<BoundOriginal<H::Signature>, HookError>
    where
        H: HookTarget,
        H::Signature: Method,
    {
        self.hook_point::<H>()?.bound_original()
    }

    /// Current hook point of a target
    pub fn hook_point<H: HookTarget>(&self) -> Result<Arc<HookPoint<H::Signature>>, HookError> {
        self.with_entry::<H, _>(|entry| entry.point())?
    }

    /// Set the decision of the running dispatch of `id`
    ///
    /// Only valid from inside one of its listeners.
    pub fn set_decision(&self, id: HookId, decision: Decision) -> Result<(), HookError> {
        self.entry(id)
            .ok_or_else(|| HookError::UnknownTarget(id.to_string()))?
            .set_decision(decision)
    }

    /// Toggle an attached target's primitive, keeping its listeners
    pub fn set_enabled(&self, id: HookId, enabled: bool) -> Result<(), HookError> {
        self.entry(id)
            .ok_or_else(|| HookError::UnknownTarget(id.to_string()))?
            .set_enabled(enabled)
    }

    /// Whether a target is attached, for module dependency checks
    pub fn is_available(&self, id: HookId) -> bool {
        self.status(id) == Some(HookStatus::Attached)
    }

    pub fn status(&self, id: HookId) -> Option<HookStatus> {
        self.entry(id).map(|entry| entry.summary().status)
    }

    /// State of every registered target, ordered by id
    pub fn summary(&self) -> Vec<HookSummary> {
        self.sorted_entries()
            .iter()
            .map(|entry| entry.summary())
            .collect()
    }

    /// Currently loaded config
    pub fn config(&self) -> HookConfig {
        self.config.read().clone()
    }

    fn entry(&self, id: HookId) -> Option<Arc<dyn ErasedEntry>> {
        self.entries.get(&id).map(|entry| entry.value().clone())
    }

    fn with_entry<H: HookTarget, R>(
        &self,
        f: impl FnOnce(&TargetEntry<H>) -> R,
    ) -> Result<R, HookError> {
        let entry = self
            .entry(H::ID)
            .ok_or_else(|| HookError::UnknownTarget(H::ID.to_string()))?;

        let typed = entry
            .as_any()
            .downcast_ref::<TargetEntry<H>>()
            .ok_or_else(|| {
                HookError::UnknownTarget(format!("{} is registered with another recipe", H::ID))
            })?;

        Ok(f(typed))
    }

    fn sorted_entries(&self) -> Vec<Arc<dyn ErasedEntry>> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        entries.sort_by_key(|entry| entry.id());
        entries
    }

    fn environment_for(&self, scope: Scope) -> Option<Arc<Environment>> {
        let environments = self.environments.read();
        if scope.contains(Scope::SESSION) {
            environments.session.clone()
        } else {
            environments.plugin.clone()
        }
    }

    fn attach_scope(&self, scope: Scope, env: &Environment, config: &HookConfig) {
        let entries: Vec<_> = self
            .sorted_entries()
            .into_iter()
            .filter(|entry| entry.scope().intersects(scope))
            .collect();

        for entry in &entries {
            entry.attach(env, config);
        }

        let attached = entries
            .iter()
            .filter(|entry| entry.summary().status == HookStatus::Attached)
            .count();
        tracing::info!("Attached {}/{} {:?} hook(s)", attached, entries.len(), scope);
    }

    fn detach_scope(&self, scope: Scope) {
        for entry in self.sorted_entries() {
            if entry.scope().intersects(scope) {
                entry.detach();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::landing::StaticTarget;
    use crate::hooks::point::tests::mock_strategy;
    use crate::hooks::vtable::tests::{
        call_slot, get_double, get_value, FakeClass, FakeObject, GetValue,
    };
    use grouphook_engine::{AddressTable, EnvironmentError};
    use grouphook_sdk::VTableSlot;
    use std::ffi::c_void;
    use std::ptr::NonNull;
    use std::sync::atomic::AtomicUsize;
    use std::sync::OnceLock;

    const OBJECT: &str = "FakeObject001";

    fn env_with_object(object: &mut FakeObject) -> Arc<Environment> {
        Arc::new(
            Environment::builder(Arc::new(AddressTable::new()))
                .with_interface(OBJECT, object as *mut FakeObject as *mut c_void)
                .build(),
        )
    }

    fn empty_env() -> Arc<Environment> {
        Arc::new(Environment::builder(Arc::new(AddressTable::new())).build())
    }

    // Each test gets its own marker types so static landing slots are never
    // shared between concurrently running tests

    crate::hook_target! {
        struct PluginValue: extern "C" fn(*mut FakeObject) -> i32;
    }

    impl HookTarget for PluginValue {
        const ID: HookId = HookId::EngineClientGetPlayerInfo;
        const SCOPE: Scope = Scope::PLUGIN;

        fn interception(env: &Environment) -> Result<InterceptionStrategy, HookError> {
            Ok(InterceptionStrategy::instance_method(
                env.instance(OBJECT)?,
                VTableSlot::new(1),
            ))
        }
    }

    #[test]
    fn test_plugin_target_end_to_end() {
        let class = FakeClass::new(&[
            get_value as GetValue as *const (),
            get_double as GetValue as *const (),
        ]);
        let mut object = class.instantiate(21);

        let registry = HookRegistry::empty();
        assert!(registry.register::<PluginValue>());
        assert_eq!(registry.status(PluginValue::ID), Some(HookStatus::Detached));

        let seen = Arc::new(AtomicUsize::new(0));
        let s = seen.clone();
        let id = registry
            .add_listener::<PluginValue, _>(move |args: &mut (*mut FakeObject,)| {
                s.store(unsafe { (*args.0).value } as usize, Ordering::SeqCst);
                0
            })
            .unwrap();

        registry.load(env_with_object(&mut object), HookConfig::default());
        assert!(registry.is_available(PluginValue::ID));

        assert_eq!(call_slot(&mut object, 1), 42);
        assert_eq!(seen.load(Ordering::SeqCst), 21);

        let original = registry.original::<PluginValue>().unwrap();
        assert_eq!(original(&mut *object), 42);

        assert!(registry.remove_listener(PluginValue::ID, id));
        assert!(!registry.remove_listener(PluginValue::ID, id));

        registry.unload();
        assert_eq!(registry.status(PluginValue::ID), Some(HookStatus::Detached));
        assert_eq!(object.vtable, class.entries() as *const *const ());
    }

    crate::hook_target! {
        struct SessionValue: extern "C" fn(*mut FakeObject) -> i32;
    }

    impl HookTarget for SessionValue {
        const ID: HookId = HookId::GameEventManagerFireEventClientSide;
        const SCOPE: Scope = Scope::SESSION;

        fn interception(env: &Environment) -> Result<InterceptionStrategy, HookError> {
            Ok(InterceptionStrategy::instance_method(
                env.instance(OBJECT)?,
                VTableSlot::new(0),
            ))
        }
    }

    #[test]
    fn test_listener_registered_before_session_start() {
        let class = FakeClass::new(&[get_value as GetValue as *const ()]);
        let mut object = class.instantiate(5);

        let registry = Arc::new(HookRegistry::empty());
        registry.register::<SessionValue>();

        let signal = SessionSignal::new();
        registry.bind_session(&signal);

        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let weak = Arc::downgrade(&registry);
        let id = registry
            .add_listener::<SessionValue, _>(move |_: &mut (*mut FakeObject,)| {
                h.fetch_add(1, Ordering::SeqCst);
                if let Some(registry) = weak.upgrade() {
                    registry
                        .set_decision(SessionValue::ID, Decision::Supercede)
                        .unwrap();
                }
                99
            })
            .unwrap();

        // Loading the plugin scope leaves session targets alone
        registry.load(empty_env(), HookConfig::default());
        assert!(!registry.is_available(SessionValue::ID));
        assert_eq!(call_slot(&mut object, 0), 5);

        signal.start(env_with_object(&mut object)).unwrap();
        assert!(registry.is_available(SessionValue::ID));
        assert_eq!(call_slot(&mut object, 0), 99);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        let point = registry.hook_point::<SessionValue>().unwrap();
        assert_eq!(point.state(), crate::hooks::InstallState::Installed);
        assert_eq!(point.listener_count(), 1);
        drop(point);

        // Session end restores the object but keeps the listener
        signal.end();
        assert_eq!(registry.status(SessionValue::ID), Some(HookStatus::Detached));
        assert_eq!(call_slot(&mut object, 0), 5);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        // Next session replays it onto a new hook point
        signal.start(env_with_object(&mut object)).unwrap();
        assert_eq!(call_slot(&mut object, 0), 99);
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        assert!(registry.remove_listener(SessionValue::ID, id));
        assert_eq!(call_slot(&mut object, 0), 5);
        assert!(matches!(
            registry.set_decision(SessionValue::ID, Decision::Supercede),
            Err(HookError::DecisionOutsideDispatch(_))
        ));

        registry.unload();
    }

    crate::hook_target! {
        struct CountedInstall: extern "C" fn(*mut FakeObject) -> i32;
    }

    fn counted_installs() -> Arc<AtomicUsize> {
        static INSTALLS: OnceLock<Arc<AtomicUsize>> = OnceLock::new();
        INSTALLS.get_or_init(|| Arc::new(AtomicUsize::new(0))).clone()
    }

    impl HookTarget for CountedInstall {
        const ID: HookId = HookId::HltvCameraSetMode;
        const SCOPE: Scope = Scope::SESSION;

        fn interception(_env: &Environment) -> Result<InterceptionStrategy, HookError> {
            Ok(mock_strategy(get_value as GetValue as *const (), counted_installs()))
        }
    }

    #[test]
    fn test_readiness_signal_installs_once() {
        let registry = Arc::new(HookRegistry::empty());
        registry.register::<CountedInstall>();

        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        registry
            .add_listener::<CountedInstall, _>(move |_: &mut (*mut FakeObject,)| {
                h.fetch_add(1, Ordering::SeqCst);
                0
            })
            .unwrap();
        assert_eq!(counted_installs().load(Ordering::SeqCst), 0);

        let signal = SessionSignal::new();
        registry.bind_session(&signal);
        signal.start(empty_env()).unwrap();
        assert_eq!(counted_installs().load(Ordering::SeqCst), 1);

        // Re-announcing the environment keeps the existing hook point
        registry.session_started(empty_env());
        registry.original::<CountedInstall>().unwrap();
        assert_eq!(counted_installs().load(Ordering::SeqCst), 1);

        let point = registry.hook_point::<CountedInstall>().unwrap();
        assert_eq!(point.kind(), PrimitiveKind::Custom);
        drop(point);

        // The generated entry point lands in the published hook point
        let mut object = FakeObject {
            vtable: std::ptr::null(),
            value: 8,
        };
        let entry = <GetValue as Function>::dispatcher::<CountedInstall>();
        assert_eq!(entry(&mut object), 8);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        let summary = registry.summary();
        assert_eq!(summary.len(), 1);
        assert!(summary[0].installed);
        assert_eq!(summary[0].listeners, 1);

        signal.end();
        assert!(!registry.summary()[0].installed);
        assert_eq!(registry.summary()[0].listeners, 1);
    }

    crate::hook_target! {
        struct Unresolvable: extern "C" fn() -> i32;
    }

    impl HookTarget for Unresolvable {
        const ID: HookId = HookId::GetLocalPlayerIndex;
        const SCOPE: Scope = Scope::PLUGIN;

        fn interception(env: &Environment) -> Result<InterceptionStrategy, HookError> {
            Ok(InterceptionStrategy::function(env.locate(Self::ID.name())?))
        }
    }

    #[test]
    fn test_unresolved_target_is_recoverable() {
        let registry = HookRegistry::empty();
        registry.register::<Unresolvable>();
        registry.load(empty_env(), HookConfig::default());

        assert!(matches!(
            registry.status(Unresolvable::ID),
            Some(HookStatus::Unresolved(_))
        ));
        assert!(!registry.is_available(Unresolvable::ID));
        assert!(matches!(
            registry.original::<Unresolvable>(),
            Err(HookError::NotAttached(_))
        ));

        // Listeners still register and wait for a later attach
        let id = registry.add_listener::<Unresolvable, _>(|_: &mut ()| 0).unwrap();
        assert_eq!(registry.summary()[0].listeners, 1);
        assert!(registry.remove_listener(Unresolvable::ID, id));
    }

    crate::hook_target! {
        struct Configured: extern "C" fn(*mut FakeObject) -> i32;
    }

    impl HookTarget for Configured {
        const ID: HookId = HookId::HltvCameraSetPrimaryTarget;
        const SCOPE: Scope = Scope::PLUGIN;

        fn interception(env: &Environment) -> Result<InterceptionStrategy, HookError> {
            Ok(InterceptionStrategy::instance_method(
                env.instance(OBJECT)?,
                VTableSlot::new(0),
            ))
        }
    }

    #[test]
    fn test_disabled_by_config() {
        let class = FakeClass::new(&[get_value as GetValue as *const ()]);
        let mut object = class.instantiate(3);

        let registry = HookRegistry::empty();
        registry.register::<Configured>();
        registry.load(
            env_with_object(&mut object),
            HookConfig {
                disabled_hooks: vec![Configured::ID.name().to_string()],
                ..HookConfig::default()
            },
        );

        assert_eq!(registry.status(Configured::ID), Some(HookStatus::Disabled));
        assert!(matches!(
            registry.original::<Configured>(),
            Err(HookError::DisabledByConfig(_))
        ));
        assert_eq!(object.vtable, class.entries() as *const *const ());
    }

    crate::hook_target! {
        struct LazyValue: extern "C" fn(*mut FakeObject) -> i32;
    }

    impl HookTarget for LazyValue {
        const ID: HookId = HookId::HltvCameraSetCameraAngle;
        const SCOPE: Scope = Scope::PLUGIN;

        fn interception(env: &Environment) -> Result<InterceptionStrategy, HookError> {
            Ok(InterceptionStrategy::instance_method(
                env.instance(OBJECT)?,
                VTableSlot::new(0),
            ))
        }
    }

    #[test]
    fn test_lazy_install_and_toggle() {
        let class = FakeClass::new(&[get_value as GetValue as *const ()]);
        let mut object = class.instantiate(11);

        let registry = HookRegistry::empty();
        registry.register::<LazyValue>();
        registry.load(
            env_with_object(&mut object),
            HookConfig {
                install_on_attach: false,
                ..HookConfig::default()
            },
        );

        // Attached but not installed until first use
        assert!(registry.is_available(LazyValue::ID));
        assert_eq!(object.vtable, class.entries() as *const *const ());

        registry
            .add_listener::<LazyValue, _>(|args: &mut (*mut FakeObject,)| {
                unsafe { (*args.0).value += 1 };
                0
            })
            .unwrap();
        assert_ne!(object.vtable, class.entries() as *const *const ());
        assert_eq!(call_slot(&mut object, 0), 12);

        registry.set_enabled(LazyValue::ID, false).unwrap();
        assert_eq!(call_slot(&mut object, 0), 12);
        assert!(!registry.summary()[0].installed);

        registry.set_enabled(LazyValue::ID, true).unwrap();
        assert_eq!(call_slot(&mut object, 0), 13);

        registry.unload();
        assert!(matches!(
            registry.set_enabled(LazyValue::ID, true),
            Err(HookError::NotAttached(_))
        ));
    }

    crate::hook_target! {
        struct OtherRecipe: extern "C" fn(*mut FakeObject) -> i32;
    }

    impl HookTarget for OtherRecipe {
        const ID: HookId = HookId::ClientEngineToolsInToolMode;
        const SCOPE: Scope = Scope::PLUGIN;

        fn interception(_env: &Environment) -> Result<InterceptionStrategy, HookError> {
            Err(HookError::TargetUnresolved(EnvironmentError::TargetNotFound(
                Self::ID.name().to_string(),
            )))
        }
    }

    crate::hook_target! {
        struct ClashingRecipe: extern "C" fn(*mut FakeObject) -> i32;
    }

    impl HookTarget for ClashingRecipe {
        const ID: HookId = HookId::ClientEngineToolsInToolMode;
        const SCOPE: Scope = Scope::PLUGIN;

        fn interception(_env: &Environment) -> Result<InterceptionStrategy, HookError> {
            Ok(InterceptionStrategy::function(NonNull::dangling()))
        }
    }

    #[test]
    fn test_conflicting_registration() {
        let registry = HookRegistry::empty();
        assert!(registry.register::<OtherRecipe>());
        assert!(registry.register::<OtherRecipe>());
        assert!(!registry.register::<ClashingRecipe>());

        assert!(matches!(
            registry.add_listener::<ClashingRecipe, _>(|_: &mut (*mut FakeObject,)| 0),
            Err(HookError::UnknownTarget(_))
        ));
        assert!(!registry.remove_listener(HookId::GetLocalPlayerIndex, ListenerId::new(1)));
        assert!(matches!(
            registry.set_enabled(HookId::GetLocalPlayerIndex, true),
            Err(HookError::UnknownTarget(_))
        ));
    }

    crate::hook_target! {
        struct Contested: extern "C" fn(*mut FakeObject) -> i32;
    }

    impl HookTarget for Contested {
        const ID: HookId = HookId::HltvCameraSetMode;
        const SCOPE: Scope = Scope::PLUGIN;

        fn interception(_env: &Environment) -> Result<InterceptionStrategy, HookError> {
            Ok(mock_strategy(
                get_value as GetValue as *const (),
                Arc::new(AtomicUsize::new(0)),
            ))
        }
    }

    #[test]
    fn test_second_registry_does_not_take_over_entry_point() {
        let first = HookRegistry::empty();
        let second = HookRegistry::empty();
        first.register::<Contested>();
        second.register::<Contested>();

        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        first
            .add_listener::<Contested, _>(move |_: &mut (*mut FakeObject,)| {
                h.fetch_add(1, Ordering::SeqCst);
                0
            })
            .unwrap();

        first.load(empty_env(), HookConfig::default());
        second.load(empty_env(), HookConfig::default());
        assert_eq!(first.status(Contested::ID), Some(HookStatus::Attached));
        assert_eq!(
            second.status(Contested::ID),
            Some(HookStatus::Unresolved(SLOT_TAKEN.to_string()))
        );

        let mut object = FakeObject {
            vtable: std::ptr::null(),
            value: 4,
        };
        let entry = <GetValue as Function>::dispatcher::<Contested>();

        // Unloading the loser leaves the owner serving the entry point
        second.unload();
        assert_eq!(first.status(Contested::ID), Some(HookStatus::Attached));
        assert!(first.summary()[0].installed);
        assert_eq!(entry(&mut object), 4);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        first.unload();
        second.load(empty_env(), HookConfig::default());
        assert_eq!(second.status(Contested::ID), Some(HookStatus::Attached));
        assert_eq!(entry(&mut object), 4);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        second.unload();
    }

    crate::hook_target! {
        struct SharedValue: extern "C" fn(*mut FakeObject) -> i32;
    }

    impl HookTarget for SharedValue {
        const ID: HookId = HookId::ClientEngineToolsInToolMode;
        const SCOPE: Scope = Scope::PLUGIN;

        fn interception(env: &Environment) -> Result<InterceptionStrategy, HookError> {
            Ok(InterceptionStrategy::shared_method(
                env.accessor(OBJECT)?,
                VTableSlot::new(1),
            ))
        }
    }

    #[test]
    fn test_shared_method_follows_current_instance() {
        let class = FakeClass::new(&[
            get_value as GetValue as *const (),
            get_double as GetValue as *const (),
        ]);
        let mut a = class.instantiate(3);
        let mut b = class.instantiate(5);

        let current = Arc::new(AtomicUsize::new(0));
        let c = current.clone();
        let env = Arc::new(
            Environment::builder(Arc::new(AddressTable::new()))
                .with_accessor(OBJECT, move || {
                    NonNull::new(c.load(Ordering::SeqCst) as *mut c_void)
                })
                .build(),
        );

        let registry = HookRegistry::empty();
        registry.register::<SharedValue>();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        registry
            .add_listener::<SharedValue, _>(move |args: &mut (*mut FakeObject,)| {
                s.lock().push(unsafe { (*args.0).value });
                0
            })
            .unwrap();

        // No instance to find the class table through yet
        registry.load(env.clone(), HookConfig::default());
        assert!(matches!(
            registry.status(SharedValue::ID),
            Some(HookStatus::Unresolved(_))
        ));

        current.store(&mut *a as *mut FakeObject as usize, Ordering::SeqCst);
        registry.unload();
        registry.load(env.clone(), HookConfig::default());
        assert_eq!(registry.status(SharedValue::ID), Some(HookStatus::Attached));

        // Every object of the class goes through the patched slot
        assert_eq!(call_slot(&mut a, 1), 6);
        assert_eq!(call_slot(&mut b, 1), 10);
        assert_eq!(*seen.lock(), vec![3, 5]);

        let original = registry.bound_original::<SharedValue>().unwrap();
        assert_eq!(original.call(()).unwrap(), 6);

        current.store(&mut *b as *mut FakeObject as usize, Ordering::SeqCst);
        assert_eq!(original.call(()).unwrap(), 10);

        current.store(0, Ordering::SeqCst);
        assert!(matches!(
            original.call(()),
            Err(HookError::InstanceUnavailable(_))
        ));
        assert_eq!(seen.lock().len(), 2);

        registry.unload();
        assert_eq!(
            unsafe { *class.entries().add(1) },
            get_double as GetValue as *const ()
        );
        assert_eq!(call_slot(&mut a, 1), 6);
        assert_eq!(seen.lock().len(), 2);
    }

    type TripleFn = extern "C" fn(i32) -> i32;

    #[inline(never)]
    extern "C" fn triple(value: i32) -> i32 {
        let mut total = 0i32;
        for _ in 0..std::hint::black_box(3) {
            total = total.wrapping_add(std::hint::black_box(value));
        }
        total
    }

    crate::hook_target! {
        struct DetouredValue: extern "C" fn(i32) -> i32;
    }

    impl HookTarget for DetouredValue {
        const ID: HookId = HookId::GetLocalPlayerIndex;
        const SCOPE: Scope = Scope::PLUGIN;

        fn interception(env: &Environment) -> Result<InterceptionStrategy, HookError> {
            Ok(InterceptionStrategy::function(env.locate(Self::ID.name())?))
        }
    }

    #[test]
    fn test_detached_detour_falls_back_to_real_entry() {
        let target = triple as TripleFn;
        let env = Arc::new(
            Environment::builder(Arc::new(
                AddressTable::new().with(DetouredValue::ID.name(), target as *const ()),
            ))
            .build(),
        );

        let registry = HookRegistry::empty();
        registry.register::<DetouredValue>();
        registry
            .add_listener::<DetouredValue, _>(|args: &mut (i32,)| {
                args.0 += 1;
                0
            })
            .unwrap();
        registry.load(env, HookConfig::default());

        let call = std::hint::black_box(target);
        let entry = <TripleFn as Function>::dispatcher::<DetouredValue>();
        assert_eq!(call(2), 9);
        assert_eq!(entry(2), 9);

        // The trampoline dies with the hook point; late landings use the
        // restored function
        registry.unload();
        assert_eq!(
            DetouredValue::slot().fallback().unwrap().to_ptr(),
            target as *const ()
        );
        assert_eq!(entry(2), 6);
        assert_eq!(call(2), 6);
    }

    #[test]
    fn test_builtin_registry_lists_every_target() {
        let registry = HookRegistry::new();
        let summary = registry.summary();

        assert_eq!(
            summary.iter().map(|s| s.id).collect::<Vec<_>>(),
            HookId::ALL.to_vec()
        );
        assert!(summary.iter().all(|s| s.status == HookStatus::Detached));

        registry.load(empty_env(), HookConfig::default());
        for line in registry.summary() {
            let scope_is_session = line.id == HookId::GameEventManagerFireEventClientSide;
            if scope_is_session {
                assert_eq!(line.status, HookStatus::Detached);
            } else {
                assert!(matches!(line.status, HookStatus::Unresolved(_)));
            }
        }
    }
}
