//! Hook points
//!
//! A [`HookPoint`] is one logical interception location shared by any number
//! of listeners. It owns at most one primitive over its whole lifetime,
//! created lazily from its [`InterceptionStrategy`], and runs the dispatch
//! algorithm every time the real call site is reached:
//!
//! 1. Open a decision frame (decision starts as `CallOriginal`)
//! 2. Run every listener in registration order with the mutable argument
//!    tuple, keeping the last returned value as the candidate
//! 3. On `Supercede` return the candidate, otherwise call the original with
//!    the possibly mutated arguments and return its value
//!
//! # Installation
//!
//! The primitive moves `Uninitialized -> Initializing -> Installed` under a
//! re-entrant lock. Other threads block on the lock until installation is
//! done; a nested call on the installing thread sees `Initializing` and
//! bypasses installation instead of installing twice.
//!
//! # Listeners
//!
//! The listener list is copy-on-write behind its own lock. A dispatch works
//! on the snapshot taken when it started, so listeners added meanwhile join
//! the next dispatch, and removed listeners are flagged dead so an
//! in-progress dispatch skips them.

use std::sync::atomic::{AtomicBool, AtomicPtr, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};

use grouphook_engine::InstanceAccessor;
use grouphook_sdk::{Function, Method};
use parking_lot::{ReentrantMutex, RwLock};

use super::decision::{self, Decision, DecisionFrame};
use super::error::HookError;
use super::primitive::{InterceptionPrimitive, PrimitiveKind};
use super::strategy::InterceptionStrategy;

/// Listener callback for signature `F`
///
/// Receives the call's arguments by mutable reference and returns a value of
/// the target's return type, used only when the call is superceded.
pub type ListenerFn<F> = Arc<
    dyn Fn(&mut <F as Function>::Args) -> <F as Function>::Output + Send + Sync,
>;

/// Handle for a registered listener
///
/// Ids increase monotonically and are never reused by the issuing point or
/// registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Installation state of a hook point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallState {
    Uninitialized,
    Initializing,
    Installed,
}

const UNINITIALIZED: u8 = 0;
const INITIALIZING: u8 = 1;
const INSTALLED: u8 = 2;

/// Keys tie decision frames to one hook point
static NEXT_POINT_KEY: AtomicU64 = AtomicU64::new(1);

struct Listener<F: Function> {
    id: ListenerId,
    callback: ListenerFn<F>,
    alive: AtomicBool,
}

/// One interception target multiplexed over many listeners
pub struct HookPoint<F: Function> {
    name: String,
    key: u64,
    strategy: InterceptionStrategy,
    dispatcher: F,

    state: AtomicU8,
    install_lock: ReentrantMutex<()>,
    primitive: OnceLock<Box<dyn InterceptionPrimitive>>,
    /// Original of the primitive being installed or installed; null otherwise
    original: AtomicPtr<()>,

    listeners: RwLock<Arc<Vec<Arc<Listener<F>>>>>,
    next_listener: AtomicU64,
}

impl<F: Function> std::fmt::Debug for HookPoint<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookPoint")
            .field("name", &self.name)
            .field("strategy", &self.strategy)
            .field("state", &self.state())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl<F: Function> HookPoint<F> {
    /// Create an uninstalled hook point
    ///
    /// `dispatcher` is the entry point the real call site gets redirected
    /// to; it must route back into [`HookPoint::dispatch`] for this point.
    pub fn new(name: impl Into<String>, dispatcher: F, strategy: InterceptionStrategy) -> Self {
        Self {
            name: name.into(),
            key: NEXT_POINT_KEY.fetch_add(1, Ordering::Relaxed),
            strategy,
            dispatcher,
            state: AtomicU8::new(UNINITIALIZED),
            install_lock: ReentrantMutex::new(()),
            primitive: OnceLock::new(),
            original: AtomicPtr::new(std::ptr::null_mut()),
            listeners: RwLock::new(Arc::new(Vec::new())),
            next_listener: AtomicU64::new(1),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> PrimitiveKind {
        self.strategy.kind()
    }

    pub fn state(&self) -> InstallState {
        match self.state.load(Ordering::Acquire) {
            INSTALLED => InstallState::Installed,
            INITIALIZING => InstallState::Initializing,
            _ => InstallState::Uninitialized,
        }
    }

    /// Whether the primitive exists and currently redirects the call site
    pub fn is_installed(&self) -> bool {
        self.primitive
            .get()
            .map(|primitive| primitive.is_installed())
            .unwrap_or(false)
    }

    /// Materialize and install the primitive if that has not happened yet
    ///
    /// Safe to call from any thread and from within a dispatch. A call nested
    /// inside the installation itself returns `InstallInProgress`.
    pub fn install(&self) -> Result<(), HookError> {
        if self.state.load(Ordering::Acquire) == INSTALLED {
            return Ok(());
        }

        let _guard = self.install_lock.lock();

        match self.state.load(Ordering::Acquire) {
            INSTALLED => Ok(()),
            INITIALIZING => Err(HookError::InstallInProgress(self.name.clone())),
            _ => {
                self.state.store(INITIALIZING, Ordering::Release);
                let result = self.create_primitive();
                let next = if result.is_ok() { INSTALLED } else { UNINITIALIZED };
                self.state.store(next, Ordering::Release);
                result
            }
        }
    }

    /// Build, record and install the primitive. Install lock must be held.
    fn create_primitive(&self) -> Result<(), HookError> {
        if self.primitive.get().is_some() {
            debug_assert!(false, "hook '{}' installed twice", self.name);
            tracing::error!("{}", HookError::DoubleInstall(self.name.clone()));
            return Ok(());
        }

        let primitive = self
            .strategy
            .build(&self.name, self.dispatcher.to_ptr())
            .inspect_err(|e| tracing::warn!("Failed to build hook '{}': {}", self.name, e))?;

        // Recorded before installing so a call landing mid-install has an
        // original to run. A failed install drops the primitive, and with it
        // whatever its original points into.
        self.original
            .store(primitive.original() as *mut (), Ordering::Release);

        if let Err(e) = primitive.install() {
            self.original.store(std::ptr::null_mut(), Ordering::Release);
            tracing::warn!("Failed to install hook '{}': {}", self.name, e);
            return Err(e);
        }

        if self.primitive.set(primitive).is_err() {
            debug_assert!(false, "hook '{}' installed twice", self.name);
            tracing::error!("{}", HookError::DoubleInstall(self.name.clone()));
            return Ok(());
        }

        tracing::info!("Installed hook '{}' ({})", self.name, self.kind());
        Ok(())
    }

    /// Toggle the installed primitive without touching listeners
    pub fn set_enabled(&self, enabled: bool) -> Result<(), HookError> {
        if enabled {
            self.install()?;
        }

        let _guard = self.install_lock.lock();
        let Some(primitive) = self.primitive.get() else {
            return if enabled {
                Err(HookError::NotAttached(self.name.clone()))
            } else {
                Ok(())
            };
        };

        match (enabled, primitive.is_installed()) {
            (true, false) => primitive.install(),
            (false, true) => primitive.uninstall(),
            _ => Ok(()),
        }
    }

    /// Restore the real call site; the primitive stays available for
    /// [`HookPoint::set_enabled`]
    pub fn uninstall(&self) -> Result<(), HookError> {
        self.set_enabled(false)
    }

    /// The original entry point, installing the primitive first if needed
    ///
    /// During installation (nested on the installing thread) the original is
    /// already known and returned.
    pub fn original(&self) -> Result<F, HookError> {
        let installed = self.install();
        match (installed, self.recorded_original()) {
            (Ok(()), Some(original)) => Ok(original),
            (Err(HookError::InstallInProgress(_)), Some(original)) => Ok(original),
            (Err(e), _) => Err(e),
            (Ok(()), None) => Err(HookError::NotAttached(self.name.clone())),
        }
    }

    fn recorded_original(&self) -> Option<F> {
        let ptr = self.original.load(Ordering::Acquire);
        if ptr.is_null() {
            None
        } else {
            Some(unsafe { F::from_ptr(ptr as *const ()) })
        }
    }

    /// Accessor supplying the current receiver of a shared method hook
    pub fn accessor(&self) -> Option<&InstanceAccessor> {
        self.strategy.accessor()
    }

    pub fn strategy(&self) -> &InterceptionStrategy {
        &self.strategy
    }

    /// Register a listener; it participates from the next dispatch on
    pub fn add_listener<C>(&self, callback: C) -> ListenerId
    where
        C: Fn(&mut F::Args) -> F::Output + Send + Sync + 'static,
    {
        self.add_shared_listener(Arc::new(callback))
    }

    /// Register an already shared listener callback
    pub fn add_shared_listener(&self, callback: ListenerFn<F>) -> ListenerId {
        let id = ListenerId::new(self.next_listener.fetch_add(1, Ordering::Relaxed));
        let listener = Arc::new(Listener {
            id,
            callback,
            alive: AtomicBool::new(true),
        });

        let mut listeners = self.listeners.write();
        let mut next = Vec::with_capacity(listeners.len() + 1);
        next.extend(listeners.iter().cloned());
        next.push(listener);
        *listeners = Arc::new(next);

        tracing::debug!("Added listener {} to '{}'", id, self.name);
        id
    }

    /// Remove a listener
    ///
    /// # Returns
    /// `false` if the id is unknown or was already removed
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let Some(position) = listeners.iter().position(|listener| listener.id == id) else {
            return false;
        };

        listeners[position].alive.store(false, Ordering::Release);

        let mut next = Vec::with_capacity(listeners.len() - 1);
        next.extend(
            listeners
                .iter()
                .filter(|listener| listener.id != id)
                .cloned(),
        );
        *listeners = Arc::new(next);

        tracing::debug!("Removed listener {} from '{}'", id, self.name);
        true
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Set the decision of the dispatch currently running on this thread
    ///
    /// Only valid from inside a listener of this point.
    pub fn set_decision(&self, decision: Decision) -> Result<(), HookError> {
        if decision::set(self.key, decision) {
            Ok(())
        } else {
            Err(HookError::DecisionOutsideDispatch(self.name.clone()))
        }
    }

    /// Whether this thread is currently dispatching through this point
    pub fn in_dispatch(&self) -> bool {
        decision::in_dispatch(self.key)
    }

    /// Resolve the original and run the dispatch algorithm
    pub fn dispatch(&self, args: F::Args) -> Result<F::Output, HookError> {
        let original = self.original()?;
        Ok(self.run(original, args))
    }

    /// Run the dispatch algorithm against a known original
    pub fn run(&self, original: F, mut args: F::Args) -> F::Output {
        let snapshot = self.listeners.read().clone();

        let frame = DecisionFrame::enter(self.key);
        let mut candidate = None;

        for listener in snapshot.iter() {
            if !listener.alive.load(Ordering::Acquire) {
                continue;
            }
            candidate = Some((listener.callback)(&mut args));
        }

        let decision = frame.decision();
        drop(frame);

        match (decision, candidate) {
            (Decision::Supercede, Some(value)) => value,
            _ => unsafe { original.invoke(args) },
        }
    }
}

impl<F: Method> HookPoint<F> {
    /// Original bound to whichever instance the accessor reports at call time
    pub fn bound_original(&self) -> Result<BoundOriginal<F>, HookError> {
        let accessor = self
            .accessor()
            .cloned()
            .ok_or_else(|| HookError::InstanceUnavailable(self.name.clone()))?;

        Ok(BoundOriginal {
            name: self.name.clone(),
            original: self.original()?,
            accessor,
        })
    }
}

/// Original of a shared method hook, re-targeted on every call
#[derive(Clone)]
pub struct BoundOriginal<F: Method> {
    name: String,
    original: F,
    accessor: InstanceAccessor,
}

impl<F: Method> BoundOriginal<F> {
    /// Call the original on the current instance
    pub fn call(&self, rest: F::Rest) -> Result<F::Output, HookError> {
        let instance =
            (self.accessor)().ok_or_else(|| HookError::InstanceUnavailable(self.name.clone()))?;
        Ok(unsafe { self.original.invoke_method(instance.as_ptr().cast(), rest) })
    }

    /// The unbound original
    pub fn unbound(&self) -> F {
        self.original
    }
}
