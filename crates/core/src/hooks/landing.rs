//! Static landing for redirected call sites
//!
//! A primitive redirects the real call site to a plain `extern "C"` entry
//! point, which has no room for a closure environment. Every target therefore
//! gets a marker type (declared with [`hook_target!`](crate::hook_target))
//! owning a static [`ActiveSlot`]; the generated entry point reads the hook
//! point currently published there and dispatches through it.

use std::sync::atomic::{AtomicPtr, Ordering};
use std::sync::Arc;

use grouphook_sdk::Function;
use parking_lot::RwLock;

use super::point::HookPoint;

/// Hook point currently serving one target, plus the last original seen
pub struct ActiveSlot<F: Function> {
    point: RwLock<Option<Arc<HookPoint<F>>>>,
    fallback: AtomicPtr<()>,
}

impl<F: Function> Default for ActiveSlot<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Function> ActiveSlot<F> {
    pub const fn new() -> Self {
        Self {
            point: parking_lot::const_rwlock(None),
            fallback: AtomicPtr::new(std::ptr::null_mut()),
        }
    }

    /// Route calls to `point` unless another point is serving the target
    pub fn try_publish(&self, point: Arc<HookPoint<F>>) -> bool {
        let mut current = self.point.write();
        if current.is_some() {
            return false;
        }
        *current = Some(point);
        true
    }

    /// Retract `point` if it is the one published
    pub fn retract_if(&self, point: &Arc<HookPoint<F>>) -> bool {
        let mut current = self.point.write();
        if current.as_ref().is_some_and(|c| Arc::ptr_eq(c, point)) {
            *current = None;
            true
        } else {
            false
        }
    }

    pub fn current(&self) -> Option<Arc<HookPoint<F>>> {
        self.point.read().clone()
    }

    /// Remember an original for calls that land after a retract
    pub fn remember_original(&self, original: F) {
        self.fallback
            .store(original.to_ptr() as *mut (), Ordering::Release);
    }

    /// Remember `original` only while `point` is still published
    fn remember_for(&self, point: &Arc<HookPoint<F>>, original: F) {
        let current = self.point.read();
        if current.as_ref().is_some_and(|c| Arc::ptr_eq(c, point)) {
            self.remember_original(original);
        }
    }

    /// Last remembered original
    pub fn fallback(&self) -> Option<F> {
        let ptr = self.fallback.load(Ordering::Acquire);
        if ptr.is_null() {
            None
        } else {
            Some(unsafe { F::from_ptr(ptr as *const ()) })
        }
    }
}

/// Marker type bound to one static landing slot
///
/// Implemented by [`hook_target!`](crate::hook_target).
pub trait StaticTarget: 'static {
    /// Signature of the intercepted function
    type Signature: Function;

    /// Name used in logs
    const NAME: &'static str;

    fn slot() -> &'static ActiveSlot<Self::Signature>;
}

/// Body of every generated entry point
///
/// Dispatches through the published hook point. When none is published,
/// for example a call still in flight while the hook detaches, the last
/// known original runs instead. With neither there is no value to return,
/// so the process aborts.
pub fn land<H: StaticTarget>(
    args: <H::Signature as Function>::Args,
) -> <H::Signature as Function>::Output {
    let slot = H::slot();

    if let Some(point) = slot.current() {
        match point.original() {
            Ok(original) => {
                slot.remember_for(&point, original);
                return point.run(original, args);
            }
            Err(e) => tracing::error!("Hook '{}' landed without an original: {}", H::NAME, e),
        }
    }

    if let Some(original) = slot.fallback() {
        tracing::trace!("Hook '{}' landed while detached", H::NAME);
        return unsafe { original.invoke(args) };
    }

    tracing::error!("No original to call for '{}', aborting", H::NAME);
    std::process::abort()
}

/// Declare the marker type of an interception target
///
/// Generates the marker struct, its static [`ActiveSlot`] and the
/// [`Dispatch`](grouphook_sdk::Dispatch) impl, so that
/// `Signature::dispatcher::<Marker>()` is an entry point landing in the
/// marker's current hook point.
///
/// # Example
/// ```ignore
/// hook_target! {
///     /// `C_HLTVCamera::SetMode`
///     pub struct HltvCameraSetMode: extern "C" fn(*mut C_HLTVCamera, i32);
/// }
/// ```
#[macro_export]
macro_rules! hook_target {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident: $sig:ty;
    ) => {
        $(#[$meta])*
        $vis struct $name;

        $crate::paste::paste! {
            static [<$name:snake:upper _SLOT>]: $crate::hooks::ActiveSlot<$sig> =
                $crate::hooks::ActiveSlot::new();

            impl $crate::hooks::StaticTarget for $name {
                type Signature = $sig;
                const NAME: &'static str = stringify!($name);

                fn slot() -> &'static $crate::hooks::ActiveSlot<$sig> {
                    &[<$name:snake:upper _SLOT>]
                }
            }
        }

        impl $crate::sdk::Dispatch<$sig> for $name {
            fn dispatch(
                args: <$sig as $crate::sdk::Function>::Args,
            ) -> <$sig as $crate::sdk::Function>::Output {
                $crate::hooks::land::<$name>(args)
            }
        }
    };
}
