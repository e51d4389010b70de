//! Typed function signatures for interception targets
//!
//! A hooked target is described by a plain `extern "C"` function pointer type,
//! e.g. `extern "C" fn(i32, *mut PlayerInfo) -> bool`. [`Function`] exposes the
//! argument list of such a type as a tuple so listeners can inspect and mutate
//! the arguments of an intercepted call, and [`Function::dispatcher`] produces
//! the entry point a primitive redirects the real call site to.
//!
//! Only the C calling convention is supported. On x86_64 this is also the
//! convention used for member functions, with the receiver as first argument.

/// Receives intercepted calls for one target signature
///
/// Implemented by the marker type of a hook target. The generated entry point
/// returned by [`Function::dispatcher`] packs the raw arguments into
/// `F::Args` and forwards them here.
pub trait Dispatch<F: Function> {
    /// Run the dispatch algorithm for one intercepted call
    fn dispatch(args: F::Args) -> F::Output;
}

/// Function pointer type usable as an interception target
///
/// # Safety
/// Implementors must be plain function pointers: `from_ptr` and `to_ptr` must
/// round-trip the code address, and `invoke` must call it with exactly the
/// arguments in `Args`.
pub unsafe trait Function: Sized + Copy + Send + Sync + 'static {
    /// The argument types as a tuple
    type Args: 'static;

    /// The return type
    type Output: 'static;

    /// Number of arguments
    const ARITY: usize;

    /// Construct a function pointer from an untyped code address
    ///
    /// # Safety
    /// `ptr` must point to code with exactly this signature.
    unsafe fn from_ptr(ptr: *const ()) -> Self;

    /// Untyped code address of this function
    fn to_ptr(&self) -> *const ();

    /// Call the function with a packed argument tuple
    ///
    /// # Safety
    /// The function must be safe to call with these arguments.
    unsafe fn invoke(self, args: Self::Args) -> Self::Output;

    /// Entry point with this signature that forwards every call to `D`
    fn dispatcher<D: Dispatch<Self>>() -> Self;
}

/// Function pointer type whose first parameter is the object receiver
///
/// Used for virtual and non-virtual member functions, where the original has
/// to be re-invoked against a receiver chosen at call time.
///
/// # Safety
/// Same contract as [`Function`].
pub unsafe trait Method: Function {
    /// Pointee type of the receiver parameter
    type Receiver: 'static;

    /// Remaining argument types as a tuple
    type Rest: 'static;

    /// Call the function with an explicit receiver and the remaining arguments
    ///
    /// # Safety
    /// `this` must be a valid receiver for this function.
    unsafe fn invoke_method(self, this: *mut Self::Receiver, rest: Self::Rest) -> Self::Output;
}

macro_rules! impl_function {
    ($($arg:ident: $ty:ident),*) => {
        impl_function!(@emit (extern "C" fn($($ty),*) -> R) $($arg: $ty),*);
        impl_function!(@emit (unsafe extern "C" fn($($ty),*) -> R) $($arg: $ty),*);
    };
    (@emit ($($fn_ty:tt)*) $($arg:ident: $ty:ident),*) => {
        unsafe impl<R: 'static, $($ty: 'static),*> Function for $($fn_ty)* {
            type Args = ($($ty,)*);
            type Output = R;
            const ARITY: usize = impl_function!(@count $($ty)*);

            #[inline]
            unsafe fn from_ptr(ptr: *const ()) -> Self {
                std::mem::transmute::<*const (), Self>(ptr)
            }

            #[inline]
            fn to_ptr(&self) -> *const () {
                *self as *const ()
            }

            #[inline]
            #[allow(clippy::unused_unit)]
            unsafe fn invoke(self, args: Self::Args) -> R {
                let ($($arg,)*) = args;
                (self)($($arg),*)
            }

            fn dispatcher<D: Dispatch<Self>>() -> Self {
                #[allow(improper_ctypes_definitions)]
                extern "C" fn landing<D, R: 'static, $($ty: 'static),*>($($arg: $ty),*) -> R
                where
                    D: Dispatch<$($fn_ty)*>,
                {
                    D::dispatch(($($arg,)*))
                }

                landing::<D, R, $($ty),*>
            }
        }
    };
    (@count) => { 0 };
    (@count $head:ident $($tail:ident)*) => { 1 + impl_function!(@count $($tail)*) };
}

macro_rules! impl_method {
    ($($arg:ident: $ty:ident),*) => {
        impl_method!(@emit (extern "C" fn(*mut T, $($ty),*) -> R) $($arg: $ty),*);
        impl_method!(@emit (unsafe extern "C" fn(*mut T, $($ty),*) -> R) $($arg: $ty),*);
    };
    (@emit ($($fn_ty:tt)*) $($arg:ident: $ty:ident),*) => {
        unsafe impl<T: 'static, R: 'static, $($ty: 'static),*> Method for $($fn_ty)* {
            type Receiver = T;
            type Rest = ($($ty,)*);

            #[inline]
            unsafe fn invoke_method(self, this: *mut T, rest: Self::Rest) -> R {
                let ($($arg,)*) = rest;
                (self)(this, $($arg),*)
            }
        }
    };
}

impl_function!();
impl_function!(a0: A0);
impl_function!(a0: A0, a1: A1);
impl_function!(a0: A0, a1: A1, a2: A2);
impl_function!(a0: A0, a1: A1, a2: A2, a3: A3);
impl_function!(a0: A0, a1: A1, a2: A2, a3: A3, a4: A4);
impl_function!(a0: A0, a1: A1, a2: A2, a3: A3, a4: A4, a5: A5);
impl_function!(a0: A0, a1: A1, a2: A2, a3: A3, a4: A4, a5: A5, a6: A6);
impl_function!(a0: A0, a1: A1, a2: A2, a3: A3, a4: A4, a5: A5, a6: A6, a7: A7);

impl_method!();
impl_method!(a1: A1);
impl_method!(a1: A1, a2: A2);
impl_method!(a1: A1, a2: A2, a3: A3);
impl_method!(a1: A1, a2: A2, a3: A3, a4: A4);
impl_method!(a1: A1, a2: A2, a3: A3, a4: A4, a5: A5);
impl_method!(a1: A1, a2: A2, a3: A3, a4: A4, a5: A5, a6: A6);
impl_method!(a1: A1, a2: A2, a3: A3, a4: A4, a5: A5, a6: A6, a7: A7);
