//! Pointer-to-member-function decoding
//!
//! The slot tables in the SDK are the normal way to name a virtual method.
//! When an embedder only has a C++ member function pointer, this is the one
//! place that knows how each ABI encodes the vtable index in it.

use iced_x86::{Code, Decoder, DecoderOptions, Register};

use grouphook_sdk::VTableSlot;

/// Raw representation of a pointer-to-member-function
#[derive(Debug, Clone, Copy)]
pub enum MemberFnRepr<'a> {
    /// Itanium C++ ABI `{ ptr, adj }` pair
    ///
    /// For virtual functions `ptr` is one plus the byte offset of the slot.
    Itanium { ptr: usize, adj: isize },

    /// MSVC member pointers address a vcall thunk; `code` holds its first
    /// bytes and `bitness` is 32 or 64
    MsvcThunk { code: &'a [u8], bitness: u32 },
}

/// Resolve the vtable slot a member function pointer dispatches through
///
/// Returns `None` for non-virtual functions and for thunks that do not have
/// the expected `mov eax, [ecx]; jmp [eax + disp]` shape.
pub fn resolve_member_slot(repr: MemberFnRepr<'_>) -> Option<VTableSlot> {
    match repr {
        MemberFnRepr::Itanium { ptr, adj: _ } => {
            if ptr & 1 == 0 {
                return None;
            }
            Some(VTableSlot::new((ptr - 1) / std::mem::size_of::<usize>()))
        }
        MemberFnRepr::MsvcThunk { code, bitness } => decode_vcall_thunk(code, bitness),
    }
}

fn decode_vcall_thunk(code: &[u8], bitness: u32) -> Option<VTableSlot> {
    let (load, jump, this_reg, table_reg, pointer_size) = match bitness {
        64 => (Code::Mov_r64_rm64, Code::Jmp_rm64, Register::RCX, Register::RAX, 8u64),
        32 => (Code::Mov_r32_rm32, Code::Jmp_rm32, Register::ECX, Register::EAX, 4u64),
        _ => return None,
    };

    let mut decoder = Decoder::with_ip(bitness, code, 0, DecoderOptions::NONE);

    // mov rax, [rcx]
    let first = decoder.decode();
    if first.is_invalid()
        || first.code() != load
        || first.op0_register() != table_reg
        || first.memory_base() != this_reg
        || first.memory_displacement64() != 0
    {
        tracing::debug!("Unexpected vcall thunk prologue: {:?}", first.code());
        return None;
    }

    // jmp [rax + disp]
    if !decoder.can_decode() {
        return None;
    }
    let second = decoder.decode();
    if second.is_invalid() || second.code() != jump || second.memory_base() != table_reg {
        tracing::debug!("Unexpected vcall thunk jump: {:?}", second.code());
        return None;
    }

    let displacement = second.memory_displacement64();
    if displacement % pointer_size != 0 {
        return None;
    }

    Some(VTableSlot::new((displacement / pointer_size) as usize))
}
