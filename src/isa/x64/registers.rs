//! x86-64 physical register ids and the bitmask-based allocatable pool.
//!
//! Ids follow the architectural encoding order (the order ModR/M and REX
//! expect), not alphabetical order — `rcx` is unit 1, not `rbx`. This
//! mirrors `cranelift_codegen::isa::x86::registers`, whose doc comment
//! calls out the same non-alphabetical surprise.

/// GP register id, 0..=15, matching the 4-bit `(REX.B|REX.X, ModRM.rm)`
/// encoding space.
pub const RAX: u32 = 0;
pub const RCX: u32 = 1;
pub const RDX: u32 = 2;
pub const RBX: u32 = 3;
pub const RSP: u32 = 4;
pub const RBP: u32 = 5;
pub const RSI: u32 = 6;
pub const RDI: u32 = 7;
pub const R8: u32 = 8;
pub const R9: u32 = 9;
pub const R10: u32 = 10;
pub const R11: u32 = 11;
pub const R12: u32 = 12;
pub const R13: u32 = 13;
pub const R14: u32 = 14;
pub const R15: u32 = 15;

/// Number of architectural GP registers.
pub const NUM_GP: u32 = 16;
/// Number of architectural vector (`xmm`/`ymm`/`zmm`) registers.
pub const NUM_VEC: u32 = 16;

/// Registers always excluded from the allocator's pool: the stack
/// pointer, and the frame pointer when the frame uses one (this crate
/// always reserves it, matching the fixed-`rbp`-frame prologue of spec
/// §4.6).
pub const RESERVED_GP: &[u32] = &[RSP, RBP];

/// Caller-saved GP registers available as spill-materialization scratch,
/// drawn in the order spec §4.6 names them for x86-64 SysV: `rax, rcx,
/// rdx, r10, r11`.
pub const SCRATCH_POOL: &[u32] = &[RAX, RCX, RDX, R10, R11];

/// Name of GP register `id`, for error messages.
pub fn gp_name(id: u32) -> &'static str {
    const NAMES: [&str; 16] = [
        "rax", "rcx", "rdx", "rbx", "rsp", "rbp", "rsi", "rdi", "r8", "r9", "r10", "r11", "r12",
        "r13", "r14", "r15",
    ];
    NAMES.get(id as usize).copied().unwrap_or("?")
}

/// Does encoding `id` require a `REX` byte on its own (ids 8..=15 always
/// do; ids 4..=7 do only when paired with a byte-sized operand that
/// would otherwise alias `ah/ch/dh/bh`, which this crate's encoder
/// handles at the call site rather than here)?
pub fn needs_rex_bit(id: u32) -> bool {
    id >= 8
}

/// A simple bitmask-based pool of available physical registers within
/// one class, in the texture of `cranelift_codegen::regalloc::RegisterSet`
/// (a raw bitmask rather than a generic bit-set type, since x86-64 never
/// exceeds 16 registers per class).
#[derive(Debug, Clone, Copy)]
pub struct RegisterPool {
    avail: u32,
}

impl RegisterPool {
    /// A pool with every register in `0..count` available except those
    /// listed in `reserved`.
    pub fn new(count: u32, reserved: &[u32]) -> Self {
        let mut avail = if count >= 32 { u32::MAX } else { (1 << count) - 1 };
        for &r in reserved {
            avail &= !(1 << r);
        }
        RegisterPool { avail }
    }

    /// Take the first available register, marking it unavailable.
    /// Returns `None` if the pool is empty.
    pub fn take_first(&mut self) -> Option<u32> {
        if self.avail == 0 {
            return None;
        }
        let id = self.avail.trailing_zeros();
        self.avail &= !(1 << id);
        Some(id)
    }

    /// Return `id` to the pool.
    pub fn free(&mut self, id: u32) {
        self.avail |= 1 << id;
    }

    /// Mark `id` unavailable without returning it via `take_first` (used
    /// to reserve a register already assigned to an active interval).
    pub fn reserve(&mut self, id: u32) {
        self.avail &= !(1 << id);
    }

    /// Is `id` currently available?
    pub fn is_available(&self, id: u32) -> bool {
        self.avail & (1 << id) != 0
    }
}
