//! AArch64 physical register ids and the allocatable pool.

pub const X0: u32 = 0;
pub const X1: u32 = 1;
pub const X2: u32 = 2;
pub const X3: u32 = 3;
pub const X4: u32 = 4;
pub const X5: u32 = 5;
pub const X6: u32 = 6;
pub const X7: u32 = 7;
pub const X8: u32 = 8;
pub const X9: u32 = 9;
pub const X10: u32 = 10;
pub const X16: u32 = 16;
pub const X17: u32 = 17;
pub const X29: u32 = 29; // frame pointer (FP)
pub const X30: u32 = 30; // link register (LR)
/// Register encoding 31. Context-dependent: the stack pointer in most
/// load/store and add/sub-immediate forms, the zero register (XZR/WZR)
/// in register-register forms. Each encoder function documents which
/// interpretation it uses.
pub const SP_OR_ZR: u32 = 31;

/// Number of architectural GP registers (`x0..=x30`, plus the
/// context-dependent `sp`/`xzr` encoding 31).
pub const NUM_GP: u32 = 32;
/// Number of architectural vector (`v0..=v31`) registers.
pub const NUM_VEC: u32 = 32;

/// Registers the allocator never assigns to a `VirtReg`: the frame
/// pointer and link register (this crate always uses a fixed `x29`
/// frame per spec §4.6), the SP/ZR encoding, and the platform-reserved
/// `x16`/`x17` pair used by the linker/runtime on AArch64 (also reused
/// here as spill-materialization scratch, never as an allocation
/// target).
pub const RESERVED_GP: &[u32] = &[X29, X30, SP_OR_ZR, X16, X17];

/// Caller-saved scratch pool for spill materialization, per spec §4.6:
/// `x0–x10, x16, x17`.
pub const SCRATCH_POOL: &[u32] = &[X0, X1, X2, X3, X4, X5, X6, X7, X8, X9, X10, X16, X17];

/// Name of GP register `id`, for error messages.
pub fn gp_name(id: u32) -> String {
    match id {
        29 => "x29".to_string(),
        30 => "x30".to_string(),
        31 => "sp".to_string(),
        n => format!("x{n}"),
    }
}

/// A simple bitmask-based pool of available physical registers, shared
/// in spirit with [`crate::isa::x64::registers::RegisterPool`] but sized
/// for AArch64's 32 GP/vector registers.
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

    /// Mark `id` unavailable without taking it via `take_first`.
    pub fn reserve(&mut self, id: u32) {
        self.avail &= !(1 << id);
    }

    /// Is `id` currently available?
    pub fn is_available(&self, id: u32) -> bool {
        self.avail & (1 << id) != 0
    }
}
