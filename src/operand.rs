//! The architecture-neutral operand model (spec §3).
//!
//! `Operand` is a tagged sum type rather than the dynamic `List<Object>`
//! operand vectors of the system this crate replaces: the dispatcher
//! pattern-matches structurally over this enum instead of doing
//! reflection-like type tests, which turns the old silent-drop-on-type-
//! mismatch into an explicit `InvalidOperand` error wherever the caller
//! (rather than the dispatcher's documented shape-matching) is at fault.

/// The id space below which register ids name real architectural
/// registers. Ids at or above this are virtual and only valid inside a
/// [`crate::emit::builder::Builder`]/[`crate::emit::compiler::Compiler`]
/// that has not yet been through register allocation.
pub const VIRT_BASE: u32 = 1 << 16;

/// Upper bound on physical register ids across all supported register
/// kinds and architectures.
pub const PHYSICAL_COUNT: u32 = VIRT_BASE;

/// Which register file a [`Register`] operand names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegKind {
    /// General-purpose integer register.
    Gp,
    /// Vector/SIMD/floating-point register.
    Vec,
    /// AVX-512 mask register.
    Mask,
    /// x86 segment override register (fs/gs).
    Segment,
}

/// A register operand: a `(kind, id, size_bits)` triple. `id < PHYSICAL_COUNT`
/// names a fixed architectural register; `id >= VIRT_BASE` names a
/// compiler-allocated virtual register and may only appear in
/// `Builder`/`Compiler` IR, never in an `Assembler` call that has already
/// gone through register allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Register {
    /// Which register file this operand is drawn from.
    pub kind: RegKind,
    /// Physical index (`< PHYSICAL_COUNT`) or virtual id (`>= VIRT_BASE`).
    pub id: u32,
    /// Operand width in bits: 8/16/32/64 for GP, 32/64/128/256/512 for vec.
    pub size_bits: u16,
}

impl Register {
    /// Construct a physical register operand. Panics if `id` is in the
    /// virtual range — use [`Register::virt`] for that.
    pub fn physical(kind: RegKind, id: u32, size_bits: u16) -> Self {
        assert!(id < PHYSICAL_COUNT, "id {id} is not a physical register id");
        Register {
            kind,
            id,
            size_bits,
        }
    }

    /// Construct a virtual register operand from a raw virtual id (as
    /// produced by `Compiler::new_gp`/`new_vec`).
    pub fn virt(kind: RegKind, virt_id: u32, size_bits: u16) -> Self {
        assert!(virt_id >= VIRT_BASE, "virt_id {virt_id} is below VIRT_BASE");
        Register {
            kind,
            id: virt_id,
            size_bits,
        }
    }

    /// Is this a virtual register (not yet allocated to a physical one)?
    pub fn is_virtual(&self) -> bool {
        self.id >= VIRT_BASE
    }
}

/// Addressing mode of a [`Memory`] operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddrMode {
    /// `[base + disp]`.
    BaseOffset,
    /// `[base + index*scale + disp]`.
    BaseIndexed,
    /// AArch64 pre-index: `[base, #disp]!`.
    PreIndex,
    /// AArch64 post-index: `[base], #disp`.
    PostIndex,
    /// `[rip + disp]` on x86-64, or `ADR`-relative on AArch64.
    PcRelative,
    /// A bare absolute/literal address (no base register).
    Literal,
}

/// A memory operand: `(base_reg?, index_reg?, scale, displacement,
/// addr_mode, size_hint)`. `size_hint` must match the implicit
/// operand-size expected by the chosen mnemonic; the encoder's
/// validation floor rejects mismatches as `InvalidOperand`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Memory {
    /// Base register, if any.
    pub base: Option<Register>,
    /// Index register, if any.
    pub index: Option<Register>,
    /// Index scale. Must be one of `{1, 2, 4, 8}` on x86-64; interpreted
    /// as an ARM shift amount on AArch64.
    pub scale: u8,
    /// Byte displacement. On AArch64 unsigned-offset loads/stores this is
    /// required to be a multiple of the access size (see
    /// `isa::aarch64::encoder`).
    pub displacement: i32,
    /// Addressing mode.
    pub addr_mode: AddrMode,
    /// Size hint in bits of the value being addressed.
    pub size_hint: u16,
}

impl Memory {
    /// `[base + disp]` with no index.
    pub fn base_offset(base: Register, displacement: i32, size_hint: u16) -> Self {
        Memory {
            base: Some(base),
            index: None,
            scale: 1,
            displacement,
            addr_mode: AddrMode::BaseOffset,
            size_hint,
        }
    }

    /// `[base + index*scale + disp]`.
    pub fn base_indexed(
        base: Register,
        index: Register,
        scale: u8,
        displacement: i32,
        size_hint: u16,
    ) -> Self {
        debug_assert!(matches!(scale, 1 | 2 | 4 | 8));
        Memory {
            base: Some(base),
            index: Some(index),
            scale,
            displacement,
            addr_mode: AddrMode::BaseIndexed,
            size_hint,
        }
    }

    /// `[rip + disp]`.
    pub fn rip_relative(displacement: i32, size_hint: u16) -> Self {
        Memory {
            base: None,
            index: None,
            scale: 1,
            displacement,
            addr_mode: AddrMode::PcRelative,
            size_hint,
        }
    }
}

/// A source-width-tagged signed 64-bit immediate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Immediate {
    /// The value, sign-extended to 64 bits.
    pub value: i64,
    /// The width of the literal as written by the caller, used to pick
    /// the shortest legal encoding (e.g. `imm8` vs `imm32`).
    pub source_bits: u8,
}

impl Immediate {
    /// Construct an immediate, inferring `source_bits` as the narrowest
    /// power-of-two width that losslessly represents `value`.
    pub fn new(value: i64) -> Self {
        let source_bits = if i8::try_from(value).is_ok() {
            8
        } else if i16::try_from(value).is_ok() {
            16
        } else if i32::try_from(value).is_ok() {
            32
        } else {
            64
        };
        Immediate {
            value,
            source_bits,
        }
    }

    /// Does this value fit in a signed field of `bits` width?
    pub fn fits_signed(&self, bits: u32) -> bool {
        if bits >= 64 {
            return true;
        }
        let lo = -(1i64 << (bits - 1));
        let hi = (1i64 << (bits - 1)) - 1;
        self.value >= lo && self.value <= hi
    }
}

/// A 32-bit opaque id referring to an entry in a
/// [`crate::label::LabelManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LabelId(pub u32);

/// An architecture-specific condition code. The two architectures use
/// disjoint encodings; `Cond` carries both so the operand model stays a
/// single enum, and encoders reject the one that doesn't belong to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cond {
    /// x86 condition codes, indexing the `Jcc`/`SETcc`/`CMOVcc` tttn field.
    X86(X86Cond),
    /// AArch64 condition codes, indexing the 4-bit `cond` field.
    Aarch64(Aarch64Cond),
}

/// x86 condition code (the low 4 bits of the one-byte/0F-prefixed
/// conditional opcode).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum X86Cond {
    O = 0x0,
    No = 0x1,
    B = 0x2,
    Ae = 0x3,
    E = 0x4,
    Ne = 0x5,
    Be = 0x6,
    A = 0x7,
    S = 0x8,
    Ns = 0x9,
    P = 0xA,
    Np = 0xB,
    L = 0xC,
    Ge = 0xD,
    Le = 0xE,
    G = 0xF,
}

/// AArch64 condition code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Aarch64Cond {
    Eq = 0x0,
    Ne = 0x1,
    Cs = 0x2,
    Cc = 0x3,
    Mi = 0x4,
    Pl = 0x5,
    Vs = 0x6,
    Vc = 0x7,
    Hi = 0x8,
    Ls = 0x9,
    Ge = 0xA,
    Lt = 0xB,
    Gt = 0xC,
    Le = 0xD,
    Al = 0xE,
    Nv = 0xF,
}

/// The tagged union of everything an instruction can take as an operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operand {
    /// A register, physical or (pre-allocation) virtual.
    Register(Register),
    /// A memory reference.
    Memory(Memory),
    /// A signed 64-bit immediate.
    Immediate(Immediate),
    /// A forward- or backward-referencing label.
    Label(LabelId),
    /// A condition code.
    Cond(Cond),
}

impl Operand {
    /// Every [`Register`] this operand directly names: itself if it is a
    /// `Register`, or its base/index if it is a `Memory`. Used by the
    /// register allocator's interval-construction pass and by the
    /// allocation-safety check.
    pub fn registers(&self) -> SmallVec2<Register> {
        match self {
            Operand::Register(r) => SmallVec2::one(*r),
            Operand::Memory(m) => {
                let mut v = SmallVec2::new();
                if let Some(b) = m.base {
                    v.push(b);
                }
                if let Some(i) = m.index {
                    v.push(i);
                }
                v
            }
            Operand::Immediate(_) | Operand::Label(_) | Operand::Cond(_) => SmallVec2::new(),
        }
    }

    /// Does this operand reference any virtual register?
    pub fn has_virtual_register(&self) -> bool {
        self.registers().iter().any(Register::is_virtual)
    }
}

/// A tiny fixed-capacity (2-element) vector, avoiding a heap allocation
/// for the common case of "zero, one, or two registers per operand".
#[derive(Debug, Clone, Copy, Default)]
pub struct SmallVec2<T> {
    items: [Option<T>; 2],
}

impl<T: Copy> SmallVec2<T> {
    fn new() -> Self {
        SmallVec2 { items: [None; 2] }
    }

    fn one(item: T) -> Self {
        SmallVec2 {
            items: [Some(item), None],
        }
    }

    fn push(&mut self, item: T) {
        if self.items[0].is_none() {
            self.items[0] = Some(item);
        } else {
            debug_assert!(self.items[1].is_none(), "SmallVec2 overflow");
            self.items[1] = Some(item);
        }
    }

    /// Iterate over the (at most two) present items.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter().filter_map(|o| o.as_ref())
    }
}
