//! A small, hand-written instruction metadata table (spec §6): the real
//! oracle this crate's `InstInfo` models is an offline-generated
//! artifact covering the entire ISA (the teacher's own `meta/` crate
//! generates a comparable encoding table at build time); reproducing
//! that generator is out of scope here, so this module only describes
//! the mnemonics the `isa::x64`/`isa::aarch64` dispatchers actually
//! implement.

use crate::isa::{aarch64, x64, InstInfo, INST_LOCKABLE, INST_VOLATILE};

/// Metadata for every x86-64 mnemonic id this crate's dispatcher
/// recognizes, indexed by [`x64::Mnemonic`] discriminant.
pub const X64_INST_DB: &[InstInfo] = &[
    InstInfo {
        name: "mov",
        flags: 0,
        extensions: &[],
    },
    InstInfo {
        name: "add",
        flags: INST_LOCKABLE,
        extensions: &[],
    },
    InstInfo {
        name: "sub",
        flags: INST_LOCKABLE,
        extensions: &[],
    },
    InstInfo {
        name: "cmp",
        flags: 0,
        extensions: &[],
    },
    InstInfo {
        name: "lea",
        flags: 0,
        extensions: &[],
    },
    InstInfo {
        name: "push",
        flags: INST_VOLATILE,
        extensions: &[],
    },
    InstInfo {
        name: "pop",
        flags: INST_VOLATILE,
        extensions: &[],
    },
    InstInfo {
        name: "ret",
        flags: INST_VOLATILE,
        extensions: &[],
    },
    InstInfo {
        name: "jmp",
        flags: INST_VOLATILE,
        extensions: &[],
    },
    InstInfo {
        name: "jcc",
        flags: INST_VOLATILE,
        extensions: &[],
    },
    InstInfo {
        name: "call",
        flags: INST_VOLATILE,
        extensions: &[],
    },
    InstInfo {
        name: "mov_imm64",
        flags: 0,
        extensions: &[],
    },
    InstInfo {
        name: "and",
        flags: INST_LOCKABLE,
        extensions: &[],
    },
    InstInfo {
        name: "or",
        flags: INST_LOCKABLE,
        extensions: &[],
    },
    InstInfo {
        name: "xor",
        flags: INST_LOCKABLE,
        extensions: &[],
    },
    InstInfo {
        name: "vmovups",
        flags: 0,
        extensions: &["avx"],
    },
];

/// Metadata for every AArch64 mnemonic id this crate's dispatcher
/// recognizes, indexed by [`aarch64::Mnemonic`] discriminant.
pub const AARCH64_INST_DB: &[InstInfo] = &[
    InstInfo {
        name: "mov",
        flags: 0,
        extensions: &[],
    },
    InstInfo {
        name: "movz/movk",
        flags: 0,
        extensions: &[],
    },
    InstInfo {
        name: "add",
        flags: 0,
        extensions: &[],
    },
    InstInfo {
        name: "sub",
        flags: 0,
        extensions: &[],
    },
    InstInfo {
        name: "ldr",
        flags: 0,
        extensions: &[],
    },
    InstInfo {
        name: "str",
        flags: 0,
        extensions: &[],
    },
    InstInfo {
        name: "ret",
        flags: INST_VOLATILE,
        extensions: &[],
    },
    InstInfo {
        name: "b",
        flags: INST_VOLATILE,
        extensions: &[],
    },
    InstInfo {
        name: "b.cond",
        flags: INST_VOLATILE,
        extensions: &[],
    },
    InstInfo {
        name: "bl",
        flags: INST_VOLATILE,
        extensions: &[],
    },
    InstInfo {
        name: "cbz",
        flags: INST_VOLATILE,
        extensions: &[],
    },
    InstInfo {
        name: "cbnz",
        flags: INST_VOLATILE,
        extensions: &[],
    },
    InstInfo {
        name: "adr",
        flags: 0,
        extensions: &[],
    },
    InstInfo {
        name: "adrp",
        flags: 0,
        extensions: &[],
    },
];

/// Look up `name`/`flags`/`extensions` for an x86-64 mnemonic id.
pub fn x64_info(id: x64::Mnemonic) -> &'static InstInfo {
    &X64_INST_DB[id as usize]
}

/// Look up `name`/`flags`/`extensions` for an AArch64 mnemonic id.
pub fn aarch64_info(id: aarch64::Mnemonic) -> &'static InstInfo {
    &AARCH64_INST_DB[id as usize]
}
