//! Per-architecture encoders and the mnemonic identifier space (spec
//! §4.1, §4.3).
//!
//! An [`InstId`] is a dense, architecture-scoped integer naming one
//! mnemonic family (one id per mnemonic, not per operand-shape
//! encoding). The dispatcher for each architecture walks operand kinds
//! and sizes and picks the first form whose operand pattern accepts all
//! inputs; if none match, it is a documented no-op rather than an error
//! (kept as a contract per spec §9, logged at `log::trace!`).

use crate::emit::assembler::Assembler;
use crate::environment::Environment;
use crate::error::CodegenResult;
use crate::operand::Operand;

pub mod aarch64;
pub mod x64;

/// A dense, per-architecture mnemonic id. The same numeric value means
/// different mnemonics on different architectures; callers must pair an
/// `InstId` with the `Arch` it was produced for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstId(pub u32);

/// Metadata about one mnemonic family, analogous to the `(id ->
/// mnemonic_name, flag_bits, extension_tags)` oracle of spec §4.1/§6.
/// The real table is an out-of-scope, offline-generated artifact; this
/// crate carries a small hand-written one covering only the mnemonics
/// its own encoders implement.
#[derive(Debug, Clone, Copy)]
pub struct InstInfo {
    /// The mnemonic's canonical name, e.g. `"mov"`.
    pub name: &'static str,
    /// Bitflags: `LOCKABLE`, `REPABLE`, `VOLATILE`, `ARCH_CONSTRAINT`.
    pub flags: u32,
    /// CPU feature extensions this mnemonic's encodings may require.
    pub extensions: &'static [&'static str],
}

/// Bit in [`InstInfo::flags`]: this instruction accepts the `lock` prefix.
pub const INST_LOCKABLE: u32 = 1 << 0;
/// Bit in [`InstInfo::flags`]: this instruction accepts a `rep`/`repne`
/// prefix.
pub const INST_REPABLE: u32 = 1 << 1;
/// Bit in [`InstInfo::flags`]: this instruction has side effects beyond
/// its operands (e.g. touches flags implicitly) and must not be
/// reordered by any future peephole pass.
pub const INST_VOLATILE: u32 = 1 << 2;
/// Bit in [`InstInfo::flags`]: only a subset of operand sizes is legal
/// regardless of what the structural operand-shape match would accept.
pub const INST_ARCH_CONSTRAINT: u32 = 1 << 3;

/// The dispatcher contract shared by both architectures: given an
/// emitter, an instruction id, and its operand list, select the encoding
/// whose operand shape matches and write it into the assembler's
/// `CodeHolder`. Matching is structural and silently does nothing if no
/// form matches the current `Environment`/operand shapes — this is a
/// deliberate forward-compatibility mechanism, not a failure, and is
/// distinct from `InvalidOperand`, which is reserved for shapes the
/// dispatcher *did* match to a form that then rejects the operands'
/// concrete values (e.g. an immediate too wide for its field).
pub trait Dispatch {
    /// Encode `inst_id` over `operands` into `asm`'s buffer, consulting
    /// `env` for feature gating. Returns `Ok(())` both when a form
    /// matched and encoded successfully, and when no form matched (the
    /// silent no-op) — those are told apart only by the caller not
    /// observing any bytes appended, never by the `Result`.
    fn dispatch(
        asm: &mut Assembler<'_>,
        env: &Environment,
        inst_id: InstId,
        operands: &[Operand],
    ) -> CodegenResult<()>;
}
