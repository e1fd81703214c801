//! The x86-64 Legacy/VEX encoding paths (spec §4.3).
//!
//! Byte layout composed in order: optional segment override → operand-size
//! prefix → address-size prefix → REX byte → opcode (1–3 bytes) → ModR/M →
//! SIB (if needed) → displacement (0/8/32) → immediate (0/8/16/32/64).
//! The VEX path replaces the REX byte (and any two/three-byte `0F`/`0F38`/
//! `0F3A` opcode-map prefix) with a 3-byte VEX prefix ([`emit_vex3`]); this
//! crate's VEX support is limited to the handful of forms its dispatcher
//! actually emits (`vmovups`, gated on the `avx` feature), matching the
//! "behaviorally in scope, bit-for-bit tables are data" framing of spec
//! §1 — a full AVX/AVX-512 opcode map is not reproduced here, and the
//! 2-byte VEX form (valid only when `map == 1` and `w == 0`) is not
//! implemented since the 3-byte form covers every case this crate emits.

use crate::buffer::CodeBuffer;
use crate::environment::Environment;
use crate::error::{CodegenError, CodegenResult};
use crate::fixup::{Fixup, FixupKind};
use crate::isa::InstId;
use crate::operand::{AddrMode, Immediate, Memory, Operand, Register};

use super::registers::needs_rex_bit;

/// REX prefix bits, composed incrementally as operands are visited.
#[derive(Debug, Default, Clone, Copy)]
pub struct RexBits {
    /// REX.W: selects the 64-bit operand size.
    pub w: bool,
    /// REX.R: extends ModR/M `reg`.
    pub r: bool,
    /// REX.X: extends SIB `index`.
    pub x: bool,
    /// REX.B: extends ModR/M `rm`, SIB `base`, or opcode `reg`.
    pub b: bool,
}

impl RexBits {
    fn byte(self) -> u8 {
        0x40 | (self.w as u8) << 3 | (self.r as u8) << 2 | (self.x as u8) << 1 | (self.b as u8)
    }

    fn is_needed(self, any_new_byte_reg: bool) -> bool {
        self.w || self.r || self.x || self.b || any_new_byte_reg
    }
}

/// Emit a REX byte if any of `w/r/x/b` are set. `force` additionally
/// emits it for register ids that alias `ah/ch/dh/bh` without REX
/// (operand-size-8 forms using `spl/bpl/sil/dil`).
pub fn emit_rex(buf: &mut CodeBuffer, rex: RexBits, force: bool) {
    if rex.is_needed(force) {
        buf.push_u8(rex.byte());
    }
}

/// Emit `mod=11, reg=reg_field, rm=rm_reg` (register/register form), and
/// fold the high bits of both ids into `rex`.
pub fn modrm_reg_reg(buf: &mut CodeBuffer, rex: &mut RexBits, reg_field: u8, rm_reg: u32) {
    rex.r |= reg_field >= 8;
    rex.b |= needs_rex_bit(rm_reg);
    let modrm = 0b1100_0000 | ((reg_field & 0x7) << 3) | ((rm_reg & 0x7) as u8);
    buf.push_u8(modrm);
}

/// Emit `mod`/ModRM(/SIB)(/disp) for a memory operand paired with
/// `reg_field` (either a real register's low 3 bits, or a `/digit`
/// opcode extension). Chooses the shortest displacement encoding (no
/// disp, disp8, disp32), and selects RIP-relative addressing when the
/// memory operand's `addr_mode` is `PcRelative`. Handles the `rsp`/`r12`
/// base (forces a SIB byte with `index=100,scale=1`, i.e. "no index")
/// and `rbp`/`r13` base with zero displacement (forces a disp8 of `0`,
/// since `mod=00,rm=101` is the RIP-relative escape on those ids).
pub fn modrm_mem(
    buf: &mut CodeBuffer,
    rex: &mut RexBits,
    reg_field: u8,
    mem: &Memory,
) -> CodegenResult<()> {
    if mem.addr_mode == AddrMode::PcRelative {
        rex.r |= reg_field >= 8;
        let modrm = 0b0000_0101 | ((reg_field & 0x7) << 3);
        buf.push_u8(modrm);
        buf.push_u32(mem.displacement as u32);
        return Ok(());
    }

    let base = mem.base.ok_or(CodegenError::InvalidOperand {
        inst_id: InstId(0),
        operand_index: 0,
        reason: "memory operand requires a base register outside PC-relative mode",
    })?;
    rex.r |= reg_field >= 8;
    rex.b |= needs_rex_bit(base.id);

    let base_low = (base.id & 0x7) as u8;
    let needs_sib = mem.index.is_some() || base_low == 0b100; // rsp/r12 escape
    let rbp_like_zero_disp = base_low == 0b101 && mem.displacement == 0; // rbp/r13 escape

    let disp_mode: u8 = if rbp_like_zero_disp {
        0b01 // force disp8 = 0
    } else if mem.displacement == 0 {
        0b00
    } else if i8::try_from(mem.displacement).is_ok() {
        0b01
    } else {
        0b10
    };

    let modrm_rm = if needs_sib { 0b100 } else { base_low };
    let modrm = (disp_mode << 6) | ((reg_field & 0x7) << 3) | modrm_rm;
    buf.push_u8(modrm);

    if needs_sib {
        let (index_bits, scale_bits) = match mem.index {
            Some(index) => {
                rex.x |= needs_rex_bit(index.id);
                let scale_bits = match mem.scale {
                    1 => 0b00,
                    2 => 0b01,
                    4 => 0b10,
                    8 => 0b11,
                    other => {
                        return Err(CodegenError::InvalidOperand {
                            inst_id: InstId(0),
                            operand_index: 1,
                            reason: scale_error(other),
                        })
                    }
                };
                ((index.id & 0x7) as u8, scale_bits)
            }
            None => (0b100, 0b00), // "no index"
        };
        let sib = (scale_bits << 6) | (index_bits << 3) | base_low;
        buf.push_u8(sib);
    }

    match disp_mode {
        0b01 => buf.push_u8(mem.displacement as i8 as u8),
        0b10 => buf.push_u32(mem.displacement as u32),
        _ => {}
    }
    Ok(())
}

fn scale_error(_scale: u8) -> &'static str {
    "memory index scale must be one of {1, 2, 4, 8}"
}

/// Emit `reg_field` (a ModR/M `reg` sub-field, used for `/digit` opcode
/// extensions) against either a register or memory `rm` operand.
pub fn modrm_rm(
    buf: &mut CodeBuffer,
    rex: &mut RexBits,
    reg_field: u8,
    rm: &Operand,
) -> CodegenResult<()> {
    match rm {
        Operand::Register(r) => {
            modrm_reg_reg(buf, rex, reg_field, r.id);
            Ok(())
        }
        Operand::Memory(m) => modrm_mem(buf, rex, reg_field, m),
        _ => Err(CodegenError::InvalidOperand {
            inst_id: InstId(0),
            operand_index: 1,
            reason: "expected a register or memory operand",
        }),
    }
}

/// Emit an immediate of the given byte width, little-endian.
pub fn emit_imm(buf: &mut CodeBuffer, imm: Immediate, bytes: u8) -> CodegenResult<()> {
    match bytes {
        1 => {
            if !imm.fits_signed(8) {
                return Err(CodegenError::InvalidImmediate {
                    inst_id: InstId(0),
                    value: imm.value,
                    bits: 8,
                });
            }
            buf.push_u8(imm.value as i8 as u8);
        }
        2 => {
            if !imm.fits_signed(16) {
                return Err(CodegenError::InvalidImmediate {
                    inst_id: InstId(0),
                    value: imm.value,
                    bits: 16,
                });
            }
            buf.push_u16(imm.value as i16 as u16);
        }
        4 => {
            if !imm.fits_signed(32) {
                return Err(CodegenError::InvalidImmediate {
                    inst_id: InstId(0),
                    value: imm.value,
                    bits: 32,
                });
            }
            buf.push_u32(imm.value as i32 as u32);
        }
        8 => buf.push_u64(imm.value as u64),
        other => unreachable!("unsupported immediate width {other}"),
    }
    Ok(())
}

/// Short-vs-long branch selection (spec §4.3 "Branches"): if `target` is
/// already bound and the displacement from the rel8 anchor fits, emit
/// the short form. Otherwise — including every *unbound* forward branch
/// — always emit the long form and record a `rel32` fixup; this crate
/// never relaxes a long-form branch back down, matching the "no branch
/// relaxation" non-goal and the explicit Open Question resolution in
/// spec §9 ("maintain that decision: always emit rel32 for unbound
/// forward branches").
pub fn short_form_fits(buf_len: u32, bound_target: Option<u32>) -> bool {
    match bound_target {
        Some(target) => {
            // rel8 anchor is the end of the branch instruction, which for
            // the short form is `buf_len + 2` (one opcode byte + one disp8
            // byte) relative to the opcode about to be emitted.
            let anchor = buf_len as i64 + 2;
            let delta = target as i64 - anchor;
            (-128..=127).contains(&delta)
        }
        None => false,
    }
}

/// Record a `rel32` fixup for the 4-byte field that the caller is about
/// to reserve at the buffer's current end.
pub fn rel32_fixup(label: crate::operand::LabelId, at_offset: u32) -> Fixup {
    Fixup {
        at_offset,
        label,
        kind: FixupKind::X86Rel32,
        addend: 0,
    }
}

/// Validation floor shared by every legacy-path encode function: operand
/// register class/size must match, and (when applicable) the
/// environment must have the required feature enabled.
pub fn check_feature(env: &Environment, inst_id: InstId, needs: Option<&'static str>) -> CodegenResult<()> {
    if let Some(ext) = needs {
        let has = match ext {
            "sse2" => env.features.sse2(),
            "sse4.1" => env.features.sse4_1(),
            "avx" => env.features.avx(),
            "avx2" => env.features.avx2(),
            "avx512f" => env.features.avx512f(),
            "fma" => env.features.fma(),
            "bmi" => env.features.bmi(),
            "aes" => env.features.aes(),
            "sha2" => env.features.sha2(),
            _ => true,
        };
        if !has {
            return Err(CodegenError::FeatureNotEnabled {
                inst_id,
                extension: ext,
            });
        }
    }
    Ok(())
}

/// A 3-byte VEX prefix's fields (spec §4.3). `vvvv` is the raw register
/// id (0 when unused); [`emit_vex3`] stores its ones'-complement, so an
/// unused `vvvv` of `0` correctly produces the hardware's "1111 unused"
/// encoding.
#[derive(Debug, Default, Clone, Copy)]
pub struct VexBits {
    /// Inverted REX.R equivalent: extends ModR/M `reg`.
    pub r: bool,
    /// Inverted REX.X equivalent: extends SIB `index`.
    pub x: bool,
    /// Inverted REX.B equivalent: extends ModR/M `rm` or SIB `base`.
    pub b: bool,
    /// Opcode map select: `1` = `0F`, `2` = `0F38`, `3` = `0F3A`.
    pub map: u8,
    /// REX.W equivalent: selects the 64-bit operand-size variant where applicable.
    pub w: bool,
    /// The second source register id (0 when unused), NDS/NDD operand.
    pub vvvv: u32,
    /// Vector length: `false` = 128-bit, `true` = 256-bit.
    pub l: bool,
    /// Mandatory-prefix select: `0` = none, `1` = `66`, `2` = `F3`, `3` = `F2`.
    pub pp: u8,
}

/// Emit a 3-byte VEX prefix (`C4` form).
pub fn emit_vex3(buf: &mut CodeBuffer, vex: VexBits) {
    buf.push_u8(0xC4);
    let byte1 =
        ((!vex.r as u8) << 7) | ((!vex.x as u8) << 6) | ((!vex.b as u8) << 5) | (vex.map & 0x1f);
    buf.push_u8(byte1);
    let not_vvvv = (!vex.vvvv as u8) & 0xf;
    let byte2 = ((vex.w as u8) << 7) | (not_vvvv << 3) | ((vex.l as u8) << 2) | (vex.pp & 0x3);
    buf.push_u8(byte2);
}

/// Whether `id` (a GP register id, 0..=15) needs the REX byte forced
/// even with no other REX bit set, because its 8-bit form would
/// otherwise alias `ah/ch/dh/bh` (ids 4..=7 under `size_bits == 8`).
pub fn byte_reg_needs_rex(reg: Register) -> bool {
    reg.size_bits == 8 && (4..8).contains(&reg.id)
}
