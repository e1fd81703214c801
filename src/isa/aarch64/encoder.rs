//! The AArch64 encoder: every instruction is a single 32-bit word,
//! composed by OR-ing field masks together (spec §4.3).

use crate::buffer::CodeBuffer;
use crate::environment::Environment;
use crate::error::{CodegenError, CodegenResult};
use crate::fixup::{Fixup, FixupKind};
use crate::isa::InstId;
use crate::operand::{Aarch64Cond, Immediate, LabelId, Register};

/// `sf` bit: 1 selects the 64-bit (`X`) register form, 0 selects 32-bit
/// (`W`).
fn sf_bit(size_bits: u16) -> CodegenResult<u32> {
    match size_bits {
        64 => Ok(1),
        32 => Ok(0),
        _ => Err(CodegenError::InvalidOperand {
            inst_id: InstId(0),
            operand_index: 0,
            reason: "AArch64 GP operand size must be 32 or 64 bits",
        }),
    }
}

/// Data-processing immediate: `ADD`/`SUB` (immediate), optionally
/// shifted left by 12. `sf | op | S | 0x22 << 23 | sh | imm12 | Rn | Rd`.
pub fn add_sub_imm(
    buf: &mut CodeBuffer,
    is_sub: bool,
    set_flags: bool,
    rd: Register,
    rn: Register,
    imm: Immediate,
) -> CodegenResult<()> {
    let sf = sf_bit(rd.size_bits)?;
    let (imm12, sh) = split_imm12(imm)?;
    let word = (sf << 31)
        | ((is_sub as u32) << 30)
        | ((set_flags as u32) << 29)
        | (0x22 << 23)
        | (sh << 22)
        | (imm12 << 10)
        | ((rn.id & 0x1f) << 5)
        | (rd.id & 0x1f);
    buf.push_u32(word);
    Ok(())
}

fn split_imm12(imm: Immediate) -> CodegenResult<(u32, u32)> {
    if imm.value < 0 || imm.value > 0xFFF {
        if (0..(0xFFF << 12)).contains(&imm.value) && imm.value & 0xFFF == 0 {
            return Ok(((imm.value >> 12) as u32, 1));
        }
        return Err(CodegenError::InvalidImmediate {
            inst_id: InstId(0),
            value: imm.value,
            bits: 12,
        });
    }
    Ok((imm.value as u32, 0))
}

/// Data-processing register: `ADD`/`SUB` (shifted register), no shift.
/// `sf | op | S | 0x0B << 24 | shift_type | 0 | Rm | imm6 | Rn | Rd`.
pub fn add_sub_reg(
    buf: &mut CodeBuffer,
    is_sub: bool,
    set_flags: bool,
    rd: Register,
    rn: Register,
    rm: Register,
) -> CodegenResult<()> {
    let sf = sf_bit(rd.size_bits)?;
    let word = (sf << 31)
        | ((is_sub as u32) << 30)
        | ((set_flags as u32) << 29)
        | (0x0B << 24)
        | ((rm.id & 0x1f) << 16)
        | ((rn.id & 0x1f) << 5)
        | (rd.id & 0x1f);
    buf.push_u32(word);
    Ok(())
}

/// Load/store (unsigned offset): `size | 0x39 << 24 | load | imm12 | Rn |
/// Rt`, with `imm12 = byte_offset >> scale`. Rejects misaligned or
/// out-of-range offsets.
pub fn ldr_str_unsigned_offset(
    buf: &mut CodeBuffer,
    is_load: bool,
    rt: Register,
    rn_base: Register,
    byte_offset: i32,
) -> CodegenResult<()> {
    let (size, scale) = match rt.size_bits {
        64 => (0b11u32, 3u32),
        32 => (0b10u32, 2u32),
        _ => {
            return Err(CodegenError::InvalidOperand {
                inst_id: InstId(0),
                operand_index: 0,
                reason: "AArch64 load/store operand size must be 32 or 64 bits",
            })
        }
    };
    if byte_offset < 0 || (byte_offset as u32) & ((1 << scale) - 1) != 0 {
        return Err(CodegenError::InvalidOperand {
            inst_id: InstId(0),
            operand_index: 1,
            reason: "memory displacement is negative or misaligned for this access size",
        });
    }
    let imm12 = (byte_offset as u32) >> scale;
    if imm12 > 0xFFF {
        return Err(CodegenError::InvalidOperand {
            inst_id: InstId(0),
            operand_index: 1,
            reason: "memory displacement exceeds the unsigned-offset form's 12-bit field",
        });
    }
    let word = (size << 30)
        | (0x39 << 24)
        | ((is_load as u32) << 22)
        | (imm12 << 10)
        | ((rn_base.id & 0x1f) << 5)
        | (rt.id & 0x1f);
    buf.push_u32(word);
    Ok(())
}

/// `RET Xn` (defaults to `x30`/LR).
pub fn ret(buf: &mut CodeBuffer, rn: u32) {
    buf.push_u32(0xD65F_0000 | ((rn & 0x1f) << 5));
}

/// `MOVZ`/`MOVK` word with the immediate bits left at 0, the placeholder
/// that `movimm64`'s caller patches in directly (no deferred fixup is
/// needed here — the 16-bit lane value is always known immediately).
fn movz_movk_word(is_movk: bool, sf: u32, hw: u32, imm16: u32, rd: u32) -> u32 {
    let opc = if is_movk { 0b11 } else { 0b10 };
    (sf << 31) | (opc << 29) | (0b100101 << 23) | (hw << 21) | (imm16 << 5) | (rd & 0x1f)
}

/// The canonical 1–4 instruction materialization of a 64-bit immediate
/// (spec §4.3 `movImm64`): decompose `v` into four 16-bit lanes, emit
/// `MOVZ` for lane 0, then `MOVK` for each nonzero upper lane with `hw =
/// lane_index`.
pub fn movimm64(buf: &mut CodeBuffer, rd: Register, value: u64) -> CodegenResult<()> {
    let sf = sf_bit(rd.size_bits)?;
    let lanes = [
        (value & 0xFFFF) as u32,
        ((value >> 16) & 0xFFFF) as u32,
        ((value >> 32) & 0xFFFF) as u32,
        ((value >> 48) & 0xFFFF) as u32,
    ];
    buf.push_u32(movz_movk_word(false, sf, 0, lanes[0], rd.id));
    for (i, &lane) in lanes.iter().enumerate().skip(1) {
        if lane != 0 {
            buf.push_u32(movz_movk_word(true, sf, i as u32, lane, rd.id));
        }
    }
    Ok(())
}

/// `B`/`BL` placeholder word (imm26 left at 0) plus the `branch26`
/// fixup, anchored at the start of this instruction per spec's AArch64
/// PC-anchor convention.
pub fn branch_unconditional(buf: &mut CodeBuffer, is_link: bool, label: LabelId) -> Fixup {
    let at_offset = buf.len();
    let word = ((is_link as u32) << 31) | (0x05 << 26);
    buf.push_u32(word);
    Fixup {
        at_offset,
        label,
        kind: FixupKind::A64Branch26,
        addend: 0,
    }
}

/// `B.cond` placeholder word plus the `branch19` fixup.
pub fn branch_cond(buf: &mut CodeBuffer, cond: Aarch64Cond, label: LabelId) -> Fixup {
    let at_offset = buf.len();
    let word = (0x2A << 25) | (cond as u32);
    buf.push_u32(word);
    Fixup {
        at_offset,
        label,
        kind: FixupKind::A64Branch19,
        addend: 0,
    }
}

/// `CBZ`/`CBNZ` placeholder word plus the `branch19` fixup.
pub fn branch_cbz(buf: &mut CodeBuffer, is_nonzero: bool, rt: Register, label: LabelId) -> CodegenResult<Fixup> {
    let sf = sf_bit(rt.size_bits)?;
    let at_offset = buf.len();
    let word = (sf << 31) | (0x1A << 25) | ((is_nonzero as u32) << 24) | (rt.id & 0x1f);
    buf.push_u32(word);
    Ok(Fixup {
        at_offset,
        label,
        kind: FixupKind::A64Branch19,
        addend: 0,
    })
}

/// `STP`/`LDP` (pre-index or post-index, 64-bit GP pair), the form this
/// crate's prologue/epilogue uses to save/restore `x29`/`x30` (spec
/// §4.6). `imm` is the signed byte offset, must be a multiple of 8.
fn stp_ldp(
    buf: &mut CodeBuffer,
    is_load: bool,
    pre_index: bool,
    rt: u32,
    rt2: u32,
    rn: u32,
    imm: i32,
) -> CodegenResult<()> {
    if imm % 8 != 0 {
        return Err(CodegenError::InvalidOperand {
            inst_id: InstId(0),
            operand_index: 2,
            reason: "STP/LDP immediate offset must be a multiple of 8",
        });
    }
    let imm7 = imm / 8;
    if !(-64..=63).contains(&imm7) {
        return Err(CodegenError::InvalidOperand {
            inst_id: InstId(0),
            operand_index: 2,
            reason: "STP/LDP immediate offset exceeds the imm7 field",
        });
    }
    let variant = if pre_index { 0b011 } else { 0b001 };
    let word = (0b10 << 30)
        | (0b101 << 27)
        | (variant << 23)
        | ((is_load as u32) << 22)
        | (((imm7 as u32) & 0x7f) << 15)
        | ((rt2 & 0x1f) << 10)
        | ((rn & 0x1f) << 5)
        | (rt & 0x1f);
    buf.push_u32(word);
    Ok(())
}

/// `STP Xt, Xt2, [Xn, #imm]!` (pre-index), used to push the frame
/// pointer/link register pair at function entry.
pub fn stp_pre(buf: &mut CodeBuffer, rt: u32, rt2: u32, rn: u32, imm: i32) -> CodegenResult<()> {
    stp_ldp(buf, false, true, rt, rt2, rn, imm)
}

/// `LDP Xt, Xt2, [Xn], #imm` (post-index), used to pop the frame
/// pointer/link register pair at function exit.
pub fn ldp_post(buf: &mut CodeBuffer, rt: u32, rt2: u32, rn: u32, imm: i32) -> CodegenResult<()> {
    stp_ldp(buf, true, false, rt, rt2, rn, imm)
}

/// Validation floor shared by every AArch64 encode function: the active
/// environment must have `needs`'s CPU feature enabled, mirroring
/// [`crate::isa::x64::encoder::check_feature`].
pub fn check_feature(env: &Environment, inst_id: InstId, needs: Option<&'static str>) -> CodegenResult<()> {
    if let Some(ext) = needs {
        let has = match ext {
            "neon" => env.features.neon(),
            "crc32" => env.features.crc32(),
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

/// `ADR`/`ADRP` placeholder word plus the `adr`/`adrp` fixup.
pub fn adr(buf: &mut CodeBuffer, is_page: bool, rd: Register, label: LabelId) -> Fixup {
    let at_offset = buf.len();
    let word = ((is_page as u32) << 31) | (0x10 << 24) | (rd.id & 0x1f);
    buf.push_u32(word);
    Fixup {
        at_offset,
        label,
        kind: FixupKind::A64Adr { page: is_page },
        addend: 0,
    }
}
