//! AArch64 mnemonic identifiers and the structural dispatcher, mirroring
//! [`crate::isa::x64::dispatch`]'s shape for the other architecture.

use crate::emit::assembler::Assembler;
use crate::environment::Environment;
use crate::error::CodegenResult;
use crate::isa::{Dispatch, InstId};
use crate::operand::{Cond, Operand};

use super::encoder;
use super::registers::SP_OR_ZR;

/// Dense mnemonic ids for the AArch64 forms this crate implements, in the
/// same spirit as [`crate::isa::x64::dispatch::Mnemonic`]: only what the
/// dispatcher below recognizes, not a full ISA.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Mnemonic {
    Mov = 0,
    MovImm64 = 1,
    Add = 2,
    Sub = 3,
    Ldr = 4,
    Str = 5,
    Ret = 6,
    B = 7,
    Bcond = 8,
    Bl = 9,
    Cbz = 10,
    Cbnz = 11,
    Adr = 12,
    Adrp = 13,
}

impl Mnemonic {
    /// The dense id this mnemonic is dispatched under.
    pub const fn id(self) -> InstId {
        InstId(self as u32)
    }
}

/// The AArch64 structural dispatcher.
pub struct Aarch64Dispatch;

impl Dispatch for Aarch64Dispatch {
    fn dispatch(
        asm: &mut Assembler<'_>,
        env: &Environment,
        inst_id: InstId,
        operands: &[Operand],
    ) -> CodegenResult<()> {
        let mnemonic = match inst_id.0 {
            0 => Mnemonic::Mov,
            1 => Mnemonic::MovImm64,
            2 => Mnemonic::Add,
            3 => Mnemonic::Sub,
            4 => Mnemonic::Ldr,
            5 => Mnemonic::Str,
            6 => Mnemonic::Ret,
            7 => Mnemonic::B,
            8 => Mnemonic::Bcond,
            9 => Mnemonic::Bl,
            10 => Mnemonic::Cbz,
            11 => Mnemonic::Cbnz,
            12 => Mnemonic::Adr,
            13 => Mnemonic::Adrp,
            // Forward-compatibility: an id this dispatcher doesn't know
            // about is a documented silent no-op, not an error.
            _ => {
                log::trace!("aarch64 dispatcher: no form registered for inst_id {inst_id:?}");
                return Ok(());
            }
        };

        let info = crate::inst_db::aarch64_info(mnemonic);
        for &ext in info.extensions {
            encoder::check_feature(env, inst_id, Some(ext))?;
        }

        match (mnemonic, operands) {
            (Mnemonic::Mov, [Operand::Register(dst), Operand::Register(src)]) => {
                let zr = crate::operand::Register::physical(
                    src.kind,
                    SP_OR_ZR,
                    src.size_bits,
                );
                encoder::add_sub_reg(asm.buffer_mut(), false, false, *dst, zr, *src)
            }
            (Mnemonic::MovImm64, [Operand::Register(dst), Operand::Immediate(imm)]) => {
                encoder::movimm64(asm.buffer_mut(), *dst, imm.value as u64)
            }
            (Mnemonic::Add, [Operand::Register(dst), Operand::Register(lhs), Operand::Register(rhs)]) => {
                encoder::add_sub_reg(asm.buffer_mut(), false, false, *dst, *lhs, *rhs)
            }
            (Mnemonic::Add, [Operand::Register(dst), Operand::Register(lhs), Operand::Immediate(imm)]) => {
                encoder::add_sub_imm(asm.buffer_mut(), false, false, *dst, *lhs, *imm)
            }
            (Mnemonic::Sub, [Operand::Register(dst), Operand::Register(lhs), Operand::Register(rhs)]) => {
                encoder::add_sub_reg(asm.buffer_mut(), true, false, *dst, *lhs, *rhs)
            }
            (Mnemonic::Sub, [Operand::Register(dst), Operand::Register(lhs), Operand::Immediate(imm)]) => {
                encoder::add_sub_imm(asm.buffer_mut(), true, false, *dst, *lhs, *imm)
            }
            (Mnemonic::Ldr, [Operand::Register(rt), Operand::Memory(m)]) => {
                let base = m.base.ok_or(crate::error::CodegenError::InvalidOperand {
                    inst_id: Mnemonic::Ldr.id(),
                    operand_index: 1,
                    reason: "AArch64 load/store requires a base register",
                })?;
                encoder::ldr_str_unsigned_offset(asm.buffer_mut(), true, *rt, base, m.displacement)
            }
            (Mnemonic::Str, [Operand::Register(rt), Operand::Memory(m)]) => {
                let base = m.base.ok_or(crate::error::CodegenError::InvalidOperand {
                    inst_id: Mnemonic::Str.id(),
                    operand_index: 1,
                    reason: "AArch64 load/store requires a base register",
                })?;
                encoder::ldr_str_unsigned_offset(asm.buffer_mut(), false, *rt, base, m.displacement)
            }
            (Mnemonic::Ret, []) => {
                encoder::ret(asm.buffer_mut(), super::registers::X30);
                Ok(())
            }
            (Mnemonic::Ret, [Operand::Register(rn)]) => {
                encoder::ret(asm.buffer_mut(), rn.id);
                Ok(())
            }
            (Mnemonic::B, [Operand::Label(label)]) => {
                let fixup = encoder::branch_unconditional(asm.buffer_mut(), false, *label);
                asm.add_fixup(fixup);
                Ok(())
            }
            (Mnemonic::Bl, [Operand::Label(label)]) => {
                let fixup = encoder::branch_unconditional(asm.buffer_mut(), true, *label);
                asm.add_fixup(fixup);
                Ok(())
            }
            (Mnemonic::Bcond, [Operand::Cond(Cond::Aarch64(cc)), Operand::Label(label)]) => {
                let fixup = encoder::branch_cond(asm.buffer_mut(), *cc, *label);
                asm.add_fixup(fixup);
                Ok(())
            }
            (Mnemonic::Cbz, [Operand::Register(rt), Operand::Label(label)]) => {
                let fixup = encoder::branch_cbz(asm.buffer_mut(), false, *rt, *label)?;
                asm.add_fixup(fixup);
                Ok(())
            }
            (Mnemonic::Cbnz, [Operand::Register(rt), Operand::Label(label)]) => {
                let fixup = encoder::branch_cbz(asm.buffer_mut(), true, *rt, *label)?;
                asm.add_fixup(fixup);
                Ok(())
            }
            (Mnemonic::Adr, [Operand::Register(rd), Operand::Label(label)]) => {
                let fixup = encoder::adr(asm.buffer_mut(), false, *rd, *label);
                asm.add_fixup(fixup);
                Ok(())
            }
            (Mnemonic::Adrp, [Operand::Register(rd), Operand::Label(label)]) => {
                let fixup = encoder::adr(asm.buffer_mut(), true, *rd, *label);
                asm.add_fixup(fixup);
                Ok(())
            }
            _ => {
                log::trace!(
                    "aarch64 dispatcher: no operand-shape match for {mnemonic:?} with {operands:?}"
                );
                Ok(())
            }
        }
    }
}
