//! Function frame layout and prologue/epilogue emission (spec §4.6):
//! `x86-64`: `push rbp; mov rbp, rsp; sub rsp, #frame_size` / the mirror
//! image on exit. `AArch64`: decomposed save/restore of the `x29`/`x30`
//! pair (this crate's `Mnemonic` set has no `Stp`/`Ldp`) around the same
//! `sub sp, sp, #frame_size` / mirror shape.
//!
//! Both are built as [`Node`] lists over mnemonics the architecture's own
//! [`crate::isa::Dispatch`] already recognizes, so [`Compiler::finish`]
//! can splice them directly into the materialized body without a second,
//! byte-level emission path.
//!
//! [`Compiler::finish`]: crate::emit::compiler::Compiler::finish

use smallvec::SmallVec;

use crate::emit::node::Node;
use crate::environment::Arch;
use crate::isa::aarch64::registers as a64reg;
use crate::isa::aarch64::Mnemonic as A64Mn;
use crate::isa::x64::registers as x64reg;
use crate::isa::x64::Mnemonic as X64Mn;
use crate::operand::{Immediate, Memory, Operand, RegKind, Register};

use super::call_conv::CallConv;

/// A function's frame: the calling convention it was built for, and how
/// many bytes of locally-owned stack (the register allocator's spill
/// area, 16-byte aligned) it needs below the saved frame pointer.
#[derive(Debug, Clone, Copy)]
pub struct FuncFrame {
    /// The calling convention this frame was built for.
    pub call_conv: CallConv,
    /// Bytes of locally-owned stack, 16-byte aligned.
    pub frame_size: u32,
}

impl FuncFrame {
    /// Build a frame whose `frame_size` is `spill_area_size` rounded up
    /// to 16 bytes.
    pub fn new(call_conv: CallConv, spill_area_size: u32) -> Self {
        FuncFrame {
            call_conv,
            frame_size: (spill_area_size + 15) / 16 * 16,
        }
    }

    /// The standard prologue for `arch`, as a node list ready to prepend
    /// to a materialized function body.
    pub fn prologue_nodes(&self, arch: Arch) -> Vec<Node> {
        match arch {
            Arch::X86 | Arch::X86_64 => {
                let rbp = gp64(x64reg::RBP);
                let rsp = gp64(x64reg::RSP);
                let mut nodes = vec![
                    inst(X64Mn::Push.id(), &[Operand::Register(rbp)]),
                    inst(X64Mn::Mov.id(), &[Operand::Register(rbp), Operand::Register(rsp)]),
                ];
                if self.frame_size > 0 {
                    nodes.push(inst(
                        X64Mn::Sub.id(),
                        &[Operand::Register(rsp), Operand::Immediate(Immediate::new(self.frame_size as i64))],
                    ));
                }
                nodes
            }
            Arch::Aarch64 => {
                let sp = gp64(a64reg::SP_OR_ZR);
                let fp = gp64(a64reg::X29);
                let lr = gp64(a64reg::X30);
                let mut nodes = vec![
                    // Decomposed `stp x29, x30, [sp, #-16]!`.
                    inst(
                        A64Mn::Sub.id(),
                        &[Operand::Register(sp), Operand::Register(sp), Operand::Immediate(Immediate::new(16))],
                    ),
                    inst(
                        A64Mn::Str.id(),
                        &[Operand::Register(fp), Operand::Memory(Memory::base_offset(sp, 0, 64))],
                    ),
                    inst(
                        A64Mn::Str.id(),
                        &[Operand::Register(lr), Operand::Memory(Memory::base_offset(sp, 8, 64))],
                    ),
                    // `mov x29, sp`, encoded as `add x29, sp, #0` since `sp`
                    // (register 31) means XZR, not SP, in the shifted-register
                    // form the plain `Mov` mnemonic would otherwise pick.
                    inst(
                        A64Mn::Add.id(),
                        &[Operand::Register(fp), Operand::Register(sp), Operand::Immediate(Immediate::new(0))],
                    ),
                ];
                if self.frame_size > 0 {
                    nodes.push(inst(
                        A64Mn::Sub.id(),
                        &[Operand::Register(sp), Operand::Register(sp), Operand::Immediate(Immediate::new(self.frame_size as i64))],
                    ));
                }
                nodes
            }
        }
    }

    /// The standard epilogue for `arch`, mirroring
    /// [`Self::prologue_nodes`] in reverse order. Does not include the
    /// trailing `ret` — the caller appends that separately.
    pub fn epilogue_nodes(&self, arch: Arch) -> Vec<Node> {
        match arch {
            Arch::X86 | Arch::X86_64 => {
                let rbp = gp64(x64reg::RBP);
                let rsp = gp64(x64reg::RSP);
                vec![
                    inst(X64Mn::Mov.id(), &[Operand::Register(rsp), Operand::Register(rbp)]),
                    inst(X64Mn::Pop.id(), &[Operand::Register(rbp)]),
                ]
            }
            Arch::Aarch64 => {
                let sp = gp64(a64reg::SP_OR_ZR);
                let fp = gp64(a64reg::X29);
                let lr = gp64(a64reg::X30);
                let mut nodes = Vec::new();
                if self.frame_size > 0 {
                    nodes.push(inst(
                        A64Mn::Add.id(),
                        &[Operand::Register(sp), Operand::Register(sp), Operand::Immediate(Immediate::new(self.frame_size as i64))],
                    ));
                }
                // Decomposed `ldp x29, x30, [sp], #16`.
                nodes.push(inst(
                    A64Mn::Ldr.id(),
                    &[Operand::Register(fp), Operand::Memory(Memory::base_offset(sp, 0, 64))],
                ));
                nodes.push(inst(
                    A64Mn::Ldr.id(),
                    &[Operand::Register(lr), Operand::Memory(Memory::base_offset(sp, 8, 64))],
                ));
                nodes.push(inst(
                    A64Mn::Add.id(),
                    &[Operand::Register(sp), Operand::Register(sp), Operand::Immediate(Immediate::new(16))],
                ));
                nodes
            }
        }
    }
}

fn inst(inst_id: crate::isa::InstId, operands: &[Operand]) -> Node {
    Node::Inst {
        inst_id,
        operands: SmallVec::from_slice(operands),
    }
}

fn gp64(id: u32) -> Register {
    Register::physical(RegKind::Gp, id, 64)
}
