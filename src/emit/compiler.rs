//! The Compiler tier: a [`Builder`] plus virtual registers and the
//! linear-scan allocator (spec §3, §9 "tier 3"). `Compiler` records the
//! same node list `Builder` does, but hands out virtual `Register`
//! operands instead of requiring physical ones up front; [`Compiler::finish`]
//! runs allocation and spill materialization, splices in the calling
//! convention's prologue/epilogue and argument bindings, and returns a
//! plain `Builder` over the rewritten, all-physical node list, ready to
//! [`Builder::serialize_to`] into an `Assembler`.

use smallvec::SmallVec;

use crate::abi::{CallConv, FuncFrame, Signature};
use crate::emit::builder::Builder;
use crate::emit::node::Node;
use crate::error::{CodegenError, CodegenResult};
use crate::isa::InstId;
use crate::operand::{LabelId, Operand, RegKind, Register, VIRT_BASE};
use crate::regalloc::{allocate, build_intervals, materialize, VirtReg};

/// Records instructions against virtual registers and lowers them to
/// physical registers (spilling as needed) on [`Compiler::finish`].
pub struct Compiler {
    builder: Builder,
    virt_regs: Vec<VirtReg>,
    next_virt_id: u32,
    call_conv: CallConv,
    signature: Option<Signature>,
    func_ended: bool,
    arg_bindings: Vec<(Register, Register)>,
}

impl Compiler {
    /// A fresh compiler targeting `call_conv`.
    pub fn new(call_conv: CallConv) -> Self {
        Compiler {
            builder: Builder::new(),
            virt_regs: Vec::new(),
            next_virt_id: 0,
            call_conv,
            signature: None,
            func_ended: false,
            arg_bindings: Vec::new(),
        }
    }

    /// Open a function scope with `signature`, the shape [`Self::set_arg`]
    /// validates `arg_index` against (spec §4.6). May only be called once
    /// per `Compiler`.
    pub fn add_func(&mut self, signature: Signature) -> CodegenResult<()> {
        if self.signature.is_some() {
            return Err(CodegenError::InvalidState(
                "add_func called twice on the same Compiler",
            ));
        }
        self.signature = Some(signature);
        Ok(())
    }

    /// Close the function scope opened by [`Self::add_func`]. No further
    /// [`Self::set_arg`] calls are accepted afterward.
    pub fn end_func(&mut self) -> CodegenResult<()> {
        if self.signature.is_none() {
            return Err(CodegenError::InvalidState(
                "end_func called without a matching add_func",
            ));
        }
        if self.func_ended {
            return Err(CodegenError::InvalidState("end_func called twice"));
        }
        self.func_ended = true;
        Ok(())
    }

    /// Bind `virt_reg` to the incoming argument at `arg_index`, resolving
    /// the concrete physical argument register from this compiler's
    /// calling convention via `value_index` (an index into that
    /// convention's `gp_arg_regs`/`vec_arg_regs` list, chosen by
    /// `virt_reg`'s own [`RegKind`]). [`Self::finish`] materializes this
    /// as a `mov virt_reg, <physical arg register>` at the top of the
    /// function, before the recorded body.
    pub fn set_arg(&mut self, arg_index: u32, value_index: u32, virt_reg: Register) -> CodegenResult<()> {
        let signature = self
            .signature
            .ok_or(CodegenError::InvalidState("set_arg called before add_func"))?;
        if self.func_ended {
            return Err(CodegenError::InvalidState("set_arg called after end_func"));
        }
        if arg_index >= signature.arg_count {
            return Err(CodegenError::InvalidState(
                "arg_index is out of range for this function's signature",
            ));
        }
        if !virt_reg.is_virtual() {
            return Err(CodegenError::InvalidState(
                "set_arg requires a virtual register, not a physical one",
            ));
        }

        let info = self.call_conv.info();
        let phys_id = match virt_reg.kind {
            RegKind::Gp => info.gp_arg_regs.get(value_index as usize).copied(),
            RegKind::Vec => info.vec_arg_regs.get(value_index as usize).copied(),
            RegKind::Mask | RegKind::Segment => None,
        }
        .ok_or(CodegenError::InvalidState(
            "value_index has no matching argument register in this calling convention",
        ))?;

        let phys_reg = Register::physical(virt_reg.kind, phys_id, virt_reg.size_bits);
        self.arg_bindings.push((virt_reg, phys_reg));
        Ok(())
    }

    /// Allocate a fresh virtual GP register.
    pub fn new_gp(&mut self, size_bits: u16) -> Register {
        self.new_virt(RegKind::Gp, size_bits)
    }

    /// Allocate a fresh virtual vector register.
    pub fn new_vec(&mut self, size_bits: u16) -> Register {
        self.new_virt(RegKind::Vec, size_bits)
    }

    fn new_virt(&mut self, kind: RegKind, size_bits: u16) -> Register {
        let virt_id = VIRT_BASE + self.next_virt_id;
        self.next_virt_id += 1;
        self.virt_regs.push(VirtReg {
            id: virt_id,
            kind,
            size_bits,
        });
        Register::virt(kind, virt_id, size_bits)
    }

    /// Allocate a fresh, unbound label.
    pub fn new_label(&mut self) -> LabelId {
        self.builder.new_label()
    }

    /// Record a label bind at the current program position.
    pub fn bind(&mut self, label: LabelId) {
        self.builder.bind(label)
    }

    /// Record one instruction, possibly over virtual registers. Do not
    /// emit a return instruction here — [`Self::finish`] appends one
    /// after the epilogue, in the correct order.
    pub fn emit(&mut self, inst_id: InstId, operands: &[Operand]) {
        self.builder.emit(inst_id, operands)
    }

    /// Run linear-scan allocation and spill materialization over every
    /// instruction recorded so far (plus any [`Self::set_arg`] bindings),
    /// consuming this compiler, then wrap the result in this calling
    /// convention's prologue/epilogue and a trailing return.
    ///
    /// `frame_base` is the physical register spill loads/stores address
    /// relative to (the frame pointer); `scratch_pool` lists the physical
    /// registers available for spill materialization; `gp_pool`/
    /// `vec_pool` list the physical registers the allocator may assign
    /// outright. `load_inst`/`store_inst` are the architecture's generic
    /// register<->memory move mnemonic ids; `move_inst` is its
    /// register<->register move mnemonic id, used to materialize argument
    /// bindings; `ret_inst` is its return mnemonic id.
    ///
    /// Returns the rewritten [`Builder`] (now entirely over physical
    /// registers, ready for [`Builder::serialize_to`]) and the
    /// [`FuncFrame`] describing the spill area this function's
    /// prologue/epilogue reserved.
    #[allow(clippy::too_many_arguments)]
    pub fn finish(
        self,
        frame_base: Register,
        scratch_pool: &[u32],
        gp_pool: &[u32],
        vec_pool: &[u32],
        load_inst: InstId,
        store_inst: InstId,
        move_inst: InstId,
        ret_inst: InstId,
    ) -> CodegenResult<(Builder, FuncFrame)> {
        let mut body = Vec::with_capacity(self.arg_bindings.len() + self.builder.nodes().len());
        for (virt, phys) in &self.arg_bindings {
            body.push(Node::Inst {
                inst_id: move_inst,
                operands: SmallVec::from_slice(&[Operand::Register(*virt), Operand::Register(*phys)]),
            });
        }
        body.extend(self.builder.nodes().iter().cloned());

        let intervals = build_intervals(&body, &self.virt_regs);
        let (assignments, spill_size) = allocate(&intervals, gp_pool, vec_pool);
        let materialized = materialize(&body, &assignments, scratch_pool, frame_base, load_inst, store_inst)?;

        let frame = FuncFrame::new(self.call_conv, spill_size);
        let arch = self.call_conv.arch();

        let mut rewritten = frame.prologue_nodes(arch);
        rewritten.extend(materialized);
        rewritten.extend(frame.epilogue_nodes(arch));
        rewritten.push(Node::Inst {
            inst_id: ret_inst,
            operands: SmallVec::new(),
        });

        let mut builder = self.builder;
        builder.set_nodes(rewritten);
        Ok((builder, frame))
    }
}
