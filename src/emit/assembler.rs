//! The Assembler tier: a thin, immediate-mode wrapper around a borrowed
//! [`CodeHolder`] (spec §3, §9 "tier 1"). Every `emit` call appends bytes
//! to the text section right away; there is no intermediate
//! representation to replay, which is what distinguishes this tier from
//! [`crate::emit::builder::Builder`].

use crate::buffer::CodeBuffer;
use crate::code_holder::CodeHolder;
use crate::environment::Environment;
use crate::error::CodegenResult;
use crate::fixup::Fixup;
use crate::isa::{Dispatch, InstId};
use crate::operand::{LabelId, Operand};

/// Borrows a [`CodeHolder`] and emits machine code into it one
/// instruction at a time. Only one of `Assembler`/`Builder`/`Compiler`
/// may borrow a given `CodeHolder` at a time, enforced by Rust's
/// exclusive-borrow rules rather than any runtime check (spec's
/// "cross-emitter concurrency" non-goal is simply not representable).
pub struct Assembler<'a> {
    holder: &'a mut CodeHolder,
}

impl<'a> Assembler<'a> {
    /// Borrow `holder` for immediate-mode emission.
    pub fn new(holder: &'a mut CodeHolder) -> Self {
        Assembler { holder }
    }

    /// The target this assembler is emitting for.
    pub fn environment(&self) -> &Environment {
        &self.holder.env
    }

    /// Mutable access to the underlying byte buffer, used by the `isa`
    /// encoders.
    pub fn buffer_mut(&mut self) -> &mut CodeBuffer {
        &mut self.holder.text
    }

    /// Read-only access to the underlying holder, used by encoders that
    /// need to query label bindings (e.g. the x86 short-branch choice).
    pub fn holder(&self) -> &CodeHolder {
        self.holder
    }

    /// Allocate a fresh, unbound label.
    pub fn new_label(&mut self) -> LabelId {
        self.holder.new_label()
    }

    /// Bind `label` to the current end of the text section.
    pub fn bind(&mut self, label: LabelId) -> CodegenResult<()> {
        self.holder.bind_label(label)
    }

    /// Record a deferred patch, resolved when the owning `CodeHolder` is
    /// finalized.
    pub fn add_fixup(&mut self, fixup: Fixup) {
        self.holder.add_fixup(fixup);
    }

    /// Encode one instruction via the architecture dispatcher `D`. A
    /// `Dispatch` impl that finds no matching operand-shape form is a
    /// silent no-op (see [`crate::isa::Dispatch`]), not an error.
    pub fn emit<D: Dispatch>(&mut self, inst_id: InstId, operands: &[Operand]) -> CodegenResult<()> {
        let env = self.holder.env;
        D::dispatch(self, &env, inst_id, operands)
    }
}
