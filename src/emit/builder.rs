//! The Builder tier: records a replayable node list instead of emitting
//! bytes immediately (spec §3, §9 "tier 2"). A `Builder` is cheap to
//! mutate (reorder, inspect, or hand to the register allocator) before
//! it is ever turned into bytes; replay happens once, via
//! [`Builder::serialize_to`].
//!
//! A `Builder` owns its label ids independently of any `CodeHolder` —
//! `serialize_to` pre-allocates matching label slots on the `CodeHolder`
//! it is handed before replaying, so label id `n` means the same thing
//! on both sides. This keeps `Builder` free to be constructed, filled,
//! handed to the register allocator, and only then paired with a
//! `CodeHolder`, rather than borrowing one for its entire recording
//! lifetime.

use smallvec::SmallVec;

use crate::emit::assembler::Assembler;
use crate::emit::node::{Node, NodeList};
use crate::error::CodegenResult;
use crate::isa::{Dispatch, InstId};
use crate::operand::{LabelId, Operand};

/// Records instructions and structural markers. No bytes are written
/// until [`Builder::serialize_to`] runs.
#[derive(Debug, Default)]
pub struct Builder {
    nodes: NodeList,
    next_label_id: u32,
}

impl Builder {
    /// An empty builder.
    pub fn new() -> Self {
        Builder::default()
    }

    /// Allocate a fresh, unbound label.
    pub fn new_label(&mut self) -> LabelId {
        let id = LabelId(self.next_label_id);
        self.next_label_id += 1;
        id
    }

    /// Record a label bind at the current program position.
    pub fn bind(&mut self, label: LabelId) {
        self.nodes.push(Node::Label(label));
    }

    /// Record one instruction.
    pub fn emit(&mut self, inst_id: InstId, operands: &[Operand]) {
        self.nodes.push(Node::Inst {
            inst_id,
            operands: SmallVec::from_slice(operands),
        });
    }

    /// Record an alignment pad to the next multiple of `to` bytes.
    pub fn align(&mut self, to: u32) {
        self.nodes.push(Node::Align(to));
    }

    /// Record raw embedded bytes (e.g. a literal pool entry).
    pub fn embed(&mut self, bytes: &[u8]) {
        self.nodes.push(Node::Data(bytes.to_vec()));
    }

    /// Record a debug comment; never serialized to bytes.
    pub fn comment(&mut self, text: &'static str) {
        self.nodes.push(Node::Comment(text));
    }

    /// The recorded nodes, in program order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Replace this builder's node list wholesale, e.g. with the
    /// register allocator's rewritten output, keeping the same label
    /// counter. Used internally by
    /// [`crate::emit::compiler::Compiler::finish`].
    pub(crate) fn set_nodes(&mut self, nodes: NodeList) {
        self.nodes = nodes;
    }

    /// Replay every recorded node through the architecture dispatcher
    /// `D`, appending bytes to `asm`'s buffer. `Label`/`Align`/`Data`
    /// nodes are handled directly; `Comment` nodes are dropped.
    /// Pre-allocates `asm`'s `CodeHolder` label table to match this
    /// builder's label id space before replaying.
    pub fn serialize_to<D: Dispatch>(&self, asm: &mut Assembler<'_>) -> CodegenResult<()> {
        for _ in 0..self.next_label_id {
            asm.new_label();
        }
        let env = *asm.environment();
        for node in &self.nodes {
            match node {
                Node::Inst { inst_id, operands } => {
                    D::dispatch(asm, &env, *inst_id, operands)?;
                }
                Node::Label(label) => asm.bind(*label)?,
                Node::Align(to) => {
                    let pad = (*to - (asm.buffer_mut().len() % *to)) % *to;
                    asm.buffer_mut().push_zeros(pad);
                }
                Node::Data(bytes) => asm.buffer_mut().push_bytes(bytes),
                Node::Comment(_) => {}
            }
        }
        Ok(())
    }
}
