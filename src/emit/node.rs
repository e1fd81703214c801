//! The Builder-tier IR: one [`Node`] per recorded instruction or
//! structural marker. Unlike the teacher's intrusive, doubly-linked
//! `ir::Inst`/EBB lists (built for SSA basic blocks with mid-function
//! insertion and removal under a `Cursor`), this crate's functions are
//! small and linear, so a plain `Vec<Node>` stands in for that list: the
//! register allocator still needs to splice spill loads/stores in at
//! arbitrary positions, but a `Vec::insert` is cheap enough at this
//! scale and keeps node indices intuitive ("position = node_index*2" per
//! spec §4.5 reads directly off `Vec` indices).

use smallvec::SmallVec;

use crate::isa::InstId;
use crate::operand::{LabelId, Operand};

/// One recorded unit of a [`crate::emit::builder::Builder`]'s program.
#[derive(Debug, Clone)]
pub enum Node {
    /// An instruction: a mnemonic id paired with its operand list. Most
    /// forms take 0–3 operands; `SmallVec` avoids a heap allocation for
    /// all of them.
    Inst {
        inst_id: InstId,
        operands: SmallVec<[Operand; 4]>,
    },
    /// A label bound at this position in program order.
    Label(LabelId),
    /// Pad the text section to the next multiple of `to` bytes.
    Align(u32),
    /// Raw bytes embedded verbatim (e.g. a jump table or literal pool
    /// entry).
    Data(Vec<u8>),
    /// A debug-only annotation, never serialized to bytes.
    Comment(&'static str),
}

/// The recorded program: every `Node` in emission order.
pub type NodeList = Vec<Node>;
