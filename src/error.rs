//! The closed set of errors this crate's public API can return.
//!
//! Every fallible public method returns `Result<T, CodegenError>`. The
//! dispatcher's silent no-op on an unrecognized operand shape is
//! deliberately *not* a variant here: it is a documented extension
//! mechanism, not a failure (see [`crate::isa`]).

use crate::isa::InstId;

/// A byte offset into a [`crate::buffer::CodeBuffer`].
pub type ByteOffset = u32;

/// Errors produced by the encoding, allocation, and runtime stages of this
/// crate.
#[derive(Debug, thiserror::Error)]
pub enum CodegenError {
    /// `finalize()` found a fixup referring to a label that was never
    /// bound with `bind_at`.
    #[error("unbound label {label_id} referenced by fixup at offset {at_offset}")]
    UnboundLabel {
        /// The label id that was never bound.
        label_id: u32,
        /// The offset of the fixup that referenced it.
        at_offset: ByteOffset,
    },

    /// `bind_at` was called twice for the same label id.
    #[error("label {label_id} is already bound at offset {existing_offset}")]
    LabelAlreadyBound {
        /// The label id that was already bound.
        label_id: u32,
        /// The offset it was already bound to.
        existing_offset: ByteOffset,
    },

    /// A fixup's computed displacement does not fit the encoding's field
    /// width.
    #[error(
        "displacement {delta} out of range for fixup kind {kind:?} at offset {at_offset}"
    )]
    InvalidDisplacement {
        /// The fixup kind whose range was exceeded.
        kind: &'static str,
        /// The computed (pre-shift) displacement.
        delta: i64,
        /// The offset of the fixup in the buffer.
        at_offset: ByteOffset,
    },

    /// An operand's shape, size, or register class is incompatible with
    /// the chosen instruction form.
    #[error("invalid operand {operand_index} for instruction {inst_id:?}: {reason}")]
    InvalidOperand {
        /// The instruction identifier being encoded.
        inst_id: InstId,
        /// Index of the offending operand within the operand list.
        operand_index: usize,
        /// Human-readable detail.
        reason: &'static str,
    },

    /// An immediate value does not fit the field it was destined for.
    #[error("immediate {value} does not fit a {bits}-bit field for instruction {inst_id:?}")]
    InvalidImmediate {
        /// The instruction identifier being encoded.
        inst_id: InstId,
        /// The raw immediate value.
        value: i64,
        /// The width of the field it needed to fit.
        bits: u8,
    },

    /// The chosen encoding requires a CPU feature extension not present in
    /// the active [`crate::environment::Environment`].
    #[error("instruction {inst_id:?} requires CPU feature `{extension}`, not enabled")]
    FeatureNotEnabled {
        /// The instruction identifier being encoded.
        inst_id: InstId,
        /// The missing extension's name.
        extension: &'static str,
    },

    /// The register allocator ran out of physical registers to spill into
    /// during spill materialization.
    #[error("register allocator exhausted its scratch pool at node {node_index}")]
    RegistersExhausted {
        /// Index of the node being rewritten when allocation failed.
        node_index: u32,
    },

    /// The runtime failed to obtain or transition a page mapping from the
    /// OS.
    #[error("runtime out of memory: {0}")]
    OutOfMemory(#[source] std::io::Error),

    /// A public method was invoked in the wrong tier/phase, e.g. emitting
    /// into an `Assembler` after `finalize()` has already run.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),
}

/// Convenience alias used throughout the crate.
pub type CodegenResult<T> = Result<T, CodegenError>;
