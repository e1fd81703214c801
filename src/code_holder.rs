//! `CodeHolder`: the aggregate owning one text section, its label table,
//! and its pending fixups (spec §3).

use crate::buffer::CodeBuffer;
use crate::environment::Environment;
use crate::error::{CodegenError, CodegenResult};
use crate::fixup::{resolve_all, Fixup};
use crate::label::LabelManager;
use crate::operand::LabelId;

/// Owns one text section (its [`CodeBuffer`]), the [`LabelManager`], and
/// the list of pending [`Fixup`] records. An `Assembler` borrows a
/// `CodeHolder` mutably; a `CodeHolder` is never shared between
/// `Assembler`/`Builder`/`Compiler` tiers at the same time.
pub struct CodeHolder {
    pub(crate) env: Environment,
    pub(crate) text: CodeBuffer,
    pub(crate) labels: LabelManager,
    pub(crate) fixups: Vec<Fixup>,
    finalized: bool,
}

impl CodeHolder {
    /// A fresh, empty text section targeting `env`.
    pub fn new(env: Environment) -> Self {
        CodeHolder {
            env,
            text: CodeBuffer::new(),
            labels: LabelManager::new(),
            fixups: Vec::new(),
            finalized: false,
        }
    }

    /// The target this holder's bytes are being generated for.
    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// Current length of the text section.
    pub fn code_size(&self) -> u32 {
        self.text.len()
    }

    /// Allocate a fresh, unbound label.
    pub fn new_label(&mut self) -> LabelId {
        self.labels.new_label()
    }

    /// Bind `label` to the current end of the text section.
    pub fn bind_label(&mut self, label: LabelId) -> CodegenResult<()> {
        let offset = self.text.len();
        self.labels.bind_at(label, offset)
    }

    /// Record a deferred patch to be resolved at `finalize()`.
    pub fn add_fixup(&mut self, fixup: Fixup) {
        self.fixups.push(fixup);
    }

    /// Resolve every pending fixup, consuming this holder's buffered
    /// state into a [`FinalizedCode`] handle. Fails `UnboundLabel` if any
    /// fixup refers to a label that was never bound.
    pub fn finalize(&mut self) -> CodegenResult<FinalizedCode> {
        if self.finalized {
            return Err(CodegenError::InvalidState(
                "finalize() called twice on the same CodeHolder",
            ));
        }
        resolve_all(&self.fixups, &mut self.text, &self.labels)?;
        self.fixups.clear();
        self.finalized = true;
        Ok(FinalizedCode {
            bytes: self.text.as_slice().to_vec(),
        })
    }

    /// Discard all buffered bytes, labels, and fixups, returning this
    /// holder to its freshly-constructed state.
    pub fn reset(&mut self) {
        self.text.reset();
        self.labels = LabelManager::new();
        self.fixups.clear();
        self.finalized = false;
    }
}

/// The result of a successful `finalize()`: the patched byte buffer and
/// the length of the text section. Handed to [`crate::runtime::Runtime`]
/// to be mapped into executable memory.
#[derive(Debug, Clone)]
pub struct FinalizedCode {
    bytes: Vec<u8>,
}

impl FinalizedCode {
    /// The final, fully patched machine code bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Length of the text section in bytes.
    pub fn text_length(&self) -> usize {
        self.bytes.len()
    }
}
