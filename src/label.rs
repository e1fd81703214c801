//! Label management: forward-declarable position markers, bound once to
//! a byte offset (spec §3, §4.2).

use crate::error::{CodegenError, CodegenResult};
use crate::operand::LabelId;

/// Hands out fresh label ids monotonically and stores an `offset:
/// Option<u32>` per id. Owned exclusively by one
/// [`crate::code_holder::CodeHolder`]; label ids from one `LabelManager`
/// are meaningless in another.
#[derive(Debug, Default)]
pub struct LabelManager {
    offsets: Vec<Option<u32>>,
    names: Vec<Option<&'static str>>,
}

impl LabelManager {
    /// An empty label table.
    pub fn new() -> Self {
        LabelManager::default()
    }

    /// Allocate a fresh, unbound label.
    pub fn new_label(&mut self) -> LabelId {
        self.offsets.push(None);
        self.names.push(None);
        LabelId((self.offsets.len() - 1) as u32)
    }

    /// Allocate a fresh, unbound label with a debug name (no effect on
    /// encoding; surfaces in error messages and any future disassembly).
    pub fn new_named_label(&mut self, name: &'static str) -> LabelId {
        let id = self.new_label();
        self.names[id.0 as usize] = Some(name);
        id
    }

    /// Bind `label` to `offset`. Fails with `LabelAlreadyBound` if this
    /// label was already bound.
    pub fn bind_at(&mut self, label: LabelId, offset: u32) -> CodegenResult<()> {
        let slot = &mut self.offsets[label.0 as usize];
        if let Some(existing) = *slot {
            return Err(CodegenError::LabelAlreadyBound {
                label_id: label.0,
                existing_offset: existing,
            });
        }
        *slot = Some(offset);
        Ok(())
    }

    /// The bound offset of `label`, if any.
    pub fn offset(&self, label: LabelId) -> Option<u32> {
        self.offsets[label.0 as usize]
    }

    /// Is `label` bound?
    pub fn is_bound(&self, label: LabelId) -> bool {
        self.offset(label).is_some()
    }

    /// The debug name of `label`, if it was given one.
    pub fn name(&self, label: LabelId) -> Option<&'static str> {
        self.names[label.0 as usize]
    }
}
