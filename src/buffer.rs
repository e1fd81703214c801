//! The growable byte sink backing one text section (spec §3, §4.2).
//!
//! Three guarantees hold for every `CodeBuffer`: append is amortized
//! O(1); every multi-byte write is little-endian; `patch_*` is
//! bounds-checked (it panics on out-of-range offsets, since a patch at an
//! invalid offset is always an internal bug in this crate, never
//! caller-supplied data).

/// A growable, little-endian byte sink. Exclusively owned by its
/// [`crate::code_holder::CodeHolder`].
#[derive(Debug, Default, Clone)]
pub struct CodeBuffer {
    bytes: Vec<u8>,
}

impl CodeBuffer {
    /// An empty buffer.
    pub fn new() -> Self {
        CodeBuffer { bytes: Vec::new() }
    }

    /// Current length in bytes; also the offset the next `push_*` call
    /// will write at.
    pub fn len(&self) -> u32 {
        self.bytes.len() as u32
    }

    /// Is the buffer empty?
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Append a single byte.
    pub fn push_u8(&mut self, value: u8) {
        self.bytes.push(value);
    }

    /// Append a little-endian `u16`.
    pub fn push_u16(&mut self, value: u16) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    /// Append a little-endian `u32`. Used directly by the AArch64
    /// encoder, whose instructions are always one such word.
    pub fn push_u32(&mut self, value: u32) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    /// Append a little-endian `u64`.
    pub fn push_u64(&mut self, value: u64) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    /// Append raw bytes verbatim (used by `Builder::embed`/`Node::Data`).
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    /// Append `count` zero bytes (used by `Builder::align`).
    pub fn push_zeros(&mut self, count: u32) {
        self.bytes.resize(self.bytes.len() + count as usize, 0);
    }

    /// OR `bits` into the 32-bit word at `offset`, preserving the other
    /// bits already present. Used by fixup resolution to patch a
    /// displacement into an already-emitted instruction word/opcode
    /// without disturbing its non-displacement bits.
    pub fn patch_or_u32(&mut self, offset: u32, bits: u32) {
        let at = offset as usize;
        let slice = &mut self.bytes[at..at + 4];
        let mut existing = u32::from_le_bytes(slice.try_into().expect("checked above"));
        existing |= bits;
        slice.copy_from_slice(&existing.to_le_bytes());
    }

    /// Overwrite the `width` bytes (1, 2, or 4) at `offset` with the
    /// little-endian encoding of `value`. Used for x86 `rel8`/`rel32`
    /// fixups, which are raw replacement rather than OR-in (there is no
    /// pre-existing opcode data sharing those bytes).
    pub fn patch_bytes(&mut self, offset: u32, width: u8, value: i64) {
        let at = offset as usize;
        match width {
            1 => self.bytes[at] = value as i8 as u8,
            2 => self.bytes[at..at + 2].copy_from_slice(&(value as i16).to_le_bytes()),
            4 => self.bytes[at..at + 4].copy_from_slice(&(value as i32).to_le_bytes()),
            _ => unreachable!("unsupported patch width {width}"),
        }
    }

    /// Borrow the final bytes, e.g. for handing to the `Runtime`.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Discard all contents, reclaiming the buffer for reuse. A
    /// partially emitted buffer is always fully reclaimed this way;
    /// there is no partial-rollback API since emission has no
    /// checkpoints.
    pub fn reset(&mut self) {
        self.bytes.clear();
    }
}
