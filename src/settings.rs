//! String key/value configuration knobs, in the shape of
//! `cranelift_codegen::settings::Configurable`.
//!
//! These are orthogonal to [`crate::environment::Environment`]: the
//! `Environment` says what the target *can* do, `Flags` says what this
//! particular emission session *should* do (verification, debug
//! comments, …). None of it changes the bytes an encoder produces for a
//! given operand shape.

use crate::error::{CodegenError, CodegenResult};
use hashbrown::HashMap;

/// A boolean or string-valued setting collected by a [`Builder`] and
/// consumed as an immutable [`Flags`] snapshot.
pub trait Configurable {
    /// Set `name` to `value`. Unknown names are rejected with
    /// `InvalidState` rather than silently ignored — unlike the
    /// dispatcher's documented silent-drop, a typo'd setting name is a
    /// programmer error, not a forward-compatibility surface.
    fn set(&mut self, name: &str, value: &str) -> CodegenResult<()>;
}

/// Accumulates settings before they are frozen into [`Flags`].
#[derive(Debug, Default)]
pub struct Builder {
    values: HashMap<&'static str, bool>,
}

const KNOWN_BOOL_SETTINGS: &[(&str, bool)] = &[
    ("enable_verifier", true),
    ("emit_comments", false),
    ("enable_probestack", true),
];

impl Builder {
    /// Start from this crate's defaults.
    pub fn new() -> Self {
        let mut values = HashMap::new();
        for &(name, default) in KNOWN_BOOL_SETTINGS {
            values.insert(name, default);
        }
        Builder { values }
    }

    /// Freeze the accumulated settings.
    pub fn finish(self) -> Flags {
        Flags {
            values: self.values,
        }
    }
}

impl Configurable for Builder {
    fn set(&mut self, name: &str, value: &str) -> CodegenResult<()> {
        if !self.values.contains_key(name) {
            return Err(CodegenError::InvalidState("unknown setting name"));
        }
        let parsed = match value {
            "true" | "yes" | "on" => true,
            "false" | "no" | "off" => false,
            _ => return Err(CodegenError::InvalidState("setting value is not a bool")),
        };
        self.values.insert(
            KNOWN_BOOL_SETTINGS
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(n, _)| *n)
                .expect("checked above"),
            parsed,
        );
        Ok(())
    }
}

/// An immutable, frozen set of settings produced by [`Builder::finish`].
#[derive(Debug, Clone)]
pub struct Flags {
    values: HashMap<&'static str, bool>,
}

impl Flags {
    /// The crate's built-in defaults.
    pub fn defaults() -> Self {
        Builder::new().finish()
    }

    /// Whether the allocation-safety and spill-correctness invariants
    /// (spec §8) should be checked by an internal debug-assertion pass
    /// after register allocation. On by default; flip off only for
    /// performance-sensitive embedding once a workload is trusted.
    pub fn enable_verifier(&self) -> bool {
        self.values.get("enable_verifier").copied().unwrap_or(true)
    }

    /// Whether a future disassembly/debug-print pass should surface
    /// `Comment` nodes recorded via `Builder::comment`. Off by default;
    /// comments never affect encoding and `Builder::serialize_to` always
    /// skips them regardless of this flag.
    pub fn emit_comments(&self) -> bool {
        self.values.get("emit_comments").copied().unwrap_or(false)
    }

    /// Whether prologue emission should include a stack probe for frames
    /// larger than one page. See [`crate::abi::frame`].
    pub fn enable_probestack(&self) -> bool {
        self.values
            .get("enable_probestack")
            .copied()
            .unwrap_or(true)
    }
}

impl Default for Flags {
    fn default() -> Self {
        Flags::defaults()
    }
}
