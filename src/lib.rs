//! A small just-in-time code generation library: architecture-neutral
//! operands and an [`isa`] layer that lowers them to x86-64 or AArch64
//! machine code, a three-tier emission API ([`emit::Assembler`] for
//! immediate bytes, [`emit::Builder`] for a replayable node list,
//! [`emit::Compiler`] for virtual registers and linear-scan allocation),
//! and a [`runtime`] that maps finalized code into write-xor-execute
//! pages.
//!
//! See `SPEC_FULL.md` in the repository root for the full module-by-
//! module specification this crate implements.

#![deny(missing_docs, trivial_numeric_casts, unused_extern_crates)]
#![warn(unused_import_braces)]

pub mod abi;
pub mod buffer;
pub mod code_holder;
pub mod emit;
pub mod environment;
pub mod error;
pub mod fixup;
pub mod inst_db;
pub mod isa;
pub mod label;
pub mod operand;
pub mod regalloc;
pub mod runtime;
pub mod settings;

pub use crate::abi::{CallConv, FuncFrame, Signature};
pub use crate::code_holder::{CodeHolder, FinalizedCode};
pub use crate::emit::{Assembler, Builder, Compiler};
pub use crate::environment::{Arch, Environment, Platform};
pub use crate::error::{CodegenError, CodegenResult};
pub use crate::isa::InstId;
pub use crate::runtime::{JitFunction, MappedCode, Runtime};

/// Version number of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
