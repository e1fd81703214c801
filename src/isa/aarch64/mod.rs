//! The AArch64 backend: registers, encoder primitives, and the mnemonic
//! dispatcher.

pub mod dispatch;
pub mod encoder;
pub mod registers;

pub use dispatch::{Aarch64Dispatch, Mnemonic};
