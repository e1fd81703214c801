//! Calling-convention catalog and function-frame layout (spec §4.6).

pub mod call_conv;
pub mod frame;
pub mod signature;

pub use call_conv::CallConv;
pub use frame::FuncFrame;
pub use signature::Signature;
