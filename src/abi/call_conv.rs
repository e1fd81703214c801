//! Calling convention identifiers and their register/stack layout (spec
//! §4.6), in the same spirit as the teacher's `isa::call_conv::CallConv`
//! but carrying the concrete register lists this crate's ABI lowering
//! needs rather than deferring to a `TargetIsa` trait object.

use core::fmt;

use crate::environment::{Arch, Environment, Platform};
use crate::isa::{aarch64::registers as a64, x64::registers as x64};

/// How arguments beyond the register list are passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// The first N arguments go in registers, the rest on the stack.
    RegisterArgs,
    /// Every argument is passed on the stack (32-bit `cdecl`/`stdcall`).
    StackOnly,
}

/// The concrete layout one calling convention commits to.
#[derive(Debug, Clone, Copy)]
pub struct CallConvInfo {
    pub gp_arg_regs: &'static [u32],
    pub vec_arg_regs: &'static [u32],
    pub gp_ret_regs: &'static [u32],
    pub vec_ret_regs: &'static [u32],
    /// Bitmask over GP register ids the callee must preserve.
    pub preserved_gp_mask: u32,
    /// Bitmask over vector register ids the callee must preserve.
    pub preserved_vec_mask: u32,
    pub natural_stack_alignment: u32,
    /// Bytes of stack the caller must always reserve for arguments, even
    /// when none spill there (the Windows x64 "shadow space").
    pub min_stack_arg_size: u32,
    pub strategy: Strategy,
}

/// Calling convention identifiers this crate's ABI lowering understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallConv {
    /// 32-bit x86 `cdecl`: all arguments on the stack, caller cleans up.
    Cdecl,
    /// 32-bit x86 `stdcall`: all arguments on the stack, callee cleans up.
    Stdcall,
    /// 32-bit x86 `fastcall`: first two integer arguments in `ecx`/`edx`.
    Fastcall,
    /// 32-bit x86 `vectorcall`: `fastcall` plus vector arguments in
    /// `xmm0`-`xmm5`.
    Vectorcall,
    /// x86-64 Windows convention: 4 register args, 32-byte shadow space.
    X64Windows,
    /// x86-64 System V convention (Linux/macOS/BSD): 6 GP + 8 vector
    /// register args, red zone not modeled here.
    X64SystemV,
    /// AArch64 AAPCS64 (Linux).
    Aarch64Aapcs,
    /// AArch64 Apple variant of AAPCS64 (differs in minor stack-packing
    /// rules this crate does not implement; tracked as the same register
    /// layout).
    Aarch64Apple,
}

impl CallConv {
    /// The calling convention `Environment::host`/explicit targets
    /// default to, mirroring `CallConv::triple_default`'s role in the
    /// teacher.
    pub fn default_for(env: &Environment) -> Self {
        match (env.arch, env.platform) {
            (Arch::X86_64, Platform::Windows) => CallConv::X64Windows,
            (Arch::X86_64, _) => CallConv::X64SystemV,
            (Arch::Aarch64, Platform::Macos) => CallConv::Aarch64Apple,
            (Arch::Aarch64, _) => CallConv::Aarch64Aapcs,
            (Arch::X86, _) => CallConv::Cdecl,
        }
    }

    /// The architecture this calling convention belongs to, used by
    /// [`crate::emit::compiler::Compiler::finish`] to pick the right
    /// prologue/epilogue shape.
    pub fn arch(self) -> Arch {
        match self {
            CallConv::Cdecl | CallConv::Stdcall | CallConv::Fastcall | CallConv::Vectorcall => {
                Arch::X86
            }
            CallConv::X64Windows | CallConv::X64SystemV => Arch::X86_64,
            CallConv::Aarch64Aapcs | CallConv::Aarch64Apple => Arch::Aarch64,
        }
    }

    /// This convention's concrete register/stack layout.
    pub fn info(self) -> CallConvInfo {
        match self {
            CallConv::Cdecl | CallConv::Stdcall => CallConvInfo {
                gp_arg_regs: &[],
                vec_arg_regs: &[],
                gp_ret_regs: &[x64::RAX],
                vec_ret_regs: &[],
                preserved_gp_mask: gp_mask(&[x64::RBX, x64::RBP, x64::RSI, x64::RDI]),
                preserved_vec_mask: 0,
                natural_stack_alignment: 4,
                min_stack_arg_size: 0,
                strategy: Strategy::StackOnly,
            },
            CallConv::Fastcall => CallConvInfo {
                gp_arg_regs: &[x64::RCX, x64::RDX],
                vec_arg_regs: &[],
                gp_ret_regs: &[x64::RAX],
                vec_ret_regs: &[],
                preserved_gp_mask: gp_mask(&[x64::RBX, x64::RBP, x64::RSI, x64::RDI]),
                preserved_vec_mask: 0,
                natural_stack_alignment: 4,
                min_stack_arg_size: 0,
                strategy: Strategy::RegisterArgs,
            },
            CallConv::Vectorcall => CallConvInfo {
                gp_arg_regs: &[x64::RCX, x64::RDX],
                vec_arg_regs: &[0, 1, 2, 3, 4, 5],
                gp_ret_regs: &[x64::RAX],
                vec_ret_regs: &[0],
                preserved_gp_mask: gp_mask(&[x64::RBX, x64::RBP, x64::RSI, x64::RDI]),
                preserved_vec_mask: 0,
                natural_stack_alignment: 4,
                min_stack_arg_size: 0,
                strategy: Strategy::RegisterArgs,
            },
            CallConv::X64SystemV => CallConvInfo {
                gp_arg_regs: &[x64::RDI, x64::RSI, x64::RDX, x64::RCX, x64::R8, x64::R9],
                vec_arg_regs: &[0, 1, 2, 3, 4, 5, 6, 7],
                gp_ret_regs: &[x64::RAX, x64::RDX],
                vec_ret_regs: &[0, 1],
                preserved_gp_mask: gp_mask(&[
                    x64::RBX,
                    x64::RBP,
                    x64::R12,
                    x64::R13,
                    x64::R14,
                    x64::R15,
                ]),
                preserved_vec_mask: 0,
                natural_stack_alignment: 16,
                min_stack_arg_size: 0,
                strategy: Strategy::RegisterArgs,
            },
            CallConv::X64Windows => CallConvInfo {
                gp_arg_regs: &[x64::RCX, x64::RDX, x64::R8, x64::R9],
                vec_arg_regs: &[0, 1, 2, 3],
                gp_ret_regs: &[x64::RAX],
                vec_ret_regs: &[0],
                preserved_gp_mask: gp_mask(&[
                    x64::RBX,
                    x64::RBP,
                    x64::RDI,
                    x64::RSI,
                    x64::R12,
                    x64::R13,
                    x64::R14,
                    x64::R15,
                ]),
                preserved_vec_mask: gp_mask(&[6, 7, 8, 9, 10, 11, 12, 13, 14, 15]),
                natural_stack_alignment: 16,
                min_stack_arg_size: 32, // shadow space
                strategy: Strategy::RegisterArgs,
            },
            CallConv::Aarch64Aapcs | CallConv::Aarch64Apple => CallConvInfo {
                gp_arg_regs: &[
                    a64::X0, a64::X1, a64::X2, a64::X3, a64::X4, a64::X5, a64::X6, a64::X7,
                ],
                vec_arg_regs: &[0, 1, 2, 3, 4, 5, 6, 7],
                gp_ret_regs: &[a64::X0, a64::X1],
                vec_ret_regs: &[0, 1],
                preserved_gp_mask: gp_mask(&[
                    19, 20, 21, 22, 23, 24, 25, 26, 27, 28, a64::X29, a64::X30,
                ]),
                preserved_vec_mask: gp_mask(&[8, 9, 10, 11, 12, 13, 14, 15]),
                natural_stack_alignment: 16,
                min_stack_arg_size: 0,
                strategy: Strategy::RegisterArgs,
            },
        }
    }
}

fn gp_mask(ids: &[u32]) -> u32 {
    ids.iter().fold(0u32, |mask, &id| mask | (1 << id))
}

impl fmt::Display for CallConv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CallConv::Cdecl => "cdecl",
            CallConv::Stdcall => "stdcall",
            CallConv::Fastcall => "fastcall",
            CallConv::Vectorcall => "vectorcall",
            CallConv::X64Windows => "x64_windows",
            CallConv::X64SystemV => "x64_systemv",
            CallConv::Aarch64Aapcs => "aarch64_aapcs",
            CallConv::Aarch64Apple => "aarch64_apple",
        })
    }
}
