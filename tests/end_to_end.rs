//! End-to-end coverage across the three emission tiers, both backends,
//! the allocator under register pressure, and the W^X runtime.

use forgecode::abi::CallConv;
use forgecode::emit::{Assembler, Builder, Compiler};
use forgecode::environment::{Arch, Environment, Platform};
use forgecode::isa::aarch64::{Aarch64Dispatch, Mnemonic as A64Mn};
use forgecode::isa::x64::{Mnemonic as X64Mn, X64Dispatch};
use forgecode::operand::{Immediate, LabelId, Memory, Operand, RegKind, Register, VIRT_BASE};
use forgecode::runtime::{JitFunction, Runtime};
use forgecode::CodeHolder;

fn x86_env() -> Environment {
    Environment::new(Arch::X86_64, Platform::Linux)
}

fn aarch64_env() -> Environment {
    Environment::new(Arch::Aarch64, Platform::Linux)
}

fn gp(id: u32, size_bits: u16) -> Register {
    Register::physical(RegKind::Gp, id, size_bits)
}

#[test]
fn x86_64_zero_function() {
    use forgecode::isa::x64::registers::RAX;

    let mut holder = CodeHolder::new(x86_env());
    let mut asm = Assembler::new(&mut holder);
    asm.emit::<X64Dispatch>(
        X64Mn::Mov.id(),
        &[Operand::Register(gp(RAX, 32)), Operand::Immediate(Immediate::new(0))],
    )
    .unwrap();
    asm.emit::<X64Dispatch>(X64Mn::Ret.id(), &[]).unwrap();

    let code = holder.finalize().unwrap();
    // `mov eax, 0` lowers through the short `B8+rd` move-immediate form,
    // one byte shorter than the ModR/M `0xC7 /0` form the dispatcher
    // falls back to for 8/16-bit destinations.
    assert_eq!(code.bytes(), &[0xB8, 0x00, 0x00, 0x00, 0x00, 0xC3]);
}

#[test]
fn aarch64_zero_function() {
    use forgecode::isa::aarch64::registers::X0;

    let mut holder = CodeHolder::new(aarch64_env());
    let mut asm = Assembler::new(&mut holder);
    asm.emit::<Aarch64Dispatch>(
        A64Mn::MovImm64.id(),
        &[Operand::Register(gp(X0, 64)), Operand::Immediate(Immediate::new(0))],
    )
    .unwrap();
    asm.emit::<Aarch64Dispatch>(A64Mn::Ret.id(), &[]).unwrap();

    let code = holder.finalize().unwrap();
    // movz x0, #0
    assert_eq!(&code.bytes()[0..4], &[0x00, 0x00, 0x80, 0xD2]);
    // ret
    assert_eq!(&code.bytes()[4..8], &[0xC0, 0x03, 0x5F, 0xD6]);
    assert_eq!(code.text_length(), 8);
}

#[test]
fn x86_forward_branch_resolves_rel32() {
    let mut holder = CodeHolder::new(x86_env());
    let mut asm = Assembler::new(&mut holder);
    let target = asm.new_label();

    asm.emit::<X64Dispatch>(X64Mn::Jmp.id(), &[Operand::Label(target)])
        .unwrap();
    // Two bytes of filler between the jump and its target so the
    // patched displacement is exercised rather than trivially zero.
    asm.emit::<X64Dispatch>(X64Mn::Ret.id(), &[]).unwrap();
    asm.emit::<X64Dispatch>(X64Mn::Ret.id(), &[]).unwrap();
    asm.bind(target).unwrap();

    let code = holder.finalize().unwrap();
    assert_eq!(
        code.bytes(),
        &[0xE9, 0x02, 0x00, 0x00, 0x00, 0xC3, 0xC3]
    );
}

#[test]
fn aarch64_forward_branch_resolves_imm19() {
    use forgecode::isa::aarch64::registers::{X0, X1};

    let mut holder = CodeHolder::new(aarch64_env());
    let mut asm = Assembler::new(&mut holder);
    let target = asm.new_label();

    asm.emit::<Aarch64Dispatch>(
        A64Mn::Cbz.id(),
        &[Operand::Register(gp(X0, 64)), Operand::Label(target)],
    )
    .unwrap();
    // One filler instruction between the branch and its target.
    asm.emit::<Aarch64Dispatch>(
        A64Mn::Add.id(),
        &[
            Operand::Register(gp(X1, 64)),
            Operand::Register(gp(X1, 64)),
            Operand::Register(gp(X1, 64)),
        ],
    )
    .unwrap();
    asm.bind(target).unwrap();

    let code = holder.finalize().unwrap();
    assert_eq!(
        code.bytes(),
        &[0x40, 0x00, 0x00, 0xB4, 0x21, 0x00, 0x01, 0x8B]
    );
}

#[test]
fn register_allocator_spills_under_pressure() {
    use forgecode::isa::x64::registers::{RAX, RBP, RBX, R12, R13, R14, R15, SCRATCH_POOL};

    const N: usize = 30;
    let mut compiler = Compiler::new(CallConv::X64SystemV);
    let vregs: Vec<Register> = (0..N).map(|_| compiler.new_gp(64)).collect();

    for (i, &v) in vregs.iter().enumerate() {
        compiler.emit(
            X64Mn::MovImm64.id(),
            &[Operand::Register(v), Operand::Immediate(Immediate::new(i as i64))],
        );
    }
    // Accumulate every other register into vregs[0], so at the point
    // right after all 30 defs every one of them is still live — far
    // more simultaneous demand than the 5-register pool below can hold
    // outright.
    for &v in &vregs[1..] {
        compiler.emit(
            X64Mn::Add.id(),
            &[Operand::Register(vregs[0]), Operand::Register(vregs[0]), Operand::Register(v)],
        );
    }
    // Move the accumulated sum into the SysV return register so the
    // materialized function actually reports its result.
    compiler.emit(
        X64Mn::Mov.id(),
        &[Operand::Register(gp(RAX, 64)), Operand::Register(vregs[0])],
    );

    let gp_pool = &[RBX, R12, R13, R14, R15];
    let frame_base = gp(RBP, 64);
    let (builder, frame) = compiler
        .finish(
            frame_base,
            SCRATCH_POOL,
            gp_pool,
            &[],
            X64Mn::Mov.id(),
            X64Mn::Mov.id(),
            X64Mn::Mov.id(),
            X64Mn::Ret.id(),
        )
        .unwrap();

    assert!(frame.frame_size > 0, "30 registers over a 5-wide pool must spill");
    assert_eq!(frame.frame_size % 16, 0);

    for node in builder.nodes() {
        if let forgecode::emit::node::Node::Inst { operands, .. } = node {
            for operand in operands {
                for reg in operand.registers().iter() {
                    assert!(
                        reg.id < VIRT_BASE,
                        "materialize() must rewrite every virtual register to a physical one or a spill slot"
                    );
                }
            }
        }
    }

    let mut holder = CodeHolder::new(x86_env());
    let mut asm = Assembler::new(&mut holder);
    builder.serialize_to::<X64Dispatch>(&mut asm).unwrap();
    let code = holder.finalize().unwrap();

    let runtime = Runtime::new(1);
    let mapped = runtime.add(&code).unwrap();

    #[cfg(target_arch = "x86_64")]
    {
        let f: JitFunction<extern "C" fn() -> i64> = unsafe { JitFunction::new(mapped) };
        let sum: i64 = (0..N as i64).sum();
        assert_eq!((f.get())(), sum);
    }
    #[cfg(not(target_arch = "x86_64"))]
    let _ = mapped;
}

#[test]
fn builder_replays_through_serialize_to() {
    use forgecode::isa::x64::registers::RAX;

    let mut builder = Builder::new();
    let label = builder.new_label();
    builder.emit(
        X64Mn::Mov.id(),
        &[Operand::Register(gp(RAX, 32)), Operand::Immediate(Immediate::new(7))],
    );
    builder.bind(label);
    builder.emit(X64Mn::Ret.id(), &[]);

    let mut holder = CodeHolder::new(x86_env());
    let mut asm = Assembler::new(&mut holder);
    builder.serialize_to::<X64Dispatch>(&mut asm).unwrap();

    let code = holder.finalize().unwrap();
    assert_eq!(code.bytes(), &[0xB8, 0x07, 0x00, 0x00, 0x00, 0xC3]);
}

#[test]
fn memory_operand_carries_base_register_through_materialize() {
    use forgecode::isa::x64::registers::{RBP, RBX};

    let mut compiler = Compiler::new(CallConv::X64SystemV);
    let base = compiler.new_gp(64);
    let dst = compiler.new_gp(32);
    compiler.emit(
        X64Mn::Mov.id(),
        &[
            Operand::Register(dst),
            Operand::Memory(Memory::base_offset(base, 8, 32)),
        ],
    );

    let (builder, _frame) = compiler
        .finish(
            gp(RBP, 64),
            forgecode::isa::x64::registers::SCRATCH_POOL,
            &[RBX],
            &[],
            X64Mn::Mov.id(),
            X64Mn::Mov.id(),
            X64Mn::Mov.id(),
            X64Mn::Ret.id(),
        )
        .unwrap();

    let mut saw_memory = false;
    for node in builder.nodes() {
        if let forgecode::emit::node::Node::Inst { operands, .. } = node {
            for operand in operands {
                if let Operand::Memory(m) = operand {
                    saw_memory = true;
                    assert!(m.base.unwrap().id < VIRT_BASE);
                }
            }
        }
    }
    assert!(saw_memory, "the Mov reg,mem node must survive materialize()");
}

#[test]
fn wx_runtime_maps_and_runs_a_zero_function() {
    let mut holder = CodeHolder::new(x86_env());
    let mut asm = Assembler::new(&mut holder);
    asm.emit::<X64Dispatch>(X64Mn::Ret.id(), &[]).unwrap();
    let code = holder.finalize().unwrap();

    let runtime = Runtime::new(4);
    let mapped = runtime.add(&code).unwrap();
    assert_eq!(mapped.len(), 1);
    assert!(!mapped.as_ptr().is_null());

    #[cfg(target_arch = "x86_64")]
    {
        let f: JitFunction<extern "C" fn()> = unsafe { JitFunction::new(mapped.clone()) };
        (f.get())();
    }
}

#[test]
fn runtime_cache_is_lru_and_capacity_bounded() {
    let mut holder = CodeHolder::new(x86_env());
    let mut asm = Assembler::new(&mut holder);
    asm.emit::<X64Dispatch>(X64Mn::Ret.id(), &[]).unwrap();
    let code_a = holder.finalize().unwrap();

    let mut holder_b = CodeHolder::new(x86_env());
    let mut asm_b = Assembler::new(&mut holder_b);
    asm_b.emit::<X64Dispatch>(X64Mn::Ret.id(), &[]).unwrap();
    asm_b.emit::<X64Dispatch>(X64Mn::Ret.id(), &[]).unwrap();
    let code_b = holder_b.finalize().unwrap();

    let runtime = Runtime::new(1);
    let first = runtime.add_cached(1, &code_a).unwrap();
    assert_eq!(runtime.cached_len(), 1);

    let again = runtime.add_cached(1, &code_a).unwrap();
    assert!(std::ptr::eq(first.as_ptr(), again.as_ptr()), "same key must reuse the mapping");

    // A second key at capacity 1 evicts the first.
    let second = runtime.add_cached(2, &code_b).unwrap();
    assert_eq!(runtime.cached_len(), 1);
    assert_ne!(first.as_ptr(), second.as_ptr());

    runtime.release(2);
    assert_eq!(runtime.cached_len(), 0);
}

#[test]
fn x64_call_conv_catalog_matches_environment_default() {
    let sysv_env = Environment::new(Arch::X86_64, Platform::Linux);
    assert_eq!(CallConv::default_for(&sysv_env), CallConv::X64SystemV);
    assert_eq!(CallConv::X64SystemV.info().gp_arg_regs.len(), 6);

    let win_env = Environment::new(Arch::X86_64, Platform::Windows);
    assert_eq!(CallConv::default_for(&win_env), CallConv::X64Windows);
    assert_eq!(CallConv::X64Windows.info().min_stack_arg_size, 32);

    let aapcs_env = Environment::new(Arch::Aarch64, Platform::Linux);
    assert_eq!(CallConv::default_for(&aapcs_env), CallConv::Aarch64Aapcs);
}

#[test]
fn unbound_label_is_reported_at_finalize() {
    let mut holder = CodeHolder::new(x86_env());
    let mut asm = Assembler::new(&mut holder);
    let dangling = asm.new_label();
    asm.emit::<X64Dispatch>(X64Mn::Jmp.id(), &[Operand::Label(dangling)])
        .unwrap();

    let err = holder.finalize().unwrap_err();
    assert!(matches!(err, forgecode::CodegenError::UnboundLabel { .. }));
}

#[test]
fn unknown_inst_id_is_a_silent_no_op() {
    let mut holder = CodeHolder::new(x86_env());
    let mut asm = Assembler::new(&mut holder);
    asm.emit::<X64Dispatch>(forgecode::isa::InstId(9999), &[])
        .unwrap();
    assert_eq!(holder.code_size(), 0);
}

#[test]
fn unused_label_constant_keeps_clippy_quiet() {
    // Exercises LabelId's Debug/Eq derives directly, since every other
    // test only moves LabelId through opaque Assembler/Builder calls.
    assert_eq!(LabelId(3), LabelId(3));
}
