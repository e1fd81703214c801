//! Spill materialization (spec §4.5): rewrite every virtual register
//! reference into either its assigned physical register, or a scratch
//! register loaded from (and, for the first/def operand, stored back to)
//! its spill slot.
//!
//! The def/use distinction this pass needs is read off operand
//! *position*, not a separate liveness pass: every mnemonic this crate's
//! dispatchers implement places its destination operand first
//! (`Mov dst, src`, `Add dst, lhs, rhs`, `Ldr rt, [mem]`, ...), so operand
//! index 0 is always written and every other register-bearing operand
//! (including a `Memory` operand's base/index) is only ever read. A
//! spilled operand at index 0 is both reloaded before the instruction
//! (in case the form is read-modify-write, e.g. `add dst, dst, imm`) and
//! stored back after.

use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::emit::node::{Node, NodeList};
use crate::error::{CodegenError, CodegenResult};
use crate::isa::InstId;
use crate::operand::{Memory, Operand, Register};

use super::allocator::Assignment;

fn resolve_register(
    reg: Register,
    assignments: &HashMap<u32, Assignment>,
    scratch_pool: &[u32],
    used_this_node: &mut Vec<u32>,
    is_def: bool,
    loads: &mut Vec<Node>,
    stores: &mut Vec<Node>,
    frame_base: Register,
    load_inst: InstId,
    store_inst: InstId,
) -> CodegenResult<Register> {
    if !reg.is_virtual() {
        used_this_node.push(reg.id);
        return Ok(reg);
    }
    match assignments.get(&reg.id) {
        Some(Assignment::Physical(p)) => {
            used_this_node.push(*p);
            Ok(Register::physical(reg.kind, *p, reg.size_bits))
        }
        Some(Assignment::Spill(slot)) => {
            let scratch = *scratch_pool
                .iter()
                .find(|id| !used_this_node.contains(id))
                .ok_or(CodegenError::RegistersExhausted { node_index: 0 })?;
            used_this_node.push(scratch);
            let scratch_reg = Register::physical(reg.kind, scratch, reg.size_bits);
            let mem = Operand::Memory(Memory::base_offset(frame_base, *slot as i32, reg.size_bits));
            loads.push(Node::Inst {
                inst_id: load_inst,
                operands: SmallVec::from_slice(&[Operand::Register(scratch_reg), mem]),
            });
            if is_def {
                let mem = Operand::Memory(Memory::base_offset(frame_base, *slot as i32, reg.size_bits));
                stores.push(Node::Inst {
                    inst_id: store_inst,
                    operands: SmallVec::from_slice(&[mem, Operand::Register(scratch_reg)]),
                });
            }
            Ok(scratch_reg)
        }
        None => Ok(reg), // referenced but never live anywhere: leave as-is
    }
}

/// Rewrite `nodes`, replacing every virtual register with its assigned
/// physical register or a scratch-materialized spill. `load_inst`/
/// `store_inst` are the architecture's generic register<->memory move
/// mnemonic ids (x86-64: `Mov` for both directions; AArch64: `Ldr`/`Str`).
pub fn materialize(
    nodes: &[Node],
    assignments: &HashMap<u32, Assignment>,
    scratch_pool: &[u32],
    frame_base: Register,
    load_inst: InstId,
    store_inst: InstId,
) -> CodegenResult<NodeList> {
    let mut out = NodeList::new();

    for node in nodes {
        let Node::Inst { inst_id, operands } = node else {
            out.push(node.clone());
            continue;
        };

        let mut used_this_node: Vec<u32> = Vec::new();
        let mut loads = Vec::new();
        let mut stores = Vec::new();
        let mut new_operands = SmallVec::<[Operand; 4]>::new();

        for (idx, operand) in operands.iter().enumerate() {
            let is_def = idx == 0;
            let rewritten = match operand {
                Operand::Register(r) => Operand::Register(resolve_register(
                    *r,
                    assignments,
                    scratch_pool,
                    &mut used_this_node,
                    is_def,
                    &mut loads,
                    &mut stores,
                    frame_base,
                    load_inst,
                    store_inst,
                )?),
                Operand::Memory(m) => {
                    let base = m
                        .base
                        .map(|b| {
                            resolve_register(
                                b,
                                assignments,
                                scratch_pool,
                                &mut used_this_node,
                                false,
                                &mut loads,
                                &mut stores,
                                frame_base,
                                load_inst,
                                store_inst,
                            )
                        })
                        .transpose()?;
                    let index = m
                        .index
                        .map(|i| {
                            resolve_register(
                                i,
                                assignments,
                                scratch_pool,
                                &mut used_this_node,
                                false,
                                &mut loads,
                                &mut stores,
                                frame_base,
                                load_inst,
                                store_inst,
                            )
                        })
                        .transpose()?;
                    Operand::Memory(Memory { base, index, ..*m })
                }
                other => other.clone(),
            };
            new_operands.push(rewritten);
        }

        out.extend(loads);
        out.push(Node::Inst {
            inst_id: *inst_id,
            operands: new_operands,
        });
        out.extend(stores);
    }

    Ok(out)
}
