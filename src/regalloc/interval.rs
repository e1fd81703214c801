//! Live interval construction over a recorded node list (spec §4.5).
//!
//! Position `node_index * 2` gives every node an even "point"; two
//! positions per node leaves room for future def/use splitting without
//! renumbering, matching the even/odd position convention the teacher's
//! own liveness analysis uses over SSA values, simplified here since this
//! crate's functions are straight-line (no CFG merges to reconcile,
//! the non-goal spec §1 excludes).

use hashbrown::HashMap;

use crate::emit::node::Node;
use crate::operand::{RegKind, VIRT_BASE};

/// A virtual register's identity, as handed out by
/// [`crate::emit::compiler::Compiler::new_gp`]/`new_vec`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VirtReg {
    pub id: u32,
    pub kind: RegKind,
    pub size_bits: u16,
}

/// The inclusive `[start, end]` node-position range over which a virtual
/// register is live, derived from its first and last appearance in the
/// node list.
#[derive(Debug, Clone, Copy)]
pub struct LiveInterval {
    pub virt_id: u32,
    pub kind: RegKind,
    pub size_bits: u16,
    pub start: u32,
    pub end: u32,
}

/// Build one [`LiveInterval`] per virtual register referenced in `nodes`,
/// sorted by `start`. A virtual register declared (via `new_gp`/`new_vec`)
/// but never referenced by any instruction gets no interval and is
/// simply never allocated.
pub fn build_intervals(nodes: &[Node], virt_regs: &[VirtReg]) -> Vec<LiveInterval> {
    let by_id: HashMap<u32, VirtReg> = virt_regs.iter().map(|v| (v.id, *v)).collect();
    let mut spans: HashMap<u32, (u32, u32)> = HashMap::new();

    for (index, node) in nodes.iter().enumerate() {
        let Node::Inst { operands, .. } = node else {
            continue;
        };
        let pos = (index as u32) * 2;
        for operand in operands {
            for reg in operand.registers().iter() {
                if reg.id < VIRT_BASE {
                    continue;
                }
                spans
                    .entry(reg.id)
                    .and_modify(|(_, end)| *end = pos)
                    .or_insert((pos, pos));
            }
        }
    }

    let mut intervals: Vec<LiveInterval> = spans
        .into_iter()
        .filter_map(|(virt_id, (start, end))| {
            by_id.get(&virt_id).map(|v| LiveInterval {
                virt_id,
                kind: v.kind,
                size_bits: v.size_bits,
                start,
                end,
            })
        })
        .collect();
    intervals.sort_by_key(|iv| iv.start);
    intervals
}
