//! The linear-scan allocator proper (spec §4.5): sort by start, expire
//! the active set, and spill whichever active interval ends latest when
//! the pool for a given register kind runs dry.

use hashbrown::HashMap;

use crate::operand::RegKind;

use super::interval::LiveInterval;

/// Where a virtual register ended up after allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment {
    /// Assigned to a physical register id.
    Physical(u32),
    /// Spilled to a byte offset within the function's spill area.
    Spill(u32),
}

struct ActiveEntry {
    interval: LiveInterval,
    phys: u32,
}

/// A simple bump allocator for the spill area: 8 bytes per GP slot, 16
/// bytes per vector slot, the whole area kept 16-byte aligned per spec
/// §4.5/§4.6.
struct SpillArea {
    next_offset: u32,
}

impl SpillArea {
    fn new() -> Self {
        SpillArea { next_offset: 0 }
    }

    fn allocate(&mut self, kind: RegKind) -> u32 {
        let size = match kind {
            RegKind::Vec => 16,
            _ => 8,
        };
        let aligned = (self.next_offset + size - 1) / size * size;
        self.next_offset = aligned + size;
        aligned
    }

    /// Total size of the spill area, rounded up to 16 bytes.
    fn total_size(&self) -> u32 {
        (self.next_offset + 15) / 16 * 16
    }
}

/// Allocate every interval in `intervals` (already sorted by `start`) to
/// a physical register from `gp_pool`/`vec_pool`, spilling when a pool is
/// exhausted. Returns the per-virtual-register assignment map and the
/// total spill area size in bytes.
pub fn allocate(
    intervals: &[LiveInterval],
    gp_pool: &[u32],
    vec_pool: &[u32],
) -> (HashMap<u32, Assignment>, u32) {
    let mut assignments = HashMap::new();
    let mut spill_area = SpillArea::new();

    let mut free_gp: Vec<u32> = gp_pool.to_vec();
    let mut free_vec: Vec<u32> = vec_pool.to_vec();
    let mut active_gp: Vec<ActiveEntry> = Vec::new();
    let mut active_vec: Vec<ActiveEntry> = Vec::new();

    for interval in intervals {
        let (free, active) = match interval.kind {
            RegKind::Vec => (&mut free_vec, &mut active_vec),
            _ => (&mut free_gp, &mut active_gp),
        };

        expire_old(active, interval.start, free);

        if let Some(phys) = free.pop() {
            active.push(ActiveEntry {
                interval: *interval,
                phys,
            });
            active.sort_by_key(|e| e.interval.end);
            assignments.insert(interval.virt_id, Assignment::Physical(phys));
            continue;
        }

        // Pool exhausted: spill whichever active interval ends latest,
        // unless the current interval itself ends later (in which case
        // spilling the newcomer is strictly better).
        match active.last() {
            Some(latest) if latest.interval.end > interval.end => {
                let evicted = active.pop().unwrap();
                assignments.insert(
                    evicted.interval.virt_id,
                    Assignment::Spill(spill_area.allocate(evicted.interval.kind)),
                );
                active.push(ActiveEntry {
                    interval: *interval,
                    phys: evicted.phys,
                });
                active.sort_by_key(|e| e.interval.end);
                assignments.insert(interval.virt_id, Assignment::Physical(evicted.phys));
            }
            _ => {
                assignments.insert(
                    interval.virt_id,
                    Assignment::Spill(spill_area.allocate(interval.kind)),
                );
            }
        }
    }

    (assignments, spill_area.total_size())
}

fn expire_old(active: &mut Vec<ActiveEntry>, start: u32, free: &mut Vec<u32>) {
    active.retain(|entry| {
        if entry.interval.end < start {
            free.push(entry.phys);
            false
        } else {
            true
        }
    });
}
