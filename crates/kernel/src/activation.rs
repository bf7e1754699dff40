//! Per-skeleton selection of which competing shapes stay active.
//!
//! Shapes without a disable tag feed their tags into the skeleton's tag pool.
//! Shapes with a disable tag compete in a bucket keyed by that tag: if the tag
//! is in the pool the whole bucket is disabled, otherwise only the highest
//! priority shape survives. Ties go to the lowest `(SystemId, shape index)`.
//!
//! # Invariants
//! - Every shape's `disabled` flag is rewritten on each pass.
//! - Pool contributors are never disabled here.

use std::collections::{BTreeMap, BTreeSet};

use smp_common::{AnchorId, SystemId, TagId};

use crate::system::System;

/// Counts from one resolver pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivationSummary {
    pub groups: usize,
    pub buckets: usize,
    pub vetoed_buckets: usize,
    pub disabled: usize,
}

#[derive(Debug, Clone, Copy)]
struct Competitor {
    priority: i32,
    key: (Option<SystemId>, usize),
    slot: (usize, usize),
}

#[derive(Debug, Default)]
struct ActivationGroup<'a> {
    tags: BTreeSet<&'a TagId>,
    buckets: BTreeMap<&'a TagId, Vec<Competitor>>,
}

/// Recompute `disabled` for every shape of every system.
pub fn resolve(systems: &mut [System]) -> ActivationSummary {
    let mut summary = ActivationSummary::default();
    let mut to_disable: Vec<(usize, usize)> = Vec::new();

    {
        let mut groups: BTreeMap<AnchorId, ActivationGroup<'_>> = BTreeMap::new();
        for (si, system) in systems.iter().enumerate() {
            let Some(anchor) = system.skeleton() else {
                continue;
            };
            let group = groups.entry(anchor).or_default();
            for (mi, shape) in system.meshes.iter().enumerate() {
                match &shape.disable_tag {
                    None => group.tags.extend(shape.tags.iter()),
                    Some(tag) => group.buckets.entry(tag).or_default().push(Competitor {
                        priority: shape.disable_priority,
                        key: (system.id, mi),
                        slot: (si, mi),
                    }),
                }
            }
        }

        summary.groups = groups.len();
        for group in groups.values_mut() {
            for (tag, competitors) in group.buckets.iter_mut() {
                summary.buckets += 1;
                if group.tags.contains(tag) {
                    summary.vetoed_buckets += 1;
                    to_disable.extend(competitors.iter().map(|c| c.slot));
                    continue;
                }
                competitors.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.key.cmp(&b.key)));
                to_disable.extend(competitors.iter().skip(1).map(|c| c.slot));
            }
        }
    }

    for system in systems.iter_mut() {
        for shape in &mut system.meshes {
            shape.disabled = false;
        }
    }
    for (si, mi) in to_disable {
        systems[si].meshes[mi].disabled = true;
    }
    summary.disabled = systems
        .iter()
        .flat_map(|s| s.meshes.iter())
        .filter(|m| m.disabled)
        .count();
    summary
}
