//! Replay order of stored particles.

use crate::core::records::ParticleRecord;
use std::collections::{BTreeMap, HashMap};

/// Particles ordered so every composite comes before the particles using it.
///
/// Returns the ordered names and the names that cannot be ordered: members
/// of a composite cycle and anything that depends on them. Composites that
/// are not in `particles` are left to the registry to reject.
pub fn particle_order(particles: &BTreeMap<String, ParticleRecord>) -> (Vec<String>, Vec<String>) {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Visiting,
        Done,
        Blocked,
    }

    fn visit(
        name: &str,
        particles: &BTreeMap<String, ParticleRecord>,
        marks: &mut HashMap<String, Mark>,
        order: &mut Vec<String>,
    ) -> bool {
        match marks.get(name) {
            Some(Mark::Done) => return true,
            Some(Mark::Visiting) | Some(Mark::Blocked) => return false,
            None => {}
        }
        let Some(record) = particles.get(name) else {
            return true;
        };
        marks.insert(name.to_string(), Mark::Visiting);
        let mut ok = true;
        for (_, composite) in record.particle.composites() {
            if !visit(composite, particles, marks, order) {
                ok = false;
            }
        }
        if ok {
            marks.insert(name.to_string(), Mark::Done);
            order.push(name.to_string());
        } else {
            marks.insert(name.to_string(), Mark::Blocked);
        }
        ok
    }

    let mut marks = HashMap::new();
    let mut order = Vec::new();
    for name in particles.keys() {
        visit(name, particles, &mut marks, &mut order);
    }
    let blocked = particles
        .keys()
        .filter(|name| marks.get(*name) == Some(&Mark::Blocked))
        .cloned()
        .collect();
    (order, blocked)
}
