// Overlap resolution - ambiguity suppression and composite groups
//
// Post-processes one tick's full band -> result mapping. Two concerns:
//
// 1. Pairwise suppression: bands with registered frequency overlap (e.g.
//    bass vs. guitar) damp the weaker band's confidence when the stronger
//    one clearly dominates. Only registered pairs are checked; unrelated
//    bands never suppress each other.
// 2. Group aggregation: sibling bands sharing a parent group (kick, snare,
//    hihat -> "drums") fold into one composite result, derived purely from
//    the constituents' results for this tick.

use std::collections::BTreeMap;

use crate::analysis::DetectionResult;
use crate::profile::{AmbiguityPair, BandProfile};

/// Resolves known band ambiguities and computes composite group results
#[derive(Debug)]
pub struct OverlapResolver {
    pairs: Vec<AmbiguityPair>,
    /// Group name -> declared member band names, in registry order
    groups: BTreeMap<String, Vec<String>>,
}

impl OverlapResolver {
    /// Build a resolver from the band registry and registered pairs
    pub fn new(profiles: &[BandProfile], pairs: &[AmbiguityPair]) -> Self {
        let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for profile in profiles {
            if let Some(group) = &profile.group {
                groups
                    .entry(group.clone())
                    .or_default()
                    .push(profile.name.clone());
            }
        }

        Self {
            pairs: pairs.to_vec(),
            groups,
        }
    }

    /// Apply suppression then aggregation to one tick's results
    ///
    /// Composite entries are added under their group name, but only when
    /// every declared member produced a result this tick; otherwise the
    /// group is omitted entirely.
    pub fn resolve(&self, results: &mut BTreeMap<String, DetectionResult>) {
        self.suppress_pairs(results);
        self.aggregate_groups(results);
    }

    /// Damp the weaker band of each registered pair when both are active
    /// and the stronger band's energy exceeds the dominance ratio
    fn suppress_pairs(&self, results: &mut BTreeMap<String, DetectionResult>) {
        for pair in &self.pairs {
            let (energy_a, active_a) = match results.get(&pair.a) {
                Some(r) => (r.energy, r.active),
                None => continue,
            };
            let (energy_b, active_b) = match results.get(&pair.b) {
                Some(r) => (r.energy, r.active),
                None => continue,
            };

            if !(active_a && active_b) {
                continue;
            }

            let dominated = if energy_a > energy_b * pair.dominance_ratio {
                Some(&pair.b)
            } else if energy_b > energy_a * pair.dominance_ratio {
                Some(&pair.a)
            } else {
                None
            };

            if let Some(name) = dominated {
                if let Some(result) = results.get_mut(name) {
                    result.confidence *= pair.damping;
                }
            }
        }
    }

    /// Fold complete groups into composite results
    fn aggregate_groups(&self, results: &mut BTreeMap<String, DetectionResult>) {
        for (group, members) in &self.groups {
            let mut components = BTreeMap::new();
            for member in members {
                match results.get(member) {
                    Some(result) => {
                        components.insert(member.clone(), result.clone());
                    }
                    // A missing member means no composite this tick
                    None => {
                        components.clear();
                        break;
                    }
                }
            }
            if components.len() != members.len() {
                continue;
            }

            let energy = components
                .values()
                .map(|r| r.energy)
                .fold(0.0f32, f32::max);
            let active = components.values().any(|r| r.active);
            let confidence = components
                .values()
                .map(|r| r.confidence)
                .fold(0.0f32, f32::max);

            results.insert(
                group.clone(),
                DetectionResult {
                    energy,
                    active,
                    confidence,
                    components,
                },
            );
        }
    }
}
