//! Three-pass edge materialization: core-core, core-periphery, residual.

use nanorand::{Rng, WyRand};

use crate::clustering::ClusteringInfo;
use crate::community::{consume_periphery_slots, Community};
use crate::person::{KnowsFactory, Person};
use crate::stats::Stats;

/// Runs all three materialization sub-passes, in order, over every
/// community. `cinfo` must already reflect the probabilities the
/// communities currently carry (i.e. `estimate_cc_community`/
/// `compute_community_info` have been run for the current `p` values).
pub fn materialize<P: Person>(
    rng: &mut WyRand,
    persons: &mut [P],
    communities: &[Community],
    cinfo: &ClusteringInfo,
    factory: &mut impl KnowsFactory<P>,
    stats: &mut Stats,
) {
    for community in communities {
        materialize_core_core(rng, persons, community, factory, stats);
    }
    for community in communities {
        materialize_core_periphery(rng, persons, community, cinfo, factory, stats);
    }
    materialize_residual(rng, persons, communities, factory, stats);
}

fn materialize_core_core<P: Person>(
    rng: &mut WyRand,
    persons: &mut [P],
    community: &Community,
    factory: &mut impl KnowsFactory<P>,
    stats: &mut Stats,
) {
    let core = &community.core;
    for i in 0..core.len() {
        for j in (i + 1)..core.len() {
            let draw: f32 = rng.generate();
            if draw as f64 <= community.p {
                if factory.create(rng, persons, core[i].index, core[j].index) {
                    stats.num_core_core_edges += 1;
                } else {
                    stats.num_misses += 1;
                }
            }
        }
    }
}

fn materialize_core_periphery<P: Person>(
    rng: &mut WyRand,
    persons: &mut [P],
    community: &Community,
    cinfo: &ClusteringInfo,
    factory: &mut impl KnowsFactory<P>,
    stats: &mut Stats,
) {
    let mut periphery_budget: Vec<f64> = community
        .periphery
        .iter()
        .map(|pi| pi.degree as f64)
        .collect();
    let mut k = 0usize;

    for pi in &community.core {
        let need = cinfo.expected_periphery_degree(pi.index);
        let mut taken_slots: Vec<usize> = Vec::new();
        consume_periphery_slots(
            community.periphery.len(),
            &mut periphery_budget,
            &mut k,
            need,
            |slot| taken_slots.push(slot),
        );
        for slot in taken_slots {
            let periphery_index = community.periphery[slot].index;
            if factory.create(rng, persons, pi.index, periphery_index) {
                stats.num_core_periphery_edges += 1;
            } else {
                stats.num_misses += 1;
            }
        }
    }

    debug_assert!(
        community
            .periphery
            .iter()
            .all(|pi| persons[pi.index].knows().len() as u64 <= pi.degree),
        "a periphery member's realized degree exceeded its target in community {}",
        community.id
    );
}

fn materialize_residual<P: Person>(
    rng: &mut WyRand,
    persons: &mut [P],
    communities: &[Community],
    factory: &mut impl KnowsFactory<P>,
    stats: &mut Stats,
) {
    let mut stubs: Vec<usize> = Vec::new();
    for community in communities {
        for pi in &community.core {
            let deficit = pi.degree as i64 - persons[pi.index].knows().len() as i64;
            for _ in 0..deficit.max(0) {
                stubs.push(pi.index);
            }
        }
    }

    let mut order: Vec<usize> = (0..stubs.len()).collect();
    rng.shuffle(&mut stubs);
    rng.shuffle(&mut order);

    let mut cursor = 0usize;
    while stubs.len().saturating_sub(cursor) >= 2 {
        let a = stubs[order[cursor]];
        let b = stubs[order[cursor + 1]];
        cursor += 2;

        if a == b {
            stats.num_misses += 1;
            continue;
        }

        if factory.create(rng, persons, a, b) {
            stats.num_core_external_edges += 1;
        } else {
            stats.num_misses += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clustering::ClusteringInfo;
    use crate::community::partition;
    use crate::person::{test_support::population, DefaultKnowsFactory};

    #[test]
    fn core_core_pass_respects_full_probability() {
        let mut persons = population(&[2, 2, 2]);
        let communities = partition(&persons, 0, &[]);
        let mut cinfo = ClusteringInfo::new(persons.len(), &communities);
        for c in &communities {
            cinfo.compute_community_info(c, 1.0);
        }

        let mut rng = WyRand::new_seed(1);
        let mut factory = DefaultKnowsFactory;
        let mut stats = Stats::new();
        materialize(
            &mut rng,
            &mut persons,
            &communities,
            &cinfo,
            &mut factory,
            &mut stats,
        );

        // At p = 1.0 with a 3-clique-sized core, every core-core pair connects.
        assert_eq!(stats.num_core_core_edges, 3);
        for p in &persons {
            assert_eq!(p.knows().len(), 2);
        }
    }

    #[test]
    fn zero_probability_yields_no_core_core_edges() {
        let mut persons = population(&[2, 2, 2]);
        let mut communities = partition(&persons, 0, &[]);
        for c in &mut communities {
            c.p = 0.0;
        }
        let mut cinfo = ClusteringInfo::new(persons.len(), &communities);
        for c in &communities {
            cinfo.compute_community_info(c, 0.0);
        }

        let mut rng = WyRand::new_seed(2);
        let mut factory = DefaultKnowsFactory;
        let mut stats = Stats::new();
        materialize(
            &mut rng,
            &mut persons,
            &communities,
            &cinfo,
            &mut factory,
            &mut stats,
        );

        assert_eq!(stats.num_core_core_edges, 0);
        // p = 0.0 means every Bernoulli draw fails, so `Knows.create` is
        // never even attempted: a failed draw is not a miss.
        assert_eq!(stats.num_misses, 0);
    }

    #[test]
    fn realized_degree_never_exceeds_capacity() {
        let mut persons = population(&[5, 1, 0, 3, 2, 8, 0, 1, 4, 2]);
        let communities = partition(&persons, 0, &[]);
        let mut cinfo = ClusteringInfo::new(persons.len(), &communities);
        for c in &communities {
            cinfo.compute_community_info(c, 0.7);
        }

        let mut rng = WyRand::new_seed(9);
        let mut factory = DefaultKnowsFactory;
        let mut stats = Stats::new();
        materialize(
            &mut rng,
            &mut persons,
            &communities,
            &cinfo,
            &mut factory,
            &mut stats,
        );

        for p in &persons {
            assert!(p.knows().len() as u64 <= p.max_knows());
        }
    }
}
