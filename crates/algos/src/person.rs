//! The external collaborators the clustered-knows generator builds on top of.
//!
//! The generator never constructs or destroys a [`Person`]; it only reads a
//! person's prescribed degree and capacity and mutates its `knows` set. How a
//! person's target degree is derived from scaling percentages, and whether a
//! candidate edge is accepted, both live outside this crate.

use std::collections::BTreeSet;

use nanorand::WyRand;

/// A population member the generator assigns edges to.
///
/// Persons are referenced by their position in the slice passed to
/// [`crate::driver::ClusteredKnowsGenerator::generate_knows`]; that position
/// is the stable identifier used throughout the generator, including inside
/// the materialized `knows` sets.
pub trait Person {
    /// The degree this invocation should aim for, derived from the step
    /// index and an opaque set of scaling percentages.
    fn target_edges(&self, step_index: u32, percentages: &[f32]) -> u64;

    /// The hard cap on how many acquaintances this person may end up with.
    fn max_knows(&self) -> u64;

    /// An opaque external identity, used only for reporting.
    fn account_id(&self) -> u64;

    /// The current set of neighbor indices.
    fn knows(&self) -> &BTreeSet<usize>;

    /// Mutable access to the set of neighbor indices.
    fn knows_mut(&mut self) -> &mut BTreeSet<usize>;
}

/// A lightweight ledger entry describing a person's role within a single
/// community for the lifetime of one
/// [`generate_knows`](crate::driver::ClusteredKnowsGenerator::generate_knows)
/// invocation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PersonInfo {
    /// Position of this person in the original person array.
    pub index: usize,
    /// The target degree for the current step.
    pub degree: u64,
    /// The upper bound on this person's knows capacity.
    pub original_degree: u64,
}

impl PersonInfo {
    pub fn new(index: usize, degree: u64, original_degree: u64) -> Self {
        Self {
            index,
            degree,
            original_degree,
        }
    }

    /// Total order used to sort both `core` and `periphery`: descending by
    /// degree, ties broken by ascending index.
    pub fn cmp_degree_desc_index_asc(&self, other: &Self) -> std::cmp::Ordering {
        other
            .degree
            .cmp(&self.degree)
            .then_with(|| self.index.cmp(&other.index))
    }
}

/// Attempts to create the `knows` edge between two persons.
///
/// A real implementation may reject a candidate pair because of a
/// correlation or locality model that has nothing to do with this crate;
/// rejections are not errors, they are counted as misses by the caller.
pub trait KnowsFactory<P: Person> {
    /// Tries to link `a` and `b`. On success both persons' `knows` sets are
    /// updated and `true` is returned.
    fn create(&mut self, rng: &mut WyRand, persons: &mut [P], a: usize, b: usize) -> bool;
}

/// The simplest possible [`KnowsFactory`]: accepts any pair that isn't a
/// self-pair, isn't already connected, and stays within both endpoints'
/// `max_knows` budget.
///
/// Callers modelling geographic or interest correlation should provide their
/// own factory; this one exists so the generator is independently testable.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultKnowsFactory;

impl<P: Person> KnowsFactory<P> for DefaultKnowsFactory {
    fn create(&mut self, _rng: &mut WyRand, persons: &mut [P], a: usize, b: usize) -> bool {
        if a == b {
            return false;
        }

        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        let (left, right) = persons.split_at_mut(hi);
        let pa = &mut left[lo];
        let pb = &mut right[0];

        if pa.knows().contains(&b) {
            return false;
        }

        if pa.knows().len() as u64 >= pa.max_knows() || pb.knows().len() as u64 >= pb.max_knows() {
            return false;
        }

        pa.knows_mut().insert(b);
        pb.knows_mut().insert(a);
        true
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    #[derive(Debug, Clone)]
    pub struct FakePerson {
        pub target_degree: u64,
        pub max_knows: u64,
        pub account_id: u64,
        pub knows: BTreeSet<usize>,
    }

    impl FakePerson {
        pub fn new(target_degree: u64, max_knows: u64, account_id: u64) -> Self {
            Self {
                target_degree,
                max_knows,
                account_id,
                knows: BTreeSet::new(),
            }
        }
    }

    impl Person for FakePerson {
        fn target_edges(&self, _step_index: u32, _percentages: &[f32]) -> u64 {
            self.target_degree
        }

        fn max_knows(&self) -> u64 {
            self.max_knows
        }

        fn account_id(&self) -> u64 {
            self.account_id
        }

        fn knows(&self) -> &BTreeSet<usize> {
            &self.knows
        }

        fn knows_mut(&mut self) -> &mut BTreeSet<usize> {
            &mut self.knows
        }
    }

    pub fn population(degrees: &[u64]) -> Vec<FakePerson> {
        degrees
            .iter()
            .enumerate()
            .map(|(i, &d)| FakePerson::new(d, d.max(1) * 4, i as u64))
            .collect()
    }
}
