use super::potentials::LennardJones;
use crate::core::models::ids::TypeId;
use std::collections::HashMap;

/// Potentials keyed by an unordered pair of particle types.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PotentialTable {
    entries: HashMap<(TypeId, TypeId), LennardJones>,
}

#[inline]
fn key(type_a: TypeId, type_b: TypeId) -> (TypeId, TypeId) {
    if type_a <= type_b {
        (type_a, type_b)
    } else {
        (type_b, type_a)
    }
}

impl PotentialTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the potential for a type pair, returning the one it replaces.
    pub fn set(
        &mut self,
        type_a: TypeId,
        type_b: TypeId,
        potential: LennardJones,
    ) -> Option<LennardJones> {
        self.entries.insert(key(type_a, type_b), potential)
    }

    #[inline]
    pub fn get(&self, type_a: TypeId, type_b: TypeId) -> Option<&LennardJones> {
        self.entries.get(&key(type_a, type_b))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Largest cutoff of any registered potential, 0 for an empty table.
    pub fn max_cutoff(&self) -> f64 {
        self.entries
            .values()
            .map(LennardJones::cutoff)
            .fold(0.0, f64::max)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(TypeId, TypeId), &LennardJones)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_symmetric_in_the_type_pair() {
        let mut table = PotentialTable::new();
        let lj = LennardJones::new(1.0, 1.0, 2.5).unwrap();
        table.set(1, 0, lj);
        assert_eq!(table.get(0, 1), Some(&lj));
        assert_eq!(table.get(1, 0), Some(&lj));
        assert_eq!(table.get(1, 1), None);
    }

    #[test]
    fn set_replaces_existing_entry() {
        let mut table = PotentialTable::new();
        let first = LennardJones::new(1.0, 1.0, 2.5).unwrap();
        let second = LennardJones::new(0.8, 0.8, 2.5).unwrap();
        assert_eq!(table.set(0, 0, first), None);
        assert_eq!(table.set(0, 0, second), Some(first));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn max_cutoff_covers_all_entries() {
        let mut table = PotentialTable::new();
        assert_eq!(table.max_cutoff(), 0.0);
        table.set(0, 0, LennardJones::new(1.0, 1.0, 2.5).unwrap());
        table.set(1, 1, LennardJones::new(1.0, 1.0, 3.0).unwrap());
        assert_eq!(table.max_cutoff(), 3.0);
    }
}
