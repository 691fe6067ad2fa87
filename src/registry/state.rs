//! Pure registry index, without any synchronization.

use crate::core::definitions::{Condition, Feature, Particle, Transformation};
use crate::core::records::{
    ArtifactKind, ConditionRecord, FeatureRecord, ParticleRecord, Record, TransformationRecord,
};
use crate::types::address::Address;
use std::collections::{BTreeSet, HashMap, HashSet};
use thiserror::Error;

/// Reasons an insertion is rejected.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("{0} name is empty")]
    EmptyName(ArtifactKind),
    #[error("{kind} `{name}` already registered at {address}")]
    Duplicate {
        kind: ArtifactKind,
        name: String,
        address: Address,
    },
    #[error("invalid owner address `{0}`")]
    InvalidOwner(String),
    #[error("cannot find transformation `{transformation}` used in feature `{feature}`")]
    MissingTransformation {
        feature: String,
        transformation: String,
    },
    #[error("cannot find feature `{feature}` used in particle `{particle}`")]
    MissingFeature { particle: String, feature: String },
    #[error("particle `{particle}` has {actual} composites, feature has {expected} dimensions")]
    DimensionsMismatch {
        particle: String,
        expected: usize,
        actual: usize,
    },
    #[error("cannot find particle `{composite}` used in particle `{particle}`")]
    MissingComposite { particle: String, composite: String },
    #[error("particle `{particle}` reaches itself through composite `{composite}`")]
    CompositeCycle { particle: String, composite: String },
    #[error("registry is not running")]
    Closed,
}

/// Records of one kind.
///
/// A bucket exists only while it holds at least one record. `newest` keeps
/// the addresses of each name in insertion order, newest last.
#[derive(Debug)]
pub struct Table<R> {
    buckets: HashMap<String, HashMap<Address, R>>,
    newest: HashMap<String, Vec<Address>>,
    owned: HashMap<Address, BTreeSet<String>>,
}

impl<R> Default for Table<R> {
    fn default() -> Self {
        Self {
            buckets: HashMap::new(),
            newest: HashMap::new(),
            owned: HashMap::new(),
        }
    }
}

impl<R: Record> Table<R> {
    pub fn contains_bucket(&self, name: &str) -> bool {
        self.buckets.contains_key(name)
    }

    /// True when no record is registered under `name`, including when the
    /// bucket does not exist.
    pub fn is_bucket_empty(&self, name: &str) -> bool {
        self.buckets.get(name).is_none_or(HashMap::is_empty)
    }

    pub fn get(&self, name: &str, address: &Address) -> Option<&R> {
        self.buckets.get(name)?.get(address)
    }

    pub fn newest_address(&self, name: &str) -> Option<Address> {
        self.newest.get(name)?.last().copied()
    }

    pub fn newest(&self, name: &str) -> Option<&R> {
        let address = self.newest_address(name)?;
        self.get(name, &address)
    }

    pub fn owned(&self, owner: &Address) -> BTreeSet<String> {
        self.owned.get(owner).cloned().unwrap_or_default()
    }

    /// Number of registered records across all names.
    pub fn len(&self) -> usize {
        self.buckets.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(&mut self, address: Address, owner: Address, record: R) {
        let name = record.name().to_string();
        self.owned.entry(owner).or_default().insert(name.clone());
        self.newest.entry(name.clone()).or_default().push(address);
        self.buckets.entry(name).or_default().insert(address, record);
    }

    /// Takes out the record at `(name, address)`. The newest pointer falls
    /// back to the previous insertion, and empty entries are dropped.
    fn remove(&mut self, name: &str, address: &Address) -> Option<R> {
        let bucket = self.buckets.get_mut(name)?;
        let record = bucket.remove(address)?;
        let still_owned = bucket.values().any(|r| r.owner() == record.owner());
        if bucket.is_empty() {
            self.buckets.remove(name);
        }

        if let Some(history) = self.newest.get_mut(name) {
            history.retain(|a| a != address);
            if history.is_empty() {
                self.newest.remove(name);
            }
        }

        if !still_owned
            && let Ok(owner) = Address::from_hex(record.owner())
            && let Some(names) = self.owned.get_mut(&owner)
        {
            names.remove(name);
            if names.is_empty() {
                self.owned.remove(&owner);
            }
        }
        Some(record)
    }
}

/// The whole index: one table per kind.
#[derive(Debug, Default)]
pub struct RegistryState {
    pub transformations: Table<TransformationRecord>,
    pub conditions: Table<ConditionRecord>,
    pub features: Table<FeatureRecord>,
    pub particles: Table<ParticleRecord>,
}

/// Records the registry can index.
pub trait Indexed: Record {
    fn table(state: &RegistryState) -> &Table<Self>;

    fn table_mut(state: &mut RegistryState) -> &mut Table<Self>;

    /// Cross-kind checks against what is already registered.
    fn check_references(&self, state: &RegistryState) -> Result<(), RegistryError>;
}

impl Indexed for TransformationRecord {
    fn table(state: &RegistryState) -> &Table<Self> {
        &state.transformations
    }

    fn table_mut(state: &mut RegistryState) -> &mut Table<Self> {
        &mut state.transformations
    }

    fn check_references(&self, _: &RegistryState) -> Result<(), RegistryError> {
        Ok(())
    }
}

impl Indexed for ConditionRecord {
    fn table(state: &RegistryState) -> &Table<Self> {
        &state.conditions
    }

    fn table_mut(state: &mut RegistryState) -> &mut Table<Self> {
        &mut state.conditions
    }

    fn check_references(&self, _: &RegistryState) -> Result<(), RegistryError> {
        Ok(())
    }
}

impl Indexed for FeatureRecord {
    fn table(state: &RegistryState) -> &Table<Self> {
        &state.features
    }

    fn table_mut(state: &mut RegistryState) -> &mut Table<Self> {
        &mut state.features
    }

    fn check_references(&self, state: &RegistryState) -> Result<(), RegistryError> {
        for transformation in self.feature.transformation_names() {
            if state.transformations.is_bucket_empty(transformation) {
                return Err(RegistryError::MissingTransformation {
                    feature: self.feature.name.clone(),
                    transformation: transformation.to_string(),
                });
            }
        }
        Ok(())
    }
}

impl Indexed for ParticleRecord {
    fn table(state: &RegistryState) -> &Table<Self> {
        &state.particles
    }

    fn table_mut(state: &mut RegistryState) -> &mut Table<Self> {
        &mut state.particles
    }

    fn check_references(&self, state: &RegistryState) -> Result<(), RegistryError> {
        let particle = &self.particle;
        let feature = state
            .features
            .newest(&particle.feature_name)
            .ok_or_else(|| RegistryError::MissingFeature {
                particle: particle.name.clone(),
                feature: particle.feature_name.clone(),
            })?;

        let expected = feature.feature.dimensions.len();
        if particle.composite_names.len() != expected {
            return Err(RegistryError::DimensionsMismatch {
                particle: particle.name.clone(),
                expected,
                actual: particle.composite_names.len(),
            });
        }

        for (_, composite) in particle.composites() {
            if state.particles.is_bucket_empty(composite) {
                return Err(RegistryError::MissingComposite {
                    particle: particle.name.clone(),
                    composite: composite.to_string(),
                });
            }
            if reaches(state, composite, &particle.name) {
                return Err(RegistryError::CompositeCycle {
                    particle: particle.name.clone(),
                    composite: composite.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Whether `target` is reachable from `start` through the newest version of
/// each particle's composites.
fn reaches(state: &RegistryState, start: &str, target: &str) -> bool {
    let mut seen = HashSet::new();
    let mut pending = vec![start.to_string()];
    while let Some(name) = pending.pop() {
        if name == target {
            return true;
        }
        if !seen.insert(name.clone()) {
            continue;
        }
        if let Some(record) = state.particles.newest(&name) {
            pending.extend(
                record
                    .particle
                    .composites()
                    .map(|(_, composite)| composite.to_string()),
            );
        }
    }
    false
}

impl RegistryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and inserts `record` at `address`.
    ///
    /// Either every index is updated or none is.
    pub fn add<R: Indexed>(&mut self, address: Address, record: R) -> Result<(), RegistryError> {
        if record.name().is_empty() {
            return Err(RegistryError::EmptyName(R::KIND));
        }
        if R::table(self).get(record.name(), &address).is_some() {
            return Err(RegistryError::Duplicate {
                kind: R::KIND,
                name: record.name().to_string(),
                address,
            });
        }
        record.check_references(self)?;
        let owner = Address::from_hex(record.owner())
            .map_err(|_| RegistryError::InvalidOwner(record.owner().to_string()))?;
        R::table_mut(self).insert(address, owner, record);
        Ok(())
    }

    /// Undoes an insertion. Returns the removed record, `None` if there was
    /// nothing at `(name, address)`.
    pub(crate) fn remove<R: Indexed>(&mut self, name: &str, address: &Address) -> Option<R> {
        R::table_mut(self).remove(name, address)
    }

    pub fn get<R: Indexed>(&self, name: &str, address: &Address) -> Option<&R::Definition> {
        R::table(self).get(name, address).map(R::definition)
    }

    pub fn newest<R: Indexed>(&self, name: &str) -> Option<&R::Definition> {
        R::table(self).newest(name).map(R::definition)
    }

    pub fn newest_address<R: Indexed>(&self, name: &str) -> Option<Address> {
        R::table(self).newest_address(name)
    }

    pub fn owned<R: Indexed>(&self, owner: &Address) -> BTreeSet<String> {
        R::table(self).owned(owner)
    }

    /// True when at least one record is registered under `name`.
    pub fn has<R: Indexed>(&self, name: &str) -> bool {
        !R::table(self).is_bucket_empty(name)
    }

    pub fn transformation(&self, name: &str) -> Option<&Transformation> {
        self.newest::<TransformationRecord>(name)
    }

    pub fn condition(&self, name: &str) -> Option<&Condition> {
        self.newest::<ConditionRecord>(name)
    }

    pub fn feature(&self, name: &str) -> Option<&Feature> {
        self.newest::<FeatureRecord>(name)
    }

    pub fn particle(&self, name: &str) -> Option<&Particle> {
        self.newest::<ParticleRecord>(name)
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::core::definitions::{Dimension, TransformationDef};

    pub const OWNER: &str = "00000000000000000000000000000000000000aa";

    pub fn addr(n: u8) -> Address {
        let mut a = [0u8; 20];
        a[19] = n;
        Address(a)
    }

    pub fn transformation(name: &str) -> TransformationRecord {
        TransformationRecord::new(
            Transformation {
                name: name.into(),
                sol_src: "return x + args[0];".into(),
            },
            OWNER,
        )
    }

    pub fn feature(name: &str, dims: &[&[&str]]) -> FeatureRecord {
        FeatureRecord::new(
            Feature {
                name: name.into(),
                dimensions: dims
                    .iter()
                    .map(|ts| Dimension {
                        transformations: ts
                            .iter()
                            .map(|t| TransformationDef {
                                name: t.to_string(),
                                args: vec![1],
                            })
                            .collect(),
                    })
                    .collect(),
            },
            OWNER,
        )
    }

    pub fn particle(name: &str, feature: &str, composites: &[&str]) -> ParticleRecord {
        ParticleRecord::new(
            Particle {
                name: name.into(),
                feature_name: feature.into(),
                composite_names: composites.iter().map(|c| c.to_string()).collect(),
                condition_name: "Always".into(),
                condition_args: vec![],
            },
            OWNER,
        )
    }

    fn with_feature() -> RegistryState {
        let mut state = RegistryState::new();
        state.add(addr(1), transformation("Add")).unwrap();
        state.add(addr(2), feature("F", &[&["Add"]])).unwrap();
        state
    }

    // ========== Insertion Tests ==========

    #[test]
    fn feature_requires_registered_transformation() {
        let mut state = RegistryState::new();
        assert_eq!(
            state.add(addr(2), feature("F", &[&["Add"]])),
            Err(RegistryError::MissingTransformation {
                feature: "F".into(),
                transformation: "Add".into()
            })
        );
        state.add(addr(1), transformation("Add")).unwrap();
        state.add(addr(2), feature("F", &[&["Add"]])).unwrap();
        assert!(state.has::<FeatureRecord>("F"));
    }

    #[test]
    fn rejected_insert_creates_no_bucket() {
        let mut state = RegistryState::new();
        let mut bad = transformation("Add");
        bad.owner = "not-hex".into();
        assert_eq!(
            state.add(addr(1), bad),
            Err(RegistryError::InvalidOwner("not-hex".into()))
        );
        assert!(state.add(addr(2), feature("F", &[&["Missing"]])).is_err());
        assert!(state.add(addr(3), particle("P", "F", &[""])).is_err());
        assert!(!state.transformations.contains_bucket("Add"));
        assert!(!state.features.contains_bucket("F"));
        assert!(!state.particles.contains_bucket("P"));
        assert!(!state.has::<TransformationRecord>("Add"));
        assert!(state.add(addr(2), feature("F", &[&["Add"]])).is_err());
    }

    #[test]
    fn duplicate_pair_rejected_and_first_kept() {
        let mut state = RegistryState::new();
        state.add(addr(1), transformation("Add")).unwrap();
        let mut second = transformation("Add");
        second.transformation.sol_src = "return x;".into();
        assert!(matches!(
            state.add(addr(1), second),
            Err(RegistryError::Duplicate { .. })
        ));
        assert_eq!(
            state
                .get::<TransformationRecord>("Add", &addr(1))
                .map(|t| t.sol_src.as_str()),
            Some("return x + args[0];")
        );
    }

    #[test]
    fn newest_follows_last_successful_insert() {
        let mut state = with_feature();
        state.add(addr(3), feature("F", &[&["Add"]])).unwrap();
        assert_eq!(state.newest_address::<FeatureRecord>("F"), Some(addr(3)));
        // a failed insert does not move the pointer
        assert!(state.add(addr(3), feature("F", &[&["Add"]])).is_err());
        assert!(state.add(addr(4), feature("F", &[&["Missing"]])).is_err());
        assert_eq!(state.newest_address::<FeatureRecord>("F"), Some(addr(3)));
        assert!(state.get::<FeatureRecord>("F", &addr(2)).is_some());
    }

    // ========== Removal Tests ==========

    #[test]
    fn remove_restores_previous_newest() {
        let mut state = with_feature();
        state.add(addr(3), feature("F", &[&["Add"]])).unwrap();
        assert!(state.remove::<FeatureRecord>("F", &addr(3)).is_some());
        assert_eq!(state.newest_address::<FeatureRecord>("F"), Some(addr(2)));
        assert!(state.get::<FeatureRecord>("F", &addr(3)).is_none());
        assert!(state.remove::<FeatureRecord>("F", &addr(3)).is_none());
    }

    #[test]
    fn remove_last_record_clears_name() {
        let mut state = RegistryState::new();
        let owner = Address::from_hex(OWNER).unwrap();
        state.add(addr(1), transformation("Add")).unwrap();
        state.add(addr(2), transformation("Mul")).unwrap();
        assert!(state.remove::<TransformationRecord>("Add", &addr(1)).is_some());
        assert!(!state.has::<TransformationRecord>("Add"));
        assert!(!state.transformations.contains_bucket("Add"));
        assert_eq!(state.newest_address::<TransformationRecord>("Add"), None);
        assert_eq!(
            state.owned::<TransformationRecord>(&owner),
            BTreeSet::from(["Mul".to_string()])
        );
        assert!(state.remove::<TransformationRecord>("Mul", &addr(2)).is_some());
        assert!(state.transformations.is_empty());
        assert!(state.owned::<TransformationRecord>(&owner).is_empty());
    }

    #[test]
    fn empty_name_rejected() {
        let mut state = RegistryState::new();
        assert_eq!(
            state.add(addr(1), transformation("")),
            Err(RegistryError::EmptyName(ArtifactKind::Transformation))
        );
    }

    #[test]
    fn ownership_index() {
        let mut state = with_feature();
        let owner = Address::from_hex(OWNER).unwrap();
        assert_eq!(
            state.owned::<TransformationRecord>(&owner),
            BTreeSet::from(["Add".to_string()])
        );
        assert!(state.owned::<ConditionRecord>(&owner).is_empty());
        assert!(state.owned::<FeatureRecord>(&addr(9)).is_empty());
        state.add(addr(5), transformation("Mul")).unwrap();
        assert_eq!(state.owned::<TransformationRecord>(&owner).len(), 2);
    }

    #[test]
    fn lookups_do_not_distinguish_missing_bucket_and_address() {
        let state = with_feature();
        assert!(state.get::<FeatureRecord>("F", &addr(9)).is_none());
        assert!(state.get::<FeatureRecord>("G", &addr(2)).is_none());
        assert!(state.feature("G").is_none());
        assert!(state.transformation("Add").is_some());
    }

    // ========== Particle Tests ==========

    #[test]
    fn particle_requires_feature() {
        let mut state = RegistryState::new();
        assert!(matches!(
            state.add(addr(3), particle("P", "F", &[""])),
            Err(RegistryError::MissingFeature { .. })
        ));
    }

    #[test]
    fn particle_needs_one_composite_entry_per_dimension() {
        let mut state = with_feature();
        assert_eq!(
            state.add(addr(3), particle("P1", "F", &[])),
            Err(RegistryError::DimensionsMismatch {
                particle: "P1".into(),
                expected: 1,
                actual: 0
            })
        );
        assert!(state.add(addr(3), particle("P1", "F", &["", ""])).is_err());
        state.add(addr(3), particle("P1", "F", &[""])).unwrap();
    }

    #[test]
    fn composite_must_be_registered() {
        let mut state = with_feature();
        assert!(matches!(
            state.add(addr(4), particle("P2", "F", &["P1"])),
            Err(RegistryError::MissingComposite { .. })
        ));
        state.add(addr(3), particle("P1", "F", &[""])).unwrap();
        state.add(addr(4), particle("P2", "F", &["P1"])).unwrap();
        assert_eq!(
            state.particle("P2").map(|p| p.composite_names.clone()),
            Some(vec!["P1".to_string()])
        );
    }

    #[test]
    fn composite_cycle_across_versions_rejected() {
        let mut state = with_feature();
        state.add(addr(3), particle("P1", "F", &[""])).unwrap();
        state.add(addr(4), particle("P2", "F", &["P1"])).unwrap();
        assert_eq!(
            state.add(addr(5), particle("P1", "F", &["P2"])),
            Err(RegistryError::CompositeCycle {
                particle: "P1".into(),
                composite: "P2".into()
            })
        );
        assert!(matches!(
            state.add(addr(6), particle("P1", "F", &["P1"])),
            Err(RegistryError::CompositeCycle { .. })
        ));
        assert_eq!(state.newest_address::<ParticleRecord>("P1"), Some(addr(3)));
    }
}
