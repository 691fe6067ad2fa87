//! Registry: validated in-memory index over deployed artifacts.
//!
//! [`RegistryState`] holds the data and enforces the cross-kind rules. The
//! [`Registry`] handle owns it from a background task and runs every read and
//! write there in arrival order, so no reader ever sees a half-applied insert.

pub mod state;

use crate::core::definitions::{Condition, Feature, Particle, Transformation};
use crate::core::records::{ConditionRecord, FeatureRecord, ParticleRecord, TransformationRecord};
use crate::types::address::Address;
use crate::{debug, error};
pub use state::{Indexed, RegistryError, RegistryState};
use std::collections::BTreeSet;
use tokio::sync::mpsc::{Receiver, Sender, channel};
use tokio::sync::oneshot;

type Job = Box<dyn FnOnce(&mut RegistryState) + Send>;

/// Handle to the registry task.
#[derive(Clone)]
pub struct Registry {
    job_tx: Sender<Job>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Starts an empty registry. Must be called inside a tokio runtime.
    pub fn new() -> Self {
        let (job_tx, job_rx) = channel(64);
        tokio::spawn(run(RegistryState::new(), job_rx));
        Self { job_tx }
    }

    /// Runs `f` against the state on the registry task and returns its result.
    async fn with<T, F>(&self, f: F) -> Option<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut RegistryState) -> T + Send + 'static,
    {
        let (done, rx) = oneshot::channel();
        let job: Job = Box::new(move |state| {
            let _ = done.send(f(state));
        });
        if self.job_tx.send(job).await.is_err() {
            error!("registry: task stopped");
            return None;
        }
        rx.await.ok()
    }

    /// Inserts `record` at `address` after validating it.
    pub async fn add<R: Indexed>(&self, address: Address, record: R) -> Result<(), RegistryError> {
        let kind = R::KIND;
        let name = record.name().to_string();
        let result = self
            .with(move |state| state.add(address, record))
            .await
            .unwrap_or(Err(RegistryError::Closed));
        match &result {
            Ok(()) => debug!("registry: added {} `{}` at {}", kind, name, address),
            Err(e) => error!("registry: rejected {} `{}`: {}", kind, name, e),
        }
        result
    }

    /// Drops the record at `(name, address)`. Returns whether one was there.
    pub(crate) async fn remove<R: Indexed>(&self, name: &str, address: Address) -> bool {
        let kind = R::KIND;
        let name = name.to_string();
        let label = name.clone();
        let removed = self
            .with(move |state| state.remove::<R>(&name, &address).is_some())
            .await
            .unwrap_or(false);
        if removed {
            debug!("registry: removed {} `{}` at {}", kind, label, address);
        }
        removed
    }

    pub async fn get<R: Indexed>(&self, name: &str, address: Address) -> Option<R::Definition> {
        let name = name.to_string();
        self.with(move |state| state.get::<R>(&name, &address).cloned())
            .await
            .flatten()
    }

    pub async fn get_newest<R: Indexed>(&self, name: &str) -> Option<R::Definition> {
        let name = name.to_string();
        self.with(move |state| state.newest::<R>(&name).cloned())
            .await
            .flatten()
    }

    pub async fn newest_address<R: Indexed>(&self, name: &str) -> Option<Address> {
        let name = name.to_string();
        self.with(move |state| state.newest_address::<R>(&name))
            .await
            .flatten()
    }

    pub async fn get_owned<R: Indexed>(&self, owner: Address) -> BTreeSet<String> {
        self.with(move |state| state.owned::<R>(&owner))
            .await
            .unwrap_or_default()
    }

    pub async fn has<R: Indexed>(&self, name: &str) -> bool {
        let name = name.to_string();
        self.with(move |state| state.has::<R>(&name))
            .await
            .unwrap_or(false)
    }

    pub async fn add_transformation(
        &self,
        address: Address,
        record: TransformationRecord,
    ) -> Result<(), RegistryError> {
        self.add(address, record).await
    }

    pub async fn add_condition(
        &self,
        address: Address,
        record: ConditionRecord,
    ) -> Result<(), RegistryError> {
        self.add(address, record).await
    }

    pub async fn add_feature(
        &self,
        address: Address,
        record: FeatureRecord,
    ) -> Result<(), RegistryError> {
        self.add(address, record).await
    }

    pub async fn add_particle(
        &self,
        address: Address,
        record: ParticleRecord,
    ) -> Result<(), RegistryError> {
        self.add(address, record).await
    }

    pub async fn get_transformation(&self, name: &str, address: Address) -> Option<Transformation> {
        self.get::<TransformationRecord>(name, address).await
    }

    pub async fn get_condition(&self, name: &str, address: Address) -> Option<Condition> {
        self.get::<ConditionRecord>(name, address).await
    }

    pub async fn get_feature(&self, name: &str, address: Address) -> Option<Feature> {
        self.get::<FeatureRecord>(name, address).await
    }

    pub async fn get_particle(&self, name: &str, address: Address) -> Option<Particle> {
        self.get::<ParticleRecord>(name, address).await
    }

    pub async fn get_newest_transformation(&self, name: &str) -> Option<Transformation> {
        self.get_newest::<TransformationRecord>(name).await
    }

    pub async fn get_newest_condition(&self, name: &str) -> Option<Condition> {
        self.get_newest::<ConditionRecord>(name).await
    }

    pub async fn get_newest_feature(&self, name: &str) -> Option<Feature> {
        self.get_newest::<FeatureRecord>(name).await
    }

    pub async fn get_newest_particle(&self, name: &str) -> Option<Particle> {
        self.get_newest::<ParticleRecord>(name).await
    }

    pub async fn get_owned_transformations(&self, owner: Address) -> BTreeSet<String> {
        self.get_owned::<TransformationRecord>(owner).await
    }

    pub async fn get_owned_conditions(&self, owner: Address) -> BTreeSet<String> {
        self.get_owned::<ConditionRecord>(owner).await
    }

    pub async fn get_owned_features(&self, owner: Address) -> BTreeSet<String> {
        self.get_owned::<FeatureRecord>(owner).await
    }

    pub async fn get_owned_particles(&self, owner: Address) -> BTreeSet<String> {
        self.get_owned::<ParticleRecord>(owner).await
    }

    pub async fn has_transformation(&self, name: &str) -> bool {
        self.has::<TransformationRecord>(name).await
    }

    pub async fn has_condition(&self, name: &str) -> bool {
        self.has::<ConditionRecord>(name).await
    }

    pub async fn has_feature(&self, name: &str) -> bool {
        self.has::<FeatureRecord>(name).await
    }

    pub async fn has_particle(&self, name: &str) -> bool {
        self.has::<ParticleRecord>(name).await
    }
}

async fn run(mut state: RegistryState, mut job_rx: Receiver<Job>) {
    while let Some(job) = job_rx.recv().await {
        job(&mut state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::state::tests::{OWNER, addr, feature, particle, transformation};

    #[tokio::test]
    async fn add_then_read_back() {
        let registry = Registry::new();
        registry
            .add_transformation(addr(1), transformation("Add"))
            .await
            .unwrap();
        assert!(registry.has_transformation("Add").await);
        assert!(!registry.has_condition("Add").await);
        assert_eq!(
            registry
                .get_transformation("Add", addr(1))
                .await
                .map(|t| t.name),
            Some("Add".to_string())
        );
        assert!(registry.get_transformation("Add", addr(2)).await.is_none());
    }

    #[tokio::test]
    async fn feature_versions_scenario() {
        let registry = Registry::new();
        assert!(
            registry
                .add_feature(addr(2), feature("F", &[&["Add"]]))
                .await
                .is_err()
        );
        registry
            .add_transformation(addr(1), transformation("Add"))
            .await
            .unwrap();
        registry
            .add_feature(addr(2), feature("F", &[&["Add"]]))
            .await
            .unwrap();
        registry
            .add_feature(addr(3), feature("F", &[&["Add"]]))
            .await
            .unwrap();
        assert_eq!(registry.newest_address::<FeatureRecord>("F").await, Some(addr(3)));
        assert!(
            registry
                .add_feature(addr(3), feature("F", &[&["Add"]]))
                .await
                .is_err()
        );
        assert!(registry.get_newest_feature("F").await.is_some());

        assert!(matches!(
            registry.add_particle(addr(4), particle("P1", "F", &[])).await,
            Err(RegistryError::DimensionsMismatch { .. })
        ));
        let owner = Address::from_hex(OWNER).unwrap();
        assert_eq!(
            registry.get_owned_features(owner).await,
            BTreeSet::from(["F".to_string()])
        );
        assert!(registry.get_owned_particles(owner).await.is_empty());
    }

    #[tokio::test]
    async fn concurrent_inserts_of_same_pair() {
        let registry = Registry::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                tokio::spawn(async move {
                    registry
                        .add_transformation(addr(1), transformation("Add"))
                        .await
                        .is_ok()
                })
            })
            .collect();
        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
    }
}
