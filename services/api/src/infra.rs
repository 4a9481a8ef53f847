use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use bequest::planning::{
    AllocationSnapshot, Asset, Beneficiary, EstateRepository, ExistingAllocation, OwnerId,
    RepositoryError, RuleId, RuleRecord,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Process-local stand-in for the relational store. Owners get an allocation
/// set version that every rule commit must present, so two racing edits
/// cannot both pass the capacity checks.
#[derive(Default)]
pub(crate) struct InMemoryEstateRepository {
    inner: Mutex<EstateStore>,
}

#[derive(Default)]
struct EstateStore {
    assets: Vec<Asset>,
    beneficiaries: Vec<Beneficiary>,
    rules: HashMap<RuleId, RuleRecord>,
    versions: HashMap<OwnerId, u64>,
}

impl EstateStore {
    fn sorted_rules(&self, owner: OwnerId) -> Vec<RuleRecord> {
        let mut records: Vec<RuleRecord> = self
            .rules
            .values()
            .filter(|record| record.rule.owner == owner)
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            a.rule
                .priority
                .cmp(&b.rule.priority)
                .then_with(|| a.rule.name.cmp(&b.rule.name))
        });
        records
    }
}

impl EstateRepository for InMemoryEstateRepository {
    fn insert_asset(&self, asset: Asset) -> Result<Asset, RepositoryError> {
        let mut store = self.inner.lock().expect("repository mutex poisoned");
        store.assets.push(asset.clone());
        Ok(asset)
    }

    fn assets(&self, owner: OwnerId) -> Result<Vec<Asset>, RepositoryError> {
        let store = self.inner.lock().expect("repository mutex poisoned");
        Ok(store
            .assets
            .iter()
            .filter(|asset| asset.owner == owner)
            .cloned()
            .collect())
    }

    fn insert_beneficiary(&self, beneficiary: Beneficiary) -> Result<Beneficiary, RepositoryError> {
        let mut store = self.inner.lock().expect("repository mutex poisoned");
        store.beneficiaries.push(beneficiary.clone());
        Ok(beneficiary)
    }

    fn beneficiaries(&self, owner: OwnerId) -> Result<Vec<Beneficiary>, RepositoryError> {
        let store = self.inner.lock().expect("repository mutex poisoned");
        Ok(store
            .beneficiaries
            .iter()
            .filter(|beneficiary| beneficiary.owner == owner)
            .cloned()
            .collect())
    }

    fn rules(&self, owner: OwnerId) -> Result<Vec<RuleRecord>, RepositoryError> {
        let store = self.inner.lock().expect("repository mutex poisoned");
        Ok(store.sorted_rules(owner))
    }

    fn rule(&self, owner: OwnerId, rule_id: RuleId) -> Result<Option<RuleRecord>, RepositoryError> {
        let store = self.inner.lock().expect("repository mutex poisoned");
        Ok(store
            .rules
            .get(&rule_id)
            .filter(|record| record.rule.owner == owner)
            .cloned())
    }

    fn allocation_snapshot(&self, owner: OwnerId) -> Result<AllocationSnapshot, RepositoryError> {
        let store = self.inner.lock().expect("repository mutex poisoned");
        let allocations = store
            .sorted_rules(owner)
            .into_iter()
            .filter(|record| record.rule.active)
            .flat_map(|record| {
                let rule_name = record.rule.name.clone();
                record
                    .allocations
                    .into_iter()
                    .map(move |allocation| ExistingAllocation {
                        rule_id: allocation.rule_id,
                        rule_name: rule_name.clone(),
                        asset_id: allocation.asset_id,
                        beneficiary_id: allocation.beneficiary_id,
                        percentage: allocation.percentage,
                        amount: allocation.amount,
                    })
            })
            .collect();

        Ok(AllocationSnapshot {
            version: store.versions.get(&owner).copied().unwrap_or(0),
            allocations,
        })
    }

    fn commit_rule(
        &self,
        record: RuleRecord,
        expected_version: u64,
    ) -> Result<RuleRecord, RepositoryError> {
        let mut store = self.inner.lock().expect("repository mutex poisoned");
        let owner = record.rule.owner;
        let current = store.versions.get(&owner).copied().unwrap_or(0);
        if current != expected_version {
            return Err(RepositoryError::StaleAllocations);
        }

        store.rules.insert(record.rule.id, record.clone());
        store.versions.insert(owner, current + 1);
        Ok(record)
    }

    fn delete_rule(&self, owner: OwnerId, rule_id: RuleId) -> Result<(), RepositoryError> {
        let mut store = self.inner.lock().expect("repository mutex poisoned");
        match store.rules.get(&rule_id) {
            Some(record) if record.rule.owner == owner => {
                store.rules.remove(&rule_id);
                let current = store.versions.get(&owner).copied().unwrap_or(0);
                store.versions.insert(owner, current + 1);
                Ok(())
            }
            _ => Err(RepositoryError::NotFound),
        }
    }
}
