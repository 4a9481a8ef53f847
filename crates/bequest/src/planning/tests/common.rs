use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::planning::allocation::{AllocationInput, ExistingAllocation};
use crate::planning::domain::{
    Asset, AssetDraft, AssetKind, Beneficiary, BeneficiaryDraft, OwnerId, Relationship, RuleDraft,
    RuleId,
};
use crate::planning::repository::{
    AllocationSnapshot, EstateRepository, RepositoryError, RuleRecord,
};
use crate::planning::rules::{ConditionClause, RuleDefinition, RuleEvent};
use crate::planning::service::EstatePlanningService;

#[derive(Default)]
pub(super) struct MemoryEstateRepository {
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

impl EstateRepository for MemoryEstateRepository {
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

/// Repository that always fails, for exercising the 500 path.
pub(super) struct UnavailableRepository;

impl EstateRepository for UnavailableRepository {
    fn insert_asset(&self, _asset: Asset) -> Result<Asset, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn assets(&self, _owner: OwnerId) -> Result<Vec<Asset>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn insert_beneficiary(&self, _beneficiary: Beneficiary) -> Result<Beneficiary, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn beneficiaries(&self, _owner: OwnerId) -> Result<Vec<Beneficiary>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn rules(&self, _owner: OwnerId) -> Result<Vec<RuleRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn rule(&self, _owner: OwnerId, _rule_id: RuleId) -> Result<Option<RuleRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn allocation_snapshot(&self, _owner: OwnerId) -> Result<AllocationSnapshot, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn commit_rule(
        &self,
        _record: RuleRecord,
        _expected_version: u64,
    ) -> Result<RuleRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn delete_rule(&self, _owner: OwnerId, _rule_id: RuleId) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Wrapper whose snapshots always report a version one ahead of storage, so
/// every commit looks like it raced another writer.
#[derive(Default)]
pub(super) struct StaleSnapshotRepository {
    inner: MemoryEstateRepository,
}

impl EstateRepository for StaleSnapshotRepository {
    fn insert_asset(&self, asset: Asset) -> Result<Asset, RepositoryError> {
        self.inner.insert_asset(asset)
    }

    fn assets(&self, owner: OwnerId) -> Result<Vec<Asset>, RepositoryError> {
        self.inner.assets(owner)
    }

    fn insert_beneficiary(&self, beneficiary: Beneficiary) -> Result<Beneficiary, RepositoryError> {
        self.inner.insert_beneficiary(beneficiary)
    }

    fn beneficiaries(&self, owner: OwnerId) -> Result<Vec<Beneficiary>, RepositoryError> {
        self.inner.beneficiaries(owner)
    }

    fn rules(&self, owner: OwnerId) -> Result<Vec<RuleRecord>, RepositoryError> {
        self.inner.rules(owner)
    }

    fn rule(&self, owner: OwnerId, rule_id: RuleId) -> Result<Option<RuleRecord>, RepositoryError> {
        self.inner.rule(owner, rule_id)
    }

    fn allocation_snapshot(&self, owner: OwnerId) -> Result<AllocationSnapshot, RepositoryError> {
        let mut snapshot = self.inner.allocation_snapshot(owner)?;
        snapshot.version += 1;
        Ok(snapshot)
    }

    fn commit_rule(
        &self,
        record: RuleRecord,
        expected_version: u64,
    ) -> Result<RuleRecord, RepositoryError> {
        self.inner.commit_rule(record, expected_version)
    }

    fn delete_rule(&self, owner: OwnerId, rule_id: RuleId) -> Result<(), RepositoryError> {
        self.inner.delete_rule(owner, rule_id)
    }
}

pub(super) struct PlannedEstate {
    pub(super) service: Arc<EstatePlanningService<MemoryEstateRepository>>,
    pub(super) repository: Arc<MemoryEstateRepository>,
    pub(super) owner: OwnerId,
    pub(super) home: Asset,
    pub(super) savings: Asset,
    pub(super) spouse: Beneficiary,
    pub(super) eldest: Beneficiary,
}

/// Service over a small seeded estate: a family home worth 100,000, a
/// savings account worth 250,000, a spouse, and an adult child.
pub(super) fn planned_estate() -> PlannedEstate {
    let repository = Arc::new(MemoryEstateRepository::default());
    let service = Arc::new(EstatePlanningService::new(repository.clone()));
    let owner = OwnerId::new();

    let home = service
        .register_asset(
            owner,
            AssetDraft {
                name: "Family home".to_string(),
                kind: AssetKind::Property,
                value: Decimal::from(100_000),
                acquired_on: NaiveDate::from_ymd_opt(2009, 6, 1),
            },
        )
        .expect("home registers");

    let savings = service
        .register_asset(
            owner,
            AssetDraft {
                name: "Credit union savings".to_string(),
                kind: AssetKind::BankAccount,
                value: Decimal::from(250_000),
                acquired_on: None,
            },
        )
        .expect("savings register");

    let spouse = service
        .register_beneficiary(
            owner,
            BeneficiaryDraft {
                full_name: "Niamh Byrne".to_string(),
                relationship: Relationship::Spouse,
                date_of_birth: NaiveDate::from_ymd_opt(1972, 3, 14),
                email: Some("niamh@example.ie".to_string()),
                address: None,
            },
        )
        .expect("spouse registers");

    let eldest = service
        .register_beneficiary(
            owner,
            BeneficiaryDraft {
                full_name: "Aoife Byrne".to_string(),
                relationship: Relationship::Child,
                date_of_birth: NaiveDate::from_ymd_opt(2001, 11, 2),
                email: None,
                address: None,
            },
        )
        .expect("eldest registers");

    PlannedEstate {
        service,
        repository,
        owner,
        home,
        savings,
        spouse,
        eldest,
    }
}

pub(super) fn age_definition() -> RuleDefinition {
    RuleDefinition {
        conditions: vec![ConditionClause {
            fact: "beneficiary-age".to_string(),
            operator: "greaterThan".to_string(),
            value: serde_json::json!(18),
        }],
        event: RuleEvent {
            kind: "age-verified".to_string(),
            params: None,
        },
    }
}

pub(super) fn percentage_claim(
    asset: &Asset,
    beneficiary: &Beneficiary,
    percentage: i64,
) -> AllocationInput {
    AllocationInput {
        asset_id: asset.id,
        beneficiary_id: beneficiary.id,
        percentage: Some(Decimal::from(percentage)),
        amount: None,
    }
}

pub(super) fn amount_claim(asset: &Asset, beneficiary: &Beneficiary, amount: i64) -> AllocationInput {
    AllocationInput {
        asset_id: asset.id,
        beneficiary_id: beneficiary.id,
        percentage: None,
        amount: Some(Decimal::from(amount)),
    }
}

pub(super) fn draft(name: &str, allocations: Vec<AllocationInput>) -> RuleDraft {
    RuleDraft {
        name: name.to_string(),
        definition: None,
        priority: 10,
        active: true,
        allocations,
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
