use serde::{Deserialize, Serialize};

use super::allocation::ExistingAllocation;
use super::domain::{Asset, Beneficiary, InheritanceRule, OwnerId, RuleAllocation, RuleId};

/// Persisted rule plus the allocation rows that hang off it. Allocations are
/// replaced wholesale with the rule and deleted with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleRecord {
    pub rule: InheritanceRule,
    pub allocations: Vec<RuleAllocation>,
}

impl RuleRecord {
    pub fn overview(&self) -> RuleOverview {
        RuleOverview {
            rule_id: self.rule.id,
            name: self.rule.name.clone(),
            priority: self.rule.priority,
            active: self.rule.active,
            allocation_count: self.allocations.len(),
        }
    }
}

/// Listing payload for rule collections.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleOverview {
    pub rule_id: RuleId,
    pub name: String,
    pub priority: u8,
    pub active: bool,
    pub allocation_count: usize,
}

/// Versioned read of an owner's persisted claims across active rules. The
/// version travels to `commit_rule` so a commit validated against a stale
/// read is refused instead of silently over-allocating.
#[derive(Debug, Clone)]
pub struct AllocationSnapshot {
    pub version: u64,
    pub allocations: Vec<ExistingAllocation>,
}

/// Storage abstraction so the planning service can be exercised in
/// isolation. All reads and writes are scoped to one owner.
pub trait EstateRepository: Send + Sync {
    fn insert_asset(&self, asset: Asset) -> Result<Asset, RepositoryError>;
    fn assets(&self, owner: OwnerId) -> Result<Vec<Asset>, RepositoryError>;
    fn insert_beneficiary(&self, beneficiary: Beneficiary) -> Result<Beneficiary, RepositoryError>;
    fn beneficiaries(&self, owner: OwnerId) -> Result<Vec<Beneficiary>, RepositoryError>;
    fn rules(&self, owner: OwnerId) -> Result<Vec<RuleRecord>, RepositoryError>;
    fn rule(&self, owner: OwnerId, rule_id: RuleId) -> Result<Option<RuleRecord>, RepositoryError>;
    /// Claims across the owner's active rules, with the current allocation
    /// set version.
    fn allocation_snapshot(&self, owner: OwnerId) -> Result<AllocationSnapshot, RepositoryError>;
    /// Upserts the rule and replaces its allocation set in one step.
    /// `expected_version` must match the version handed out by
    /// `allocation_snapshot`, otherwise the commit fails with
    /// [`RepositoryError::StaleAllocations`].
    fn commit_rule(
        &self,
        record: RuleRecord,
        expected_version: u64,
    ) -> Result<RuleRecord, RepositoryError>;
    /// Removes the rule and cascades its allocations.
    fn delete_rule(&self, owner: OwnerId, rule_id: RuleId) -> Result<(), RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("allocation set changed since it was read")]
    StaleAllocations,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
