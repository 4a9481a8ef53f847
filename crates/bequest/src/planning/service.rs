use std::collections::HashSet;
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, info};

use super::allocation::{AllocationAggregator, AllocationError, AllocationInput, AllocationReview};
use super::domain::{
    Asset, AssetDraft, AssetId, Beneficiary, BeneficiaryDraft, BeneficiaryId, InheritanceRule,
    OwnerId, RuleAllocation, RuleDraft, RuleId,
};
use super::repository::{EstateRepository, RepositoryError, RuleOverview, RuleRecord};
use super::rules::{
    BooleanConditionEvaluator, ConditionEvaluator, RuleEvaluationError, RuleValidator,
};

/// Service composing the rule validator, allocation aggregator, and
/// repository. Nothing persists unless every check passes.
pub struct EstatePlanningService<R> {
    repository: Arc<R>,
    validator: RuleValidator,
}

impl<R> EstatePlanningService<R>
where
    R: EstateRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self::with_evaluator(repository, Arc::new(BooleanConditionEvaluator))
    }

    pub fn with_evaluator(repository: Arc<R>, evaluator: Arc<dyn ConditionEvaluator>) -> Self {
        Self {
            repository,
            validator: RuleValidator::with_evaluator(evaluator),
        }
    }

    /// Record a new asset for the owner.
    pub fn register_asset(
        &self,
        owner: OwnerId,
        draft: AssetDraft,
    ) -> Result<Asset, PlanningServiceError> {
        if draft.name.trim().is_empty() {
            return Err(PlanningServiceError::EmptyAssetName);
        }
        if draft.value < Decimal::ZERO {
            return Err(PlanningServiceError::NegativeAssetValue { value: draft.value });
        }

        let asset = Asset {
            id: AssetId::new(),
            owner,
            name: draft.name,
            kind: draft.kind,
            value: draft.value,
            acquired_on: draft.acquired_on,
        };

        Ok(self.repository.insert_asset(asset)?)
    }

    pub fn assets(&self, owner: OwnerId) -> Result<Vec<Asset>, PlanningServiceError> {
        Ok(self.repository.assets(owner)?)
    }

    /// Record a new beneficiary for the owner.
    pub fn register_beneficiary(
        &self,
        owner: OwnerId,
        draft: BeneficiaryDraft,
    ) -> Result<Beneficiary, PlanningServiceError> {
        if draft.full_name.trim().is_empty() {
            return Err(PlanningServiceError::EmptyBeneficiaryName);
        }

        let beneficiary = Beneficiary {
            id: BeneficiaryId::new(),
            owner,
            full_name: draft.full_name,
            relationship: draft.relationship,
            date_of_birth: draft.date_of_birth,
            email: draft.email,
            address: draft.address,
        };

        Ok(self.repository.insert_beneficiary(beneficiary)?)
    }

    pub fn beneficiaries(&self, owner: OwnerId) -> Result<Vec<Beneficiary>, PlanningServiceError> {
        Ok(self.repository.beneficiaries(owner)?)
    }

    /// Validate and persist a new rule together with its allocation set.
    pub fn create_rule(
        &self,
        owner: OwnerId,
        draft: RuleDraft,
    ) -> Result<RuleRecord, PlanningServiceError> {
        self.persist_rule(owner, RuleId::new(), draft, None)
    }

    /// Re-validate and replace an existing rule. The rule's own persisted
    /// allocations are excluded from the aggregation so an edit competes
    /// only with the claims it would actually coexist with.
    pub fn update_rule(
        &self,
        owner: OwnerId,
        rule_id: RuleId,
        draft: RuleDraft,
    ) -> Result<RuleRecord, PlanningServiceError> {
        self.repository
            .rule(owner, rule_id)?
            .ok_or(RepositoryError::NotFound)?;

        self.persist_rule(owner, rule_id, draft, Some(rule_id))
    }

    /// Remove a rule; its allocations cascade at the repository.
    pub fn delete_rule(&self, owner: OwnerId, rule_id: RuleId) -> Result<(), PlanningServiceError> {
        self.repository.delete_rule(owner, rule_id)?;
        info!(%owner, %rule_id, "inheritance rule deleted");
        Ok(())
    }

    pub fn rule(&self, owner: OwnerId, rule_id: RuleId) -> Result<RuleRecord, PlanningServiceError> {
        Ok(self
            .repository
            .rule(owner, rule_id)?
            .ok_or(RepositoryError::NotFound)?)
    }

    pub fn rules(&self, owner: OwnerId) -> Result<Vec<RuleOverview>, PlanningServiceError> {
        let records = self.repository.rules(owner)?;
        Ok(records.iter().map(RuleRecord::overview).collect())
    }

    /// Standalone aggregation over a hypothetical allocation set. Reports
    /// the outcome without persisting anything.
    pub fn review_allocations(
        &self,
        owner: OwnerId,
        proposed: &[AllocationInput],
        exclude_rule: Option<RuleId>,
    ) -> Result<AllocationReview, PlanningServiceError> {
        let assets = self.repository.assets(owner)?;
        let snapshot = self.repository.allocation_snapshot(owner)?;

        Ok(AllocationAggregator::review(
            &assets,
            &snapshot.allocations,
            proposed,
            exclude_rule,
        )?)
    }

    fn persist_rule(
        &self,
        owner: OwnerId,
        rule_id: RuleId,
        draft: RuleDraft,
        exclude_rule: Option<RuleId>,
    ) -> Result<RuleRecord, PlanningServiceError> {
        if draft.name.trim().is_empty() {
            return Err(PlanningServiceError::EmptyRuleName);
        }
        if !(1..=100).contains(&draft.priority) {
            return Err(PlanningServiceError::PriorityOutOfRange {
                priority: draft.priority,
            });
        }

        if let Some(definition) = &draft.definition {
            self.validator.validate(definition)?;
        }

        let beneficiaries = self.repository.beneficiaries(owner)?;
        let known: HashSet<BeneficiaryId> =
            beneficiaries.iter().map(|beneficiary| beneficiary.id).collect();
        for input in &draft.allocations {
            if !known.contains(&input.beneficiary_id) {
                return Err(PlanningServiceError::UnknownBeneficiary {
                    beneficiary_id: input.beneficiary_id,
                });
            }
        }

        let assets = self.repository.assets(owner)?;
        let snapshot = self.repository.allocation_snapshot(owner)?;
        let review = AllocationAggregator::review(
            &assets,
            &snapshot.allocations,
            &draft.allocations,
            exclude_rule,
        )?;
        debug!(%owner, %rule_id, is_valid = review.is_valid, "allocation review completed");
        if !review.is_valid {
            return Err(PlanningServiceError::OverAllocated(review));
        }

        let allocations = draft
            .allocations
            .iter()
            .map(|input| RuleAllocation {
                rule_id,
                asset_id: input.asset_id,
                beneficiary_id: input.beneficiary_id,
                percentage: input.percentage,
                amount: input.amount,
            })
            .collect();

        let record = RuleRecord {
            rule: InheritanceRule {
                id: rule_id,
                owner,
                name: draft.name,
                definition: draft.definition,
                priority: draft.priority,
                active: draft.active,
            },
            allocations,
        };

        let stored = self.repository.commit_rule(record, snapshot.version)?;
        info!(%owner, %rule_id, allocations = stored.allocations.len(), "inheritance rule persisted");
        Ok(stored)
    }
}

/// Error raised by the planning service.
#[derive(Debug, thiserror::Error)]
pub enum PlanningServiceError {
    #[error("asset name must not be empty")]
    EmptyAssetName,
    #[error("asset value {value} must not be negative")]
    NegativeAssetValue { value: Decimal },
    #[error("beneficiary name must not be empty")]
    EmptyBeneficiaryName,
    #[error("rule name must not be empty")]
    EmptyRuleName,
    #[error("rule priority {priority} is outside the 1-100 range")]
    PriorityOutOfRange { priority: u8 },
    #[error("beneficiary {beneficiary_id} does not exist in this estate")]
    UnknownBeneficiary { beneficiary_id: BeneficiaryId },
    #[error("{}", .0.summary)]
    OverAllocated(AllocationReview),
    #[error(transparent)]
    Allocation(#[from] AllocationError),
    #[error(transparent)]
    Rule(#[from] RuleEvaluationError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
