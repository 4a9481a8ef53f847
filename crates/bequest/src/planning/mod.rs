//! Estate planning domain: assets, beneficiaries, inheritance rules, and the
//! allocation checks that keep a will internally consistent.
//!
//! `allocation` answers whether a proposed set of claims would over-allocate
//! any asset. `rules` dry-runs user-authored rule definitions before they are
//! persisted. `service` orchestrates both over the `repository` abstraction,
//! and `router` exposes the results over HTTP.

pub mod allocation;
pub mod domain;
pub mod repository;
pub mod router;
pub mod rules;
pub mod service;

#[cfg(test)]
mod tests;

pub use allocation::{
    AllocationAggregator, AllocationError, AllocationInput, AllocationReview,
    AssetAllocationReport, ExistingAllocation,
};
pub use domain::{
    Asset, AssetDraft, AssetId, AssetKind, Beneficiary, BeneficiaryDraft, BeneficiaryId,
    BeneficiaryView, InheritanceRule, OwnerId, Relationship, RuleAllocation, RuleDraft, RuleId,
    TaxGroup,
};
pub use repository::{
    AllocationSnapshot, EstateRepository, RepositoryError, RuleOverview, RuleRecord,
};
pub use router::estate_router;
pub use rules::{
    authoring_facts, BooleanConditionEvaluator, ConditionClause, ConditionEvaluator, FactSet,
    RuleDefinition, RuleEvaluationError, RuleEvent, RuleOutcome, RuleValidator,
};
pub use service::{EstatePlanningService, PlanningServiceError};
