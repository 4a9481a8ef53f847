use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::domain::{Asset, AssetId, BeneficiaryId, RuleId};

/// Proposed claim on an asset, before it is attached to a persisted rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationInput {
    pub asset_id: AssetId,
    pub beneficiary_id: BeneficiaryId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
}

/// Persisted claim together with the rule that owns it, as read back from
/// storage for aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExistingAllocation {
    pub rule_id: RuleId,
    pub rule_name: String,
    pub asset_id: AssetId,
    pub beneficiary_id: BeneficiaryId,
    pub percentage: Option<Decimal>,
    pub amount: Option<Decimal>,
}

/// Validation failures raised before aggregation runs.
#[derive(Debug, thiserror::Error)]
pub enum AllocationError {
    #[error("allocation percentage {value} is outside the 0-100 range")]
    PercentageOutOfRange { value: Decimal },
    #[error("allocation amount {value} must not be negative")]
    NegativeAmount { value: Decimal },
    #[error("asset {asset_id} does not exist in this estate")]
    UnknownAsset { asset_id: AssetId },
}

/// Aggregation outcome for a single asset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetAllocationReport {
    pub asset_id: AssetId,
    pub asset_name: String,
    pub asset_value: Decimal,
    pub total_percentage: Decimal,
    pub total_amount: Decimal,
    pub remaining_percentage: Decimal,
    pub remaining_value: Decimal,
    pub over_allocated: bool,
    /// Existing claims competing for the asset, populated when it is
    /// over-allocated so callers can name the rules in conflict.
    pub conflicting_allocations: Vec<ExistingAllocation>,
}

/// Aggregate verdict over a proposed allocation set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationReview {
    pub is_valid: bool,
    pub over_allocated_assets: Vec<AssetId>,
    pub assets: Vec<AssetAllocationReport>,
    pub summary: String,
}

#[derive(Default)]
struct AssetTally {
    percentage: Decimal,
    amount: Decimal,
    existing: Vec<ExistingAllocation>,
}

/// Stateless aggregation over existing and proposed allocations. Callable on
/// hypothetical sets; it never touches storage.
pub struct AllocationAggregator;

impl AllocationAggregator {
    /// Answers whether applying `proposed` on top of `existing` would push
    /// any asset past 100% or past its monetary value. `exclude_rule` drops
    /// that rule's existing claims from the sums so a rule can be
    /// re-validated against the state it would leave behind when edited in
    /// place.
    ///
    /// `assets` is the ownership-scoped universe; a proposed claim against
    /// an asset outside it fails with [`AllocationError::UnknownAsset`].
    /// The report covers every asset touched by an existing or proposed
    /// claim, in the order the assets were supplied.
    pub fn review(
        assets: &[Asset],
        existing: &[ExistingAllocation],
        proposed: &[AllocationInput],
        exclude_rule: Option<RuleId>,
    ) -> Result<AllocationReview, AllocationError> {
        let known: HashSet<AssetId> = assets.iter().map(|asset| asset.id).collect();

        for input in proposed {
            if let Some(percentage) = input.percentage {
                if percentage < Decimal::ZERO || percentage > Decimal::ONE_HUNDRED {
                    return Err(AllocationError::PercentageOutOfRange { value: percentage });
                }
            }
            if let Some(amount) = input.amount {
                if amount < Decimal::ZERO {
                    return Err(AllocationError::NegativeAmount { value: amount });
                }
            }
            if !known.contains(&input.asset_id) {
                return Err(AllocationError::UnknownAsset {
                    asset_id: input.asset_id,
                });
            }
        }

        let mut tallies: HashMap<AssetId, AssetTally> = HashMap::new();

        for claim in existing {
            if exclude_rule == Some(claim.rule_id) {
                continue;
            }
            let tally = tallies.entry(claim.asset_id).or_default();
            tally.percentage += claim.percentage.unwrap_or(Decimal::ZERO);
            tally.amount += claim.amount.unwrap_or(Decimal::ZERO);
            tally.existing.push(claim.clone());
        }

        for input in proposed {
            let tally = tallies.entry(input.asset_id).or_default();
            tally.percentage += input.percentage.unwrap_or(Decimal::ZERO);
            tally.amount += input.amount.unwrap_or(Decimal::ZERO);
        }

        let mut reports = Vec::new();
        let mut over_allocated_assets = Vec::new();

        for asset in assets {
            let Some(tally) = tallies.get(&asset.id) else {
                continue;
            };

            let over_allocated =
                tally.percentage > Decimal::ONE_HUNDRED || tally.amount > asset.value;
            if over_allocated {
                over_allocated_assets.push(asset.id);
            }

            reports.push(AssetAllocationReport {
                asset_id: asset.id,
                asset_name: asset.name.clone(),
                asset_value: asset.value,
                total_percentage: tally.percentage,
                total_amount: tally.amount,
                remaining_percentage: (Decimal::ONE_HUNDRED - tally.percentage)
                    .max(Decimal::ZERO),
                remaining_value: (asset.value - tally.amount).max(Decimal::ZERO),
                over_allocated,
                conflicting_allocations: if over_allocated {
                    tally.existing.clone()
                } else {
                    Vec::new()
                },
            });
        }

        let summary = if over_allocated_assets.is_empty() {
            format!("{} asset(s) within allocation limits", reports.len())
        } else {
            let names = reports
                .iter()
                .filter(|report| report.over_allocated)
                .map(|report| report.asset_name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            format!("allocations exceed capacity on: {names}")
        };

        Ok(AllocationReview {
            is_valid: over_allocated_assets.is_empty(),
            over_allocated_assets,
            assets: reports,
            summary,
        })
    }
}
