use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::allocation::AllocationInput;
use super::rules::RuleDefinition;

/// Identifier of the person whose estate is being planned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerId(pub Uuid);

impl OwnerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier wrapper for estate assets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetId(pub Uuid);

impl AssetId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier wrapper for named beneficiaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BeneficiaryId(pub Uuid);

impl BeneficiaryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for BeneficiaryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier wrapper for inheritance rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleId(pub Uuid);

impl RuleId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A thing of value in the estate that allocations claim against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    pub owner: OwnerId,
    pub name: String,
    pub kind: AssetKind,
    /// Current monetary value in euro. Never negative.
    pub value: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acquired_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Property,
    BankAccount,
    Investment,
    Pension,
    LifePolicy,
    Vehicle,
    Other,
}

/// Person named in the will, referenced by allocations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Beneficiary {
    pub id: BeneficiaryId,
    pub owner: OwnerId,
    pub full_name: String,
    pub relationship: Relationship,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl Beneficiary {
    /// Summary view carrying the beneficiary's inheritance-tax position.
    pub fn view(&self) -> BeneficiaryView {
        let group = self.relationship.tax_group();
        BeneficiaryView {
            id: self.id,
            full_name: self.full_name.clone(),
            relationship: self.relationship,
            tax_group: group.map(TaxGroup::label),
            tax_free_threshold_eur: group.map(TaxGroup::threshold_eur),
        }
    }
}

/// Relationship of a beneficiary to the estate owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relationship {
    Spouse,
    CivilPartner,
    Child,
    Grandchild,
    Parent,
    Sibling,
    NieceNephew,
    Friend,
    Other,
}

impl Relationship {
    /// Capital Acquisitions Tax group the relationship falls into. Spouses
    /// and civil partners take the full exemption instead of a group
    /// threshold, so they carry no group.
    pub const fn tax_group(self) -> Option<TaxGroup> {
        match self {
            Relationship::Spouse | Relationship::CivilPartner => None,
            Relationship::Child => Some(TaxGroup::A),
            Relationship::Grandchild
            | Relationship::Parent
            | Relationship::Sibling
            | Relationship::NieceNephew => Some(TaxGroup::B),
            Relationship::Friend | Relationship::Other => Some(TaxGroup::C),
        }
    }
}

/// Capital Acquisitions Tax group for inheritance-tax thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TaxGroup {
    A,
    B,
    C,
}

impl TaxGroup {
    pub const fn label(self) -> &'static str {
        match self {
            TaxGroup::A => "A",
            TaxGroup::B => "B",
            TaxGroup::C => "C",
        }
    }

    /// Standing tax-free threshold for the group in euro.
    pub fn threshold_eur(self) -> Decimal {
        let threshold: i64 = match self {
            TaxGroup::A => 335_000,
            TaxGroup::B => 32_500,
            TaxGroup::C => 16_250,
        };
        Decimal::from(threshold)
    }
}

/// Beneficiary summary exposed by the listing endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BeneficiaryView {
    pub id: BeneficiaryId,
    pub full_name: String,
    pub relationship: Relationship,
    /// `None` marks a fully exempt spouse or civil partner.
    pub tax_group: Option<&'static str>,
    pub tax_free_threshold_eur: Option<Decimal>,
}

/// Named rule a user authors to steer how their assets pass on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InheritanceRule {
    pub id: RuleId,
    pub owner: OwnerId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<RuleDefinition>,
    /// Ordering weight between rules, 1 to 100.
    pub priority: u8,
    pub active: bool,
}

/// Persisted claim row tying one rule, one asset, and one beneficiary.
/// Carries a percentage, a fixed amount, neither, but never requires both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleAllocation {
    pub rule_id: RuleId,
    pub asset_id: AssetId,
    pub beneficiary_id: BeneficiaryId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
}

/// Payload for registering an asset.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetDraft {
    pub name: String,
    pub kind: AssetKind,
    pub value: Decimal,
    #[serde(default)]
    pub acquired_on: Option<NaiveDate>,
}

/// Payload for registering a beneficiary.
#[derive(Debug, Clone, Deserialize)]
pub struct BeneficiaryDraft {
    pub full_name: String,
    pub relationship: Relationship,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// Payload for creating a rule or replacing one together with its
/// allocation set.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleDraft {
    pub name: String,
    #[serde(default)]
    pub definition: Option<RuleDefinition>,
    pub priority: u8,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub allocations: Vec<AllocationInput>,
}

fn default_active() -> bool {
    true
}
