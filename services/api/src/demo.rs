use crate::infra::InMemoryEstateRepository;
use bequest::error::AppError;
use bequest::planning::{
    AllocationReview, Asset, AssetDraft, AssetKind, Beneficiary, BeneficiaryDraft, ConditionClause,
    EstatePlanningService, OwnerId, PlanningServiceError, Relationship, RuleDefinition, RuleDraft,
    RuleEvent,
};
use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Print the full per-asset breakdown for each allocation review.
    #[arg(long)]
    pub(crate) detailed: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let repository = Arc::new(InMemoryEstateRepository::default());
    let service = EstatePlanningService::new(repository);
    let owner = OwnerId::new();

    println!("Estate planning demo");

    let home = register_asset(
        &service,
        owner,
        "Family home",
        AssetKind::Property,
        100_000,
        NaiveDate::from_ymd_opt(2009, 6, 1),
    )?;
    let savings = register_asset(
        &service,
        owner,
        "Credit union savings",
        AssetKind::BankAccount,
        250_000,
        None,
    )?;

    let spouse = register_beneficiary(&service, owner, "Niamh Byrne", Relationship::Spouse)?;
    let eldest = register_beneficiary(&service, owner, "Aoife Byrne", Relationship::Child)?;

    println!("\nRule authoring");
    let residue = service.create_rule(
        owner,
        RuleDraft {
            name: "Residue to spouse".to_string(),
            definition: Some(age_gate()),
            priority: 1,
            active: true,
            allocations: vec![percentage_claim(&home, &spouse, 60)],
        },
    )?;
    println!(
        "  persisted '{}' claiming 60% of {}",
        residue.rule.name, home.name
    );

    println!("\nOver-allocation check");
    let conflicting = service.create_rule(
        owner,
        RuleDraft {
            name: "College fund".to_string(),
            definition: None,
            priority: 2,
            active: true,
            allocations: vec![percentage_claim(&home, &eldest, 50)],
        },
    );
    match conflicting {
        Err(PlanningServiceError::OverAllocated(review)) => {
            println!("  rejected: {}", review.summary);
            render_review(&review, args.detailed);
        }
        Ok(_) => println!("  unexpected: conflicting rule was accepted"),
        Err(other) => println!("  unexpected error: {other}"),
    }

    println!("\nAmount headroom check");
    service.create_rule(
        owner,
        RuleDraft {
            name: "Nest egg".to_string(),
            definition: None,
            priority: 3,
            active: true,
            allocations: vec![amount_claim(&savings, &spouse, 50_000)],
        },
    )?;
    let review = service.review_allocations(owner, &[amount_claim(&savings, &eldest, 40_000)], None)?;
    println!("  {}", review.summary);
    render_review(&review, args.detailed);

    println!("\nDefinition dry-run");
    let bad_rule = service.create_rule(
        owner,
        RuleDraft {
            name: "Sobriety gate".to_string(),
            definition: Some(RuleDefinition {
                conditions: vec![ConditionClause {
                    fact: "sobriety-period".to_string(),
                    operator: "isBetween".to_string(),
                    value: serde_json::json!([0, 400]),
                }],
                event: RuleEvent {
                    kind: "sobriety-verified".to_string(),
                    params: None,
                },
            }),
            priority: 4,
            active: true,
            allocations: Vec::new(),
        },
    );
    match bad_rule {
        Err(PlanningServiceError::Rule(err)) => println!("  rejected: {err}"),
        Ok(_) => println!("  unexpected: malformed definition was accepted"),
        Err(other) => println!("  unexpected error: {other}"),
    }

    println!("\nEdit in place");
    let widened = service.update_rule(
        owner,
        residue.rule.id,
        RuleDraft {
            name: "Residue to spouse".to_string(),
            definition: Some(age_gate()),
            priority: 1,
            active: true,
            allocations: vec![percentage_claim(&home, &spouse, 80)],
        },
    )?;
    println!(
        "  '{}' widened to 80% of {} (its old 60% no longer counts against it)",
        widened.rule.name, home.name
    );

    println!("\nRules on file");
    for overview in service.rules(owner)? {
        println!(
            "  [{}] {} ({} allocation(s), {})",
            overview.priority,
            overview.name,
            overview.allocation_count,
            if overview.active { "active" } else { "inactive" }
        );
    }

    Ok(())
}

fn age_gate() -> RuleDefinition {
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

fn register_asset(
    service: &EstatePlanningService<InMemoryEstateRepository>,
    owner: OwnerId,
    name: &str,
    kind: AssetKind,
    value: i64,
    acquired_on: Option<NaiveDate>,
) -> Result<Asset, AppError> {
    let asset = service.register_asset(
        owner,
        AssetDraft {
            name: name.to_string(),
            kind,
            value: Decimal::from(value),
            acquired_on,
        },
    )?;
    println!("  registered {} worth EUR {}", asset.name, asset.value);
    Ok(asset)
}

fn register_beneficiary(
    service: &EstatePlanningService<InMemoryEstateRepository>,
    owner: OwnerId,
    full_name: &str,
    relationship: Relationship,
) -> Result<Beneficiary, AppError> {
    let beneficiary = service.register_beneficiary(
        owner,
        BeneficiaryDraft {
            full_name: full_name.to_string(),
            relationship,
            date_of_birth: None,
            email: None,
            address: None,
        },
    )?;
    let view = beneficiary.view();
    match (view.tax_group, view.tax_free_threshold_eur) {
        (Some(group), Some(threshold)) => println!(
            "  registered {} (CAT group {}, threshold EUR {})",
            beneficiary.full_name, group, threshold
        ),
        _ => println!("  registered {} (exempt)", beneficiary.full_name),
    }
    Ok(beneficiary)
}

fn percentage_claim(
    asset: &Asset,
    beneficiary: &Beneficiary,
    percentage: i64,
) -> bequest::planning::AllocationInput {
    bequest::planning::AllocationInput {
        asset_id: asset.id,
        beneficiary_id: beneficiary.id,
        percentage: Some(Decimal::from(percentage)),
        amount: None,
    }
}

fn amount_claim(
    asset: &Asset,
    beneficiary: &Beneficiary,
    amount: i64,
) -> bequest::planning::AllocationInput {
    bequest::planning::AllocationInput {
        asset_id: asset.id,
        beneficiary_id: beneficiary.id,
        percentage: None,
        amount: Some(Decimal::from(amount)),
    }
}

fn render_review(review: &AllocationReview, detailed: bool) {
    if !detailed {
        return;
    }
    for report in &review.assets {
        println!(
            "    {}: {}% of 100% used, EUR {} of EUR {} used{}",
            report.asset_name,
            report.total_percentage,
            report.total_amount,
            report.asset_value,
            if report.over_allocated {
                " (over-allocated)"
            } else {
                ""
            }
        );
        for conflict in &report.conflicting_allocations {
            println!("      competing rule: {}", conflict.rule_name);
        }
    }
}
