use estimate_core::roles::{EDITOR, RESEARCHER, SPECIALIST_REVIEWER};
use estimate_core::{
    Allocation, Chapter, Complexity, FixedCost, FixedCostCategory, ProjectData, Section,
    Subsection, TeamMember, export_chapters_to_csv, import_chapters_from_csv,
};
use estimate_cost::{
    CostModel, DemandMapping, aggregate_demand, calculate_fixed_costs, calculate_project_costs,
    calculate_total_hours, calculate_with_model, estimate_project, fixed_costs_by_category,
};

fn work(editor: f64, researcher: f64, review: f64) -> Chapter {
    Chapter::new("Chapter").with_section(Section::new("Section").with_subsection(Subsection::new(
        "Item",
        Complexity::Moderate,
        editor,
        researcher,
        review,
    )))
}

fn scenario_a() -> ProjectData {
    let mut project = ProjectData::new("Scenario A");
    project.team_members.push(
        TeamMember::new("Member1", EDITOR)
            .with_allocation(Allocation::new(EDITOR, 3.0, 120.0))
            .with_allocation(Allocation::new(RESEARCHER, 2.0, 80.0)),
    );
    project.chapters.push(work(10.0, 15.0, 0.0));
    project
}

#[test]
fn scenario_a_single_member_two_roles() {
    let project = scenario_a();
    let result = calculate_project_costs(&project);

    assert_eq!(result.capacity[EDITOR], 15.0);
    assert_eq!(result.capacity[RESEARCHER], 10.0);
    assert_eq!(result.duration_weeks, 2);
    assert_eq!(result.bottleneck_role.as_deref(), Some(RESEARCHER));
    assert_eq!(result.total, 5200.0);

    let member = result.member(&project.team_members[0].id).unwrap();
    assert_eq!(member.member_name, "Member1");
    assert_eq!(member.allocations[0].cost, 3600.0);
    assert_eq!(member.allocations[1].cost, 1600.0);
    assert_eq!(member.allocations[0].hours, 30.0);

    let utilization = result.utilization(EDITOR).unwrap();
    assert!((utilization - 10.0 / 30.0).abs() < 1e-9);
    assert_eq!(result.utilization(RESEARCHER), Some(0.75));
    assert_eq!(result.utilization(SPECIALIST_REVIEWER), None);
}

#[test]
fn scenario_b_no_work_costs_nothing() {
    let mut project = ProjectData::new("Scenario B");
    for rate in [100.0, 60.0] {
        project.team_members.push(
            TeamMember::new("Editor", EDITOR).with_allocation(Allocation::new(EDITOR, 5.0, rate)),
        );
    }
    let result = calculate_project_costs(&project);
    assert_eq!(result.duration_weeks, 0);
    assert_eq!(result.total, 0.0);
    assert_eq!(result.breakdown.len(), 2);
    assert!(result.breakdown.iter().all(|m| m.total == 0.0));
    assert_eq!(result.demand.len(), 3);
}

#[test]
fn scenario_c_unstaffed_role_does_not_drive_duration() {
    let mut project = scenario_a();
    project.chapters.push(work(0.0, 0.0, 5.0));
    let result = calculate_project_costs(&project);
    assert_eq!(result.demand[SPECIALIST_REVIEWER], 5.0);
    assert_eq!(result.duration_weeks, 2);
    assert_eq!(result.unstaffed_roles, vec![SPECIALIST_REVIEWER.to_string()]);
    assert_eq!(result.total, 5200.0);
}

#[test]
fn duration_rounds_partial_weeks_up() {
    let mut project = ProjectData::new("Rounding");
    project.team_members.push(
        TeamMember::new("Ed", EDITOR).with_allocation(Allocation::new(EDITOR, 5.0, 100.0)),
    );
    project.chapters.push(work(26.0, 0.0, 0.0));
    let result = calculate_project_costs(&project);
    assert_eq!(result.duration_weeks, 2);
    assert_eq!(result.total, 5.0 * 5.0 * 2.0 * 100.0);
}

#[test]
fn cost_scales_linearly_with_rates() {
    let project = scenario_a();
    let mut doubled = project.clone();
    for member in &mut doubled.team_members {
        for allocation in &mut member.allocations {
            allocation.rate *= 2.0;
        }
    }
    let base = calculate_project_costs(&project);
    let scaled = calculate_project_costs(&doubled);
    assert_eq!(scaled.duration_weeks, base.duration_weeks);
    assert_eq!(scaled.total, base.total * 2.0);
}

#[test]
fn doubling_duration_doubles_every_cost() {
    let mut base = scenario_a();
    base.chapters = vec![work(10.0, 20.0, 0.0)];
    let mut longer = base.clone();
    longer.chapters = vec![work(20.0, 40.0, 0.0)];

    let short = calculate_project_costs(&base);
    let long = calculate_project_costs(&longer);
    assert_eq!(short.duration_weeks, 2);
    assert_eq!(long.duration_weeks, 4);
    assert_eq!(short.total, 5200.0);
    assert_eq!(long.total, short.total * 2.0);

    for member in &short.breakdown {
        let doubled = long.member(&member.member_id).unwrap();
        assert_eq!(doubled.total, member.total * 2.0);
        for (a, b) in member.allocations.iter().zip(&doubled.allocations) {
            assert_eq!(b.hours, a.hours * 2.0);
            assert_eq!(b.cost, a.cost * 2.0);
        }
    }
}

#[test]
fn empty_project_has_no_duration_or_labor() {
    let result = calculate_project_costs(&ProjectData::new("Empty"));
    assert_eq!(result.duration_weeks, 0);
    assert_eq!(result.total, 0.0);
    assert!(result.breakdown.is_empty());
    assert!(result.bottleneck_role.is_none());
    assert!(result.unstaffed_roles.is_empty());

    let estimate = estimate_project(&ProjectData::new("Empty"));
    assert_eq!(estimate.grand_total, 0.0);
    assert_eq!(estimate.total_hours, 0.0);
}

#[test]
fn order_of_members_and_work_does_not_matter() {
    let mut project = scenario_a();
    project.team_members.push(
        TeamMember::new("Reviewer", SPECIALIST_REVIEWER)
            .with_allocation(Allocation::new(SPECIALIST_REVIEWER, 4.0, 120.0))
            .with_allocation(Allocation::new(RESEARCHER, 1.0, 120.0)),
    );
    project.chapters.push(work(2.0, 7.0, 12.0));
    project.chapters.push(work(1.0, 1.0, 1.0));

    let mut shuffled = project.clone();
    shuffled.team_members.reverse();
    shuffled.chapters.reverse();

    let a = calculate_project_costs(&project);
    let b = calculate_project_costs(&shuffled);
    assert_eq!(a.duration_weeks, b.duration_weeks);
    assert_eq!(a.demand, b.demand);
    assert_eq!(a.capacity, b.capacity);
    assert_eq!(a.total, b.total);
    for member in &a.breakdown {
        assert_eq!(b.member(&member.member_id).unwrap().total, member.total);
    }
}

#[test]
fn tiered_model_bills_legacy_roles() {
    let mut project = ProjectData::new("Legacy");
    project.team_members.push(
        TeamMember::new("Lead", "Lead Editor")
            .with_allocation(Allocation::new("Lead Editor", 5.0, 120.0))
            .with_allocation(Allocation::new("Reviewer", 2.0, 90.0)),
    );
    project.chapters.push(Chapter::new("C").with_section(
        Section::new("S").with_subsection(Subsection::new("Deep", Complexity::Complex, 10.0, 0.0, 20.0)),
    ));

    let standard = calculate_project_costs(&project);
    assert_eq!(standard.unstaffed_roles, vec![EDITOR.to_string(), SPECIALIST_REVIEWER.to_string()]);
    assert_eq!(standard.duration_weeks, 0);

    let tiered = calculate_with_model(&project, &CostModel::tiered_review());
    assert_eq!(tiered.demand["Lead Editor"], 10.0);
    assert_eq!(tiered.demand["Reviewer"], 8.0);
    assert_eq!(tiered.demand["Topic Specialist"], 12.0);
    assert_eq!(tiered.unstaffed_roles, vec!["Topic Specialist".to_string()]);
    assert_eq!(tiered.duration_weeks, 1);
}

#[test]
fn fixed_costs_and_hours_are_flat_sums() {
    let mut project = scenario_a();
    project
        .fixed_costs
        .category_mut(FixedCostCategory::Software)
        .push(FixedCost::new("Licences", 250.0));
    project
        .fixed_costs
        .category_mut(FixedCostCategory::Consultants)
        .push(FixedCost::new("Advisor", 1000.0));
    project
        .fixed_costs
        .category_mut(FixedCostCategory::Consultants)
        .push(FixedCost::new("Advisor 2", 500.5));

    assert_eq!(calculate_fixed_costs(&project), 1750.5);
    let by_category = fixed_costs_by_category(&project);
    assert_eq!(by_category[&FixedCostCategory::Consultants], 1500.5);
    assert_eq!(by_category[&FixedCostCategory::Workshop], 0.0);
    assert_eq!(calculate_total_hours(&project), 25.0);

    let estimate = estimate_project(&project);
    assert_eq!(estimate.labor_costs, 5200.0);
    assert_eq!(estimate.fixed_costs, 1750.5);
    assert_eq!(estimate.grand_total, 6950.5);
    assert_eq!(estimate.total_hours, 25.0);
}

#[test]
fn estimate_serializes_for_reporting() {
    let estimate = estimate_project(&scenario_a());
    let json = serde_json::to_value(&estimate).unwrap();
    assert_eq!(json["calculation"]["duration_weeks"], 2);
    assert_eq!(json["fixed_costs_by_category"]["software"], 0.0);
    assert_eq!(json["calculation"]["breakdown"][0]["member_name"], "Member1");
}

#[test]
fn csv_round_trip_keeps_demand() {
    let mut project = scenario_a();
    project.chapters.push(
        Chapter::new("Second")
            .with_section(Section::main_topics().with_subsection(Subsection::new(
                "Direct",
                Complexity::Simple,
                1.5,
                2.0,
                0.5,
            )))
            .with_section(
                Section::new("Named")
                    .with_subsection(Subsection::new("One", Complexity::Complex, 3.0, 4.0, 2.0))
                    .with_subsection(Subsection::new("Two", Complexity::Moderate, 1.0, 1.0, 1.0)),
            ),
    );

    let mut buffer = Vec::new();
    export_chapters_to_csv(&project.chapters, &mut buffer).unwrap();
    let imported = import_chapters_from_csv(buffer.as_slice()).unwrap();

    for mapping in [DemandMapping::standard(), DemandMapping::tiered_review()] {
        assert_eq!(
            aggregate_demand(&imported, &mapping),
            aggregate_demand(&project.chapters, &mapping)
        );
    }
}
