use estimate_core::{
    Allocation, FixedCost, FixedCostCategory, PhilosophyUpdate, ProjectData, ProjectIntent,
    ProjectSession, SubsectionUpdate, TeamMember, TeamMemberUpdate, load_chapters_from_csv,
    load_project_from_json, save_chapters_to_csv, save_project_to_json, validate_project,
    write_csv_template,
};
use estimate_core::project::Complexity;
use estimate_cost::{CostModel, ProjectEstimate, estimate_with_model};
use estimate_tool::{config::AppConfig, logging};
use std::fs::File;
use std::io::{self, Write};
use std::str::FromStr;

fn render_row(widths: &[usize], cells: &[&str]) -> String {
    let mut line = String::from("|");
    for (ci, width) in widths.iter().enumerate() {
        let cell = cells.get(ci).copied().unwrap_or("");
        line.push(' ');
        line.push_str(cell);
        line.push_str(&" ".repeat(width.saturating_sub(cell.chars().count())));
        line.push_str(" |");
    }
    line
}

fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (ci, cell) in row.iter().enumerate() {
            let len = cell.chars().count();
            if ci < widths.len() && len > widths[ci] {
                widths[ci] = len;
            }
        }
    }

    let mut sep = String::from("+");
    for w in &widths {
        sep.push_str(&"-".repeat(*w + 2));
        sep.push('+');
    }

    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    out.push_str(&render_row(&widths, headers));
    out.push('\n');
    out.push_str(&sep);
    out.push('\n');
    for row in rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        out.push_str(&render_row(&widths, &cells));
        out.push('\n');
    }
    out.push_str(&sep);
    out
}

fn print_help() {
    println!(
        "Commands:\n  help                                   Show this help\n  show                                   Show project summary\n  name <text...>                         Rename the project\n  pace <hours_per_day> [days_per_week]   Update the working philosophy\n  rate <role> <rate>                     Add or update a custom role rate\n  unrate <role>                          Remove a custom role\n  team                                   Show the roster\n  team preset                            Replace the roster with the preset team\n  member add <name> <role> <hours> [rate]\n                                         Add a member with one allocation\n  member alloc <member> <role> <hours> [rate]\n                                         Add or replace an allocation (0 hours removes it)\n  member drop <member>                   Remove a member (by #, id or name)\n  tree                                   Show the work tree\n  chapter <name...>                      Add an empty chapter\n  hours <item> <editor> <researcher> <review>\n                                         Set effort hours on a subsection (# or id)\n  complexity <item> <1|2|3>              Set subsection complexity\n  cost add <category> <amount> <name...> Add a fixed cost (software|workshop|consultants|other)\n  cost drop <category> <#|id>            Remove a fixed cost\n  costs                                  Show fixed costs\n  model <standard|tiered>                Choose the demand mapping for estimates\n  estimate                               Calculate duration and costs\n  validate                               List advisory issues\n  import csv <path>                      Replace the work tree from CSV\n  export csv <path>                      Write the work tree to CSV\n  template <path>                        Write an annotated CSV template\n  save <path>                            Save the project as JSON\n  load <path>                            Load a project from JSON\n  reset                                  Start a new empty project\n  quit|exit                              Exit\n\nUse '_' for spaces in role and member names (e.g. Specialist_Reviewer)."
    );
}

fn token(raw: &str) -> String {
    raw.replace('_', " ")
}

fn money(value: f64) -> String {
    format!("{value:.2}")
}

fn hours(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

fn print_team(project: &ProjectData) {
    let rows: Vec<Vec<String>> = project
        .team_members
        .iter()
        .enumerate()
        .map(|(idx, member)| {
            let allocations = member
                .allocations
                .iter()
                .map(|a| format!("{} {}h@{}", a.role, hours(a.hours_per_day), hours(a.rate)))
                .collect::<Vec<_>>()
                .join(", ");
            vec![
                (idx + 1).to_string(),
                member.name.clone(),
                member.primary_role.clone(),
                allocations,
                hours(member.total_hours_per_day()),
            ]
        })
        .collect();
    println!(
        "{}",
        render_table(&["#", "name", "primary_role", "allocations", "h/day"], &rows)
    );
}

fn print_tree(project: &ProjectData) {
    let mut rows = Vec::new();
    let mut idx = 0;
    for chapter in &project.chapters {
        for section in &chapter.sections {
            for sub in &section.subsections {
                idx += 1;
                let section_name = if section.is_synthetic() {
                    String::new()
                } else {
                    section.name.clone()
                };
                rows.push(vec![
                    idx.to_string(),
                    chapter.name.clone(),
                    section_name,
                    sub.name.clone(),
                    sub.complexity.to_string(),
                    hours(sub.editor_hours),
                    hours(sub.researcher_hours),
                    hours(sub.review_hours),
                ]);
            }
        }
    }
    println!(
        "{}",
        render_table(
            &["#", "chapter", "section", "subsection", "cx", "editor", "researcher", "review"],
            &rows
        )
    );
}

fn print_fixed_costs(project: &ProjectData) {
    let mut rows = Vec::new();
    for category in FixedCostCategory::ALL {
        for (idx, cost) in project.fixed_costs.category(category).iter().enumerate() {
            rows.push(vec![
                category.to_string(),
                (idx + 1).to_string(),
                cost.name.clone(),
                money(cost.amount),
            ]);
        }
    }
    println!("{}", render_table(&["category", "#", "name", "amount"], &rows));
}

fn print_summary(project: &ProjectData) {
    println!("Project name       : {}", project.name);
    println!(
        "Philosophy         : {}h/day x {} days = {}h/week",
        project.philosophy.hours_per_day(),
        project.philosophy.days_per_week(),
        project.philosophy.hours_per_week()
    );
    let roles = project.roles.role_names().collect::<Vec<_>>().join(", ");
    println!("Roles              : {roles}");
    println!("Team members       : {}", project.team_members.len());
    println!("Chapters           : {}", project.chapters.len());
    println!("Subsections        : {}", project.subsections().count());
    println!("Updated at         : {}", project.updated_at.to_rfc3339());
}

fn print_estimate(estimate: &ProjectEstimate) {
    let calc = &estimate.calculation;
    let role_rows: Vec<Vec<String>> = calc
        .demand
        .iter()
        .map(|(role, demand)| {
            let capacity = calc.capacity.get(role).copied().unwrap_or(0.0);
            let utilization = calc
                .utilization(role)
                .map(|u| format!("{:.0}%", u * 100.0))
                .unwrap_or_default();
            vec![role.clone(), hours(*demand), hours(capacity), utilization]
        })
        .collect();
    println!(
        "{}",
        render_table(&["role", "demand_h", "capacity_h/wk", "utilization"], &role_rows)
    );

    let member_rows: Vec<Vec<String>> = calc
        .breakdown
        .iter()
        .map(|m| {
            let hours_total: f64 = m.allocations.iter().map(|a| a.hours).sum();
            vec![m.member_name.clone(), hours(hours_total), money(m.total)]
        })
        .collect();
    println!("{}", render_table(&["member", "hours", "cost"], &member_rows));

    println!("Duration: {} weeks", calc.duration_weeks);
    if let Some(role) = &calc.bottleneck_role {
        println!("Bottleneck role: {role}");
    }
    if !calc.unstaffed_roles.is_empty() {
        println!(
            "Unstaffed roles (not counted in duration): {}",
            calc.unstaffed_roles.join(", ")
        );
    }
    println!("Total labor cost: {}", money(estimate.labor_costs));
    println!("Fixed costs: {}", money(estimate.fixed_costs));
    println!("Grand total: {}", money(estimate.grand_total));
    println!("Total effort hours: {}", hours(estimate.total_hours));
}

/// Resolves a 1-based roster index, an id, or an exact name.
fn resolve_member(project: &ProjectData, key: &str) -> Option<TeamMember> {
    if let Ok(idx) = key.parse::<usize>() {
        if let Some(member) = idx.checked_sub(1).and_then(|i| project.team_members.get(i)) {
            return Some(member.clone());
        }
    }
    project.find_member(key).or_else(|| project.find_member(&token(key))).cloned()
}

/// Resolves a 1-based position in the flattened tree, or a subsection id.
fn resolve_subsection(project: &ProjectData, key: &str) -> Option<(String, String, String)> {
    if let Ok(idx) = key.parse::<usize>() {
        return project
            .chapters
            .iter()
            .flat_map(|c| {
                c.sections.iter().flat_map(move |s| {
                    s.subsections
                        .iter()
                        .map(move |sub| (c.id.clone(), s.id.clone(), sub.id.clone()))
                })
            })
            .nth(idx.checked_sub(1)?);
    }
    let (chapter_id, section_id) = project.locate_subsection(key)?;
    Some((chapter_id.to_string(), section_id.to_string(), key.to_string()))
}

fn parse_hours(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|v| v.is_finite() && *v >= 0.0)
}

fn apply(session: &mut ProjectSession, intent: ProjectIntent, message: &str) {
    match session.apply(intent) {
        Ok(_) => println!("{message}"),
        Err(e) => println!("Error saving project: {e}"),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    if let Err(err) = logging::init(&config.log_filter) {
        eprintln!("logging disabled: {err}");
    }

    let mut session = match config.open_session() {
        Ok(session) => session,
        Err(err) => {
            eprintln!("{err}; continuing with an in-memory project");
            ProjectSession::new()
        }
    };
    let mut model = CostModel::default();

    println!("Estimate Tool (CLI) - type 'help' for commands\n");
    print_summary(&session.project());

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let mut parts = input.split_whitespace();
        let cmd = parts.next().unwrap_or("");

        match cmd {
            "help" => print_help(),
            "quit" | "exit" => break,
            "show" => print_summary(&session.project()),
            "name" => {
                let name = parts.collect::<Vec<_>>().join(" ");
                if name.is_empty() {
                    println!("Usage: name <text...>");
                    continue;
                }
                apply(&mut session, ProjectIntent::Rename(name), "Project renamed.");
            }
            "pace" => {
                let hours_per_day = parts.next().map(str::parse::<u32>);
                let days_per_week = parts.next().map(str::parse::<u32>);
                match (hours_per_day, days_per_week) {
                    (Some(Ok(h)), None) => apply(
                        &mut session,
                        ProjectIntent::UpdatePhilosophy(PhilosophyUpdate {
                            hours_per_day: Some(h),
                            days_per_week: None,
                        }),
                        "Philosophy updated.",
                    ),
                    (Some(Ok(h)), Some(Ok(d))) => apply(
                        &mut session,
                        ProjectIntent::UpdatePhilosophy(PhilosophyUpdate {
                            hours_per_day: Some(h),
                            days_per_week: Some(d),
                        }),
                        "Philosophy updated.",
                    ),
                    _ => {
                        println!("Usage: pace <hours_per_day> [days_per_week]");
                        continue;
                    }
                }
                let philosophy = session.project().philosophy;
                println!(
                    "Pace is now {}h/day x {} days = {}h/week",
                    philosophy.hours_per_day(),
                    philosophy.days_per_week(),
                    philosophy.hours_per_week()
                );
            }
            "rate" => match (parts.next(), parts.next().and_then(parse_hours)) {
                (Some(role), Some(rate)) => {
                    let role = token(role);
                    if session.project().roles.is_preset(&role) {
                        println!("Preset role '{role}' keeps its canonical rate.");
                        continue;
                    }
                    apply(
                        &mut session,
                        ProjectIntent::SetCustomRate {
                            role: role.clone(),
                            rate,
                        },
                        &format!("Custom role '{role}' set to {}.", money(rate)),
                    );
                }
                _ => println!("Usage: rate <role> <rate>"),
            },
            "unrate" => match parts.next() {
                Some(role) => {
                    let role = token(role);
                    if !session.project().roles.custom.contains_key(&role) {
                        println!("No custom role '{role}'.");
                        continue;
                    }
                    apply(
                        &mut session,
                        ProjectIntent::RemoveCustomRate { role: role.clone() },
                        &format!("Custom role '{role}' removed."),
                    );
                }
                None => println!("Usage: unrate <role>"),
            },
            "team" => match parts.next() {
                None => print_team(&session.project()),
                Some("preset") => {
                    apply(&mut session, ProjectIntent::LoadPresetTeam, "Preset team loaded.");
                    print_team(&session.project());
                }
                Some(_) => println!("Usage: team [preset]"),
            },
            "member" => match parts.next() {
                Some("add") => {
                    let name = parts.next();
                    let role = parts.next();
                    let hours_s = parts.next().and_then(parse_hours);
                    let rate_s = parts.next();
                    match (name, role, hours_s) {
                        (Some(name), Some(role), Some(hours_per_day)) => {
                            let role = token(role);
                            let rate = match rate_s {
                                Some(raw) => match parse_hours(raw) {
                                    Some(rate) => rate,
                                    None => {
                                        println!("Invalid rate");
                                        continue;
                                    }
                                },
                                None => session.project().roles.default_rate_for(&role),
                            };
                            let member = TeamMember::new(token(name), role.clone())
                                .with_allocation(Allocation::new(role, hours_per_day, rate));
                            let name = member.name.clone();
                            apply(
                                &mut session,
                                ProjectIntent::AddTeamMember(member),
                                &format!("Added member '{name}'."),
                            );
                        }
                        _ => println!("Usage: member add <name> <role> <hours> [rate]"),
                    }
                }
                Some("alloc") => {
                    let key = parts.next();
                    let role = parts.next();
                    let hours_s = parts.next().and_then(parse_hours);
                    let rate_s = parts.next();
                    match (key, role, hours_s) {
                        (Some(key), Some(role), Some(hours_per_day)) => {
                            let project = session.project();
                            let Some(mut member) = resolve_member(&project, key) else {
                                println!("Member '{key}' not found.");
                                continue;
                            };
                            let role = token(role);
                            let rate = match rate_s.map(parse_hours) {
                                Some(Some(rate)) => rate,
                                Some(None) => {
                                    println!("Invalid rate");
                                    continue;
                                }
                                None => member
                                    .allocation_for(&role)
                                    .map(|a| a.rate)
                                    .unwrap_or_else(|| project.roles.default_rate_for(&role)),
                            };
                            if hours_per_day == 0.0 {
                                member.remove_allocation(&role);
                            } else {
                                member.upsert_allocation(Allocation::new(
                                    role.clone(),
                                    hours_per_day,
                                    rate,
                                ));
                            }
                            apply(
                                &mut session,
                                ProjectIntent::UpdateTeamMember {
                                    id: member.id.clone(),
                                    update: TeamMemberUpdate {
                                        allocations: Some(member.allocations),
                                        ..Default::default()
                                    },
                                },
                                &format!("Allocation for '{}' updated.", member.name),
                            );
                        }
                        _ => println!("Usage: member alloc <member> <role> <hours> [rate]"),
                    }
                }
                Some("drop") => match parts.next() {
                    Some(key) => {
                        let Some(member) = resolve_member(&session.project(), key) else {
                            println!("Member '{key}' not found.");
                            continue;
                        };
                        apply(
                            &mut session,
                            ProjectIntent::RemoveTeamMember {
                                id: member.id.clone(),
                            },
                            &format!("Removed member '{}'.", member.name),
                        );
                    }
                    None => println!("Usage: member drop <member>"),
                },
                _ => println!("Usage: member <add|alloc|drop> ..."),
            },
            "tree" => print_tree(&session.project()),
            "chapter" => {
                let name = parts.collect::<Vec<_>>().join(" ");
                if name.is_empty() {
                    println!("Usage: chapter <name...>");
                    continue;
                }
                apply(
                    &mut session,
                    ProjectIntent::AddChapter(estimate_core::Chapter::new(name.clone())),
                    &format!("Added chapter '{name}'."),
                );
            }
            "hours" => {
                let key = parts.next();
                let values: Vec<Option<f64>> = parts.take(3).map(parse_hours).collect();
                match (key, values.as_slice()) {
                    (Some(key), [Some(editor), Some(researcher), Some(review)]) => {
                        let Some((chapter_id, section_id, subsection_id)) =
                            resolve_subsection(&session.project(), key)
                        else {
                            println!("Subsection '{key}' not found.");
                            continue;
                        };
                        apply(
                            &mut session,
                            ProjectIntent::UpdateSubsection {
                                chapter_id,
                                section_id,
                                subsection_id,
                                update: SubsectionUpdate {
                                    editor_hours: Some(*editor),
                                    researcher_hours: Some(*researcher),
                                    review_hours: Some(*review),
                                    ..Default::default()
                                },
                            },
                            "Subsection hours updated.",
                        );
                    }
                    _ => println!("Usage: hours <item> <editor> <researcher> <review>"),
                }
            }
            "complexity" => {
                let key = parts.next();
                let tier = parts
                    .next()
                    .and_then(|raw| raw.parse::<i64>().ok())
                    .and_then(Complexity::from_tier);
                match (key, tier) {
                    (Some(key), Some(complexity)) => {
                        let Some((chapter_id, section_id, subsection_id)) =
                            resolve_subsection(&session.project(), key)
                        else {
                            println!("Subsection '{key}' not found.");
                            continue;
                        };
                        apply(
                            &mut session,
                            ProjectIntent::UpdateSubsection {
                                chapter_id,
                                section_id,
                                subsection_id,
                                update: SubsectionUpdate {
                                    complexity: Some(complexity),
                                    ..Default::default()
                                },
                            },
                            &format!("Complexity set to {} ({}).", complexity, complexity.label()),
                        );
                    }
                    _ => println!("Usage: complexity <item> <1|2|3>"),
                }
            }
            "cost" => match parts.next() {
                Some("add") => {
                    let category = parts.next().map(FixedCostCategory::from_str);
                    let amount = parts.next().and_then(parse_hours);
                    let name = parts.collect::<Vec<_>>().join(" ");
                    match (category, amount) {
                        (Some(Ok(category)), Some(amount)) if !name.is_empty() => apply(
                            &mut session,
                            ProjectIntent::AddFixedCost {
                                category,
                                cost: FixedCost::new(name.clone(), amount),
                            },
                            &format!("Added {category} cost '{name}'."),
                        ),
                        (Some(Err(e)), _) => println!("{e}"),
                        _ => println!("Usage: cost add <category> <amount> <name...>"),
                    }
                }
                Some("drop") => {
                    let category = parts.next().map(FixedCostCategory::from_str);
                    let key = parts.next();
                    match (category, key) {
                        (Some(Ok(category)), Some(key)) => {
                            let project = session.project();
                            let list = project.fixed_costs.category(category);
                            let found = key
                                .parse::<usize>()
                                .ok()
                                .and_then(|i| i.checked_sub(1))
                                .and_then(|i| list.get(i))
                                .or_else(|| list.iter().find(|c| c.id == key));
                            let Some(cost) = found else {
                                println!("No {category} cost '{key}'.");
                                continue;
                            };
                            apply(
                                &mut session,
                                ProjectIntent::RemoveFixedCost {
                                    category,
                                    id: cost.id.clone(),
                                },
                                &format!("Removed {category} cost '{}'.", cost.name),
                            );
                        }
                        (Some(Err(e)), _) => println!("{e}"),
                        _ => println!("Usage: cost drop <category> <#|id>"),
                    }
                }
                _ => println!("Usage: cost <add|drop> ..."),
            },
            "costs" => print_fixed_costs(&session.project()),
            "model" => match parts.next() {
                Some("standard") => {
                    model = CostModel::default();
                    println!("Using the standard demand mapping.");
                }
                Some("tiered") => {
                    model = CostModel::tiered_review();
                    println!("Using the tiered review demand mapping.");
                }
                _ => println!("Usage: model <standard|tiered>"),
            },
            "estimate" => {
                let estimate = estimate_with_model(&session.project(), &model);
                print_estimate(&estimate);
            }
            "validate" => {
                let issues = validate_project(&session.project());
                if issues.is_empty() {
                    println!("No issues found.");
                }
                for issue in issues {
                    println!("{issue}");
                }
            }
            "import" => match (parts.next(), parts.next()) {
                (Some("csv"), Some(path)) => match load_chapters_from_csv(path) {
                    Ok(chapters) => {
                        let count = chapters.len();
                        apply(
                            &mut session,
                            ProjectIntent::ImportChapters(chapters),
                            &format!("Imported {count} chapters from {path}"),
                        );
                    }
                    Err(e) => println!("Import error: {e}"),
                },
                _ => println!("Usage: import csv <path>"),
            },
            "export" => match (parts.next(), parts.next()) {
                (Some("csv"), Some(path)) => {
                    match save_chapters_to_csv(&session.project().chapters, path) {
                        Ok(()) => println!("Work tree exported to {path}"),
                        Err(e) => println!("Export error: {e}"),
                    }
                }
                _ => println!("Usage: export csv <path>"),
            },
            "template" => match parts.next() {
                Some(path) => {
                    let result = File::create(path)
                        .map_err(estimate_core::PersistenceError::from)
                        .and_then(write_csv_template);
                    match result {
                        Ok(()) => println!("Template written to {path}"),
                        Err(e) => println!("Template error: {e}"),
                    }
                }
                None => println!("Usage: template <path>"),
            },
            "save" => match parts.next() {
                Some(path) => match save_project_to_json(&session.project(), path) {
                    Ok(()) => println!("Project saved to {path}"),
                    Err(e) => println!("Save error: {e}"),
                },
                None => println!("Usage: save <path>"),
            },
            "load" => match parts.next() {
                Some(path) => match load_project_from_json(path) {
                    Ok(project) => apply(
                        &mut session,
                        ProjectIntent::Load(project),
                        &format!("Project loaded from {path}"),
                    ),
                    Err(e) => println!("Load error: {e}"),
                },
                None => println!("Usage: load <path>"),
            },
            "reset" => apply(&mut session, ProjectIntent::Reset, "Project reset."),
            _ => println!("Unknown command '{cmd}'. Type 'help' for commands."),
        }
    }

    Ok(())
}
