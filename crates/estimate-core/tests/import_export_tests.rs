use estimate_core::roles;
use estimate_core::{
    Allocation, Chapter, Complexity, FixedCost, JsonFileStore, MAIN_TOPICS, PersistenceError,
    ProjectData, ProjectStore, Section, Subsection, TeamMember, export_chapters_to_csv,
    import_chapters_from_csv, load_chapters_from_csv, load_project_from_json,
    save_chapters_to_csv, save_project_to_json,
};
use tempfile::{NamedTempFile, tempdir};

fn build_sample_project() -> ProjectData {
    let mut project = ProjectData::new("Export Project");
    project.team_members.push(
        TeamMember::new("Ada", roles::EDITOR)
            .with_allocation(Allocation::new(roles::EDITOR, 3.0, 120.0))
            .with_allocation(Allocation::new(roles::RESEARCHER, 2.0, 80.0)),
    );
    project.chapters.push(
        Chapter::new("Chapter 1")
            .with_section(Section::new("Overview").with_subsection(Subsection::new(
                "Overview",
                Complexity::Simple,
                2.0,
                3.0,
                1.0,
            )))
            .with_section(
                Section::new("History")
                    .with_subsection(Subsection::new("Origins", Complexity::Moderate, 3.0, 5.0, 1.0))
                    .with_subsection(Subsection::new("Today", Complexity::Complex, 5.0, 8.0, 2.5)),
            ),
    );
    project.chapters.push(
        Chapter::new("Chapter 2").with_section(
            Section::main_topics()
                .with_subsection(Subsection::new("Principles", Complexity::Moderate, 4.0, 6.0, 2.0)),
        ),
    );
    project
        .fixed_costs
        .software
        .push(FixedCost::new("Licences", 450.0));
    project
}

fn effort_totals(chapters: &[Chapter]) -> (f64, f64, f64) {
    chapters
        .iter()
        .flat_map(Chapter::subsections)
        .fold((0.0, 0.0, 0.0), |(e, r, v), s| {
            (e + s.editor_hours, r + s.researcher_hours, v + s.review_hours)
        })
}

#[test]
fn json_round_trip_preserves_project() {
    let project = build_sample_project();
    let file = NamedTempFile::new().unwrap();

    save_project_to_json(&project, file.path()).unwrap();
    let loaded = load_project_from_json(file.path()).unwrap();
    assert_eq!(loaded, project);

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(file.path()).unwrap()).unwrap();
    assert_eq!(raw["version"], 7);
    assert_eq!(raw["project"]["teamMembers"][0]["allocations"][0]["hoursPerDay"], 3.0);
}

#[test]
fn json_store_reports_missing_file_as_empty() {
    let dir = tempdir().unwrap();
    let store = JsonFileStore::new(dir.path().join("nested").join("project.json"));
    assert!(store.load_project().unwrap().is_none());

    let project = build_sample_project();
    store.save_project(&project).unwrap();
    assert_eq!(store.load_project().unwrap(), Some(project));
}

#[test]
fn json_store_surfaces_unreadable_json() {
    let file = NamedTempFile::new().unwrap();
    std::fs::write(file.path(), "{ not json").unwrap();
    let store = JsonFileStore::new(file.path());
    assert!(matches!(
        store.load_project(),
        Err(PersistenceError::Serialization(_))
    ));
}

#[test]
fn csv_round_trip_preserves_demand_totals() {
    let project = build_sample_project();
    let file = NamedTempFile::new().unwrap();

    save_chapters_to_csv(&project.chapters, file.path()).unwrap();
    let imported = load_chapters_from_csv(file.path()).unwrap();

    assert_eq!(imported.len(), 2);
    assert_eq!(effort_totals(&imported), effort_totals(&project.chapters));
    let names: Vec<_> = imported[1].subsections().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["Principles"]);
    // the Main Topics bucket comes back as a direct subsection
    assert_ne!(imported[1].sections[0].name, MAIN_TOPICS);
    assert!(imported[1].sections[0].is_synthetic());
}

#[test]
fn csv_export_blanks_synthetic_sections() {
    let project = build_sample_project();
    let mut buffer = Vec::new();
    export_chapters_to_csv(&project.chapters, &mut buffer).unwrap();
    let text = String::from_utf8(buffer).unwrap();
    let lines: Vec<_> = text.lines().collect();

    assert_eq!(
        lines[0],
        "Chapter,Section,Subsection,Complexity,Editor Hours,Researcher Hours,Review Hours"
    );
    assert_eq!(lines[1], "Chapter 1,,Overview,1,2,3,1");
    assert_eq!(lines[2], "Chapter 1,History,Origins,2,3,5,1");
    assert_eq!(lines[3], "Chapter 1,History,Today,3,5,8,2.5");
    assert_eq!(lines[4], "Chapter 2,,Principles,2,4,6,2");
}

#[test]
fn csv_import_reuses_names_and_skips_comments() {
    let csv = "\
Chapter,Section,Subsection,Complexity,Editor Hours,Researcher Hours,Review Hours
# a note that is not data,,,,,,
Intro,,Welcome,1,1,1,1
Intro,,Welcome,3,9,9,9
Intro,Setup,Install,2,2,2,2
,Setup,Configure,2,1,1,1
,,,,,,
Intro,Setup,Install,3,5,5,5
Next,,Later,2,1,1,1
";
    let chapters = import_chapters_from_csv(csv.as_bytes()).unwrap();
    assert_eq!(chapters.len(), 2);

    let intro = &chapters[0];
    assert_eq!(intro.sections.len(), 2);
    assert_eq!(intro.sections[0].name, "Welcome");
    assert_eq!(intro.sections[0].subsections.len(), 1);
    assert_eq!(intro.sections[0].subsections[0].editor_hours, 1.0);

    let setup = &intro.sections[1];
    let names: Vec<_> = setup.subsections.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["Install", "Configure"]);
    assert_eq!(setup.subsections[0].editor_hours, 2.0);
}

#[cfg(feature = "sqlite")]
mod sqlite {
    use super::*;
    use estimate_core::SqliteProjectStore;

    #[test]
    fn sqlite_store_round_trip() {
        let dir = tempdir().unwrap();
        let store = SqliteProjectStore::new(dir.path().join("estimates.db")).unwrap();
        assert!(store.load_project().unwrap().is_none());

        let project = build_sample_project();
        store.save_project(&project).unwrap();
        store.save_project(&project).unwrap();
        assert_eq!(store.load_project().unwrap(), Some(project));
    }

    #[test]
    fn sqlite_store_migrates_legacy_blobs() {
        let store = SqliteProjectStore::in_memory().unwrap();
        store
            .save_raw(
                r#"{"version": 5, "state": {"project": {
                    "id": "old", "name": "Old",
                    "teamMembers": [{"id": "m", "name": "Lee", "allocations": [
                        {"role": "Reviewer", "hoursPerDay": 2, "rate": 70}
                    ]}],
                    "fixedCosts": {"software": []}
                }}}"#,
            )
            .unwrap();

        let project = store.load_project().unwrap().unwrap();
        assert_eq!(project.name, "Old");
        let allocation = &project.team_members[0].allocations[0];
        assert_eq!(allocation.role, roles::SPECIALIST_REVIEWER);
        assert_eq!(allocation.rate, roles::CANONICAL_RATE);
        assert!(project.fixed_costs.consultants.is_empty());
        assert_eq!(project.roles.preset, roles::canonical_preset_rates());
    }
}
