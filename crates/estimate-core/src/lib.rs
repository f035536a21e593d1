pub mod migration;
pub mod persistence;
pub mod project;
pub mod roles;
pub mod serde_helpers;
pub mod session;
pub mod validation;

pub use migration::{CURRENT_SCHEMA_VERSION, PersistedSnapshot, Upgrade, restore_project, upgrade};
#[cfg(feature = "sqlite")]
pub use persistence::sqlite::SqliteProjectStore;
pub use persistence::{
    JsonFileStore, PersistenceError, PersistenceResult, ProjectStore, export_chapters_to_csv,
    import_chapters_from_csv, load_chapters_from_csv, load_project_from_json,
    save_chapters_to_csv, save_project_to_json, write_csv_template,
};
pub use project::{
    Allocation, Chapter, Complexity, FixedCost, FixedCostCategory, FixedCosts, MAIN_TOPICS,
    Philosophy, ProjectData, Section, Subsection, TeamMember, preset_team,
};
pub use roles::RoleRates;
pub use session::{
    PhilosophyUpdate, ProjectIntent, ProjectSession, SubsectionUpdate, TeamMemberUpdate,
    apply_intent,
};
pub use validation::{Severity, ValidationIssue, validate_project};
