//! Upgrades persisted project snapshots to the current schema.
//!
//! Snapshots are handled as loose JSON until every step has run, then decoded
//! into [`ProjectData`]. Each step declares the version range it covers, and the
//! steps chain without gaps up to [`CURRENT_SCHEMA_VERSION`].
//!
//! Three envelope shapes are accepted on read:
//!
//! * `{ "version": 7, "project": { ... } }`, which is what this crate writes;
//! * `{ "version": 6, "state": { "project": { ... } } }` from browser storage;
//! * a bare project object, treated as version 0.

use crate::persistence::PersistenceResult;
use crate::project::{FixedCostCategory, ProjectData, new_id};
use crate::roles::{self, CANONICAL_RATE};
use crate::serde_helpers::number_from_value;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const CURRENT_SCHEMA_VERSION: u32 = 7;

const PROJECT_KEYS: [&str; 5] = ["teamMembers", "chapters", "philosophy", "fixedCosts", "roles"];

/// Envelope written to every backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedSnapshot {
    pub version: u32,
    pub project: ProjectData,
}

impl PersistedSnapshot {
    pub fn current(project: ProjectData) -> Self {
        Self {
            version: CURRENT_SCHEMA_VERSION,
            project,
        }
    }
}

pub fn snapshot_value(project: &ProjectData) -> PersistenceResult<Value> {
    Ok(serde_json::to_value(PersistedSnapshot::current(project.clone()))?)
}

type StepFn = fn(&mut Map<String, Value>);

/// One upgrade from `from` to `to`, applied to the loose project object.
pub struct MigrationStep {
    pub from: u32,
    pub to: u32,
    pub name: &'static str,
    apply: StepFn,
}

impl MigrationStep {
    pub fn apply(&self, project: &mut Map<String, Value>) {
        (self.apply)(project)
    }
}

pub const MIGRATION_STEPS: [MigrationStep; 3] = [
    MigrationStep {
        from: 0,
        to: 5,
        name: "canonical-role-names",
        apply: canonical_role_names,
    },
    MigrationStep {
        from: 5,
        to: 6,
        name: "fixed-cost-categories",
        apply: backfill_fixed_cost_categories,
    },
    MigrationStep {
        from: 6,
        to: 7,
        name: "canonical-role-rates",
        apply: canonical_roles_and_rates,
    },
];

fn canonical_rate_table() -> Value {
    Value::Object(
        roles::canonical_preset_rates()
            .into_iter()
            .map(|(role, rate)| (role, Value::from(rate)))
            .collect(),
    )
}

fn reset_preset_rates(project: &mut Map<String, Value>) {
    match project.get_mut("roles").and_then(Value::as_object_mut) {
        Some(table) => {
            table.insert("preset".into(), canonical_rate_table());
        }
        None => {
            let mut table = Map::new();
            table.insert("preset".into(), canonical_rate_table());
            table.insert("custom".into(), Value::Object(Map::new()));
            project.insert("roles".into(), Value::Object(table));
        }
    }
}

fn canonical_role_names(project: &mut Map<String, Value>) {
    reset_preset_rates(project);

    let Some(members) = project.get_mut("teamMembers").and_then(Value::as_array_mut) else {
        return;
    };
    for member in members.iter_mut() {
        let Some(allocations) = member
            .get_mut("allocations")
            .and_then(Value::as_array_mut)
        else {
            continue;
        };
        for allocation in allocations.iter_mut().filter_map(Value::as_object_mut) {
            let canonical = allocation
                .get("role")
                .and_then(Value::as_str)
                .and_then(roles::canonical_role_for);
            if let Some(canonical) = canonical {
                allocation.insert("role".into(), Value::from(canonical));
                allocation.insert("rate".into(), Value::from(CANONICAL_RATE));
            }
        }
    }
}

/// Every pre-7 snapshot gets the full normalisation, whichever hop it enters at.
fn canonical_roles_and_rates(project: &mut Map<String, Value>) {
    canonical_role_names(project);
    backfill_fixed_cost_categories(project);
}

fn backfill_fixed_cost_categories(project: &mut Map<String, Value>) {
    let slot = project
        .entry("fixedCosts")
        .or_insert_with(|| Value::Object(Map::new()));
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    if let Some(costs) = slot.as_object_mut() {
        for category in FixedCostCategory::ALL {
            let entry = costs
                .entry(category.as_str())
                .or_insert_with(|| Value::Array(Vec::new()));
            if !entry.is_array() {
                *entry = Value::Array(Vec::new());
            }
        }
    }
}

fn coerce_object_list<'a>(
    map: &'a mut Map<String, Value>,
    key: &str,
) -> Option<&'a mut Vec<Value>> {
    let slot = map.get_mut(key)?;
    if !slot.is_array() {
        *slot = Value::Array(Vec::new());
    }
    let list = slot.as_array_mut()?;
    list.retain(Value::is_object);
    Some(list)
}

fn clean_rate_table(roles: &mut Map<String, Value>, key: &str) {
    let Some(slot) = roles.get_mut(key) else {
        return;
    };
    let cleaned: Map<String, Value> = match slot.as_object() {
        Some(table) => table
            .iter()
            .filter_map(|(role, rate)| {
                number_from_value(rate).map(|r| (role.clone(), Value::from(r.max(0.0))))
            })
            .collect(),
        None => Map::new(),
    };
    *slot = Value::Object(cleaned);
}

/// Coerces every container to the type the typed model expects, so decoding
/// degrades to empty defaults instead of failing.
fn guard_shape(project: &mut Map<String, Value>) {
    if let Some(members) = coerce_object_list(project, "teamMembers") {
        for member in members.iter_mut().filter_map(Value::as_object_mut) {
            coerce_object_list(member, "allocations");
        }
    }

    if let Some(chapters) = coerce_object_list(project, "chapters") {
        for chapter in chapters.iter_mut().filter_map(Value::as_object_mut) {
            if let Some(sections) = coerce_object_list(chapter, "sections") {
                for section in sections.iter_mut().filter_map(Value::as_object_mut) {
                    coerce_object_list(section, "subsections");
                }
            }
        }
    }

    if let Some(slot) = project.get_mut("fixedCosts") {
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        if let Some(costs) = slot.as_object_mut() {
            for category in FixedCostCategory::ALL {
                coerce_object_list(costs, category.as_str());
            }
        }
    }

    if project.get("roles").is_some_and(|roles| !roles.is_object()) {
        project.remove("roles");
    }
    if let Some(roles) = project.get_mut("roles").and_then(Value::as_object_mut) {
        clean_rate_table(roles, "preset");
        clean_rate_table(roles, "custom");
    }

    if project
        .get("philosophy")
        .is_some_and(|philosophy| !philosophy.is_object())
    {
        project.remove("philosophy");
    }
}

fn read_version(value: Option<&Value>) -> u32 {
    value
        .and_then(number_from_value)
        .filter(|v| *v >= 0.0)
        .map(|v| v.min(f64::from(u32::MAX)) as u32)
        .unwrap_or(0)
}

/// Splits any accepted envelope into `(version, project object)`.
fn split_envelope(snapshot: Value) -> (u32, Map<String, Value>) {
    let Value::Object(mut envelope) = snapshot else {
        return (0, Map::new());
    };

    if let Some(project) = envelope.remove("project") {
        let version = read_version(envelope.get("version"));
        return (version, into_object(project));
    }

    let nested = envelope
        .get_mut("state")
        .and_then(Value::as_object_mut)
        .and_then(|state| state.remove("project"));
    if let Some(project) = nested {
        let version = read_version(envelope.get("version"));
        return (version, into_object(project));
    }

    if PROJECT_KEYS.iter().any(|key| envelope.contains_key(*key)) {
        envelope.remove("version");
        return (0, envelope);
    }

    (read_version(envelope.get("version")), Map::new())
}

fn into_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Result of [`upgrade`]: the envelope at the current version plus what happened.
#[derive(Debug, Clone, PartialEq)]
pub struct Upgrade {
    pub from_version: u32,
    pub applied: Vec<&'static str>,
    pub snapshot: Value,
}

/// Runs every pending step on a loose snapshot. Applying it to its own output
/// changes nothing.
pub fn upgrade(snapshot: Value) -> Upgrade {
    let (from_version, mut project) = split_envelope(snapshot);
    let mut version = from_version;
    let mut applied = Vec::new();

    if from_version > CURRENT_SCHEMA_VERSION {
        tracing::warn!(
            version = from_version,
            current = CURRENT_SCHEMA_VERSION,
            "snapshot is newer than this build; loading without migration"
        );
    } else {
        for step in &MIGRATION_STEPS {
            if version >= step.to {
                continue;
            }
            debug_assert!(version >= step.from, "gap before step {}", step.name);
            step.apply(&mut project);
            tracing::info!(step = step.name, from = version, to = step.to, "applied migration step");
            version = step.to;
            applied.push(step.name);
        }
        debug_assert_eq!(version, CURRENT_SCHEMA_VERSION);
    }

    guard_shape(&mut project);

    let mut envelope = Map::new();
    envelope.insert("version".into(), Value::from(version));
    envelope.insert("project".into(), Value::Object(project));
    Upgrade {
        from_version,
        applied,
        snapshot: Value::Object(envelope),
    }
}

/// Post-load normalisation that runs on every load, current or not.
pub fn normalize_loaded(project: &mut ProjectData) {
    if project.id.trim().is_empty() {
        project.id = new_id();
    }
    if project.roles.reassert_canonical() {
        tracing::info!("re-asserted canonical preset role rates");
    }
}

/// Upgrades, decodes and normalises a snapshot in any accepted envelope.
pub fn restore_project(snapshot: Value) -> PersistenceResult<ProjectData> {
    let Upgrade { snapshot, .. } = upgrade(snapshot);
    let project_value = match snapshot {
        Value::Object(mut envelope) => envelope
            .remove("project")
            .unwrap_or_else(|| Value::Object(Map::new())),
        _ => Value::Object(Map::new()),
    };
    let mut project: ProjectData = serde_json::from_value(project_value)?;
    normalize_loaded(&mut project);
    Ok(project)
}
