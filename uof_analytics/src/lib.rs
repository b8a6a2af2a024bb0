mod apportion;
pub mod builder;
mod config;
mod disparity;
pub mod manual;
pub mod quick_start;

use chrono::{Datelike, NaiveDate};
use log::{debug, info};

pub use crate::apportion::*;
pub use crate::config::*;
pub use crate::disparity::*;

// **** Field-list parsing ****

/// Splits a delimited text field into an ordered sequence of trimmed,
/// non-empty tokens. Absent or empty input yields an empty sequence, never an
/// error. The source format has no escaping of the delimiter inside a token.
pub fn parse_delimited(text: Option<&str>, delimiter: char) -> Vec<String> {
    match text {
        None => Vec::new(),
        Some(s) => s
            .split(delimiter)
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(|t| t.to_string())
            .collect(),
    }
}

// **** Cardinality reconciliation ****
//
// The declared per-incident counts are authoritative. When a token list is
// shorter than the declared count, it is grown by the per-field policy below;
// when it is longer, it is left as-is and the expander consumes the first n
// tokens positionally (excess tokens are silently ignored). Lists are never
// truncated here.

const UNKNOWN_NAME: &str = "Unknown";

/// Name policy: keep the tokens that exist, pad the missing tail with
/// "Unknown".
fn reconcile_names(tokens: Vec<String>, n: usize) -> Vec<String> {
    let mut res = tokens;
    while res.len() < n {
        res.push(UNKNOWN_NAME.to_string());
    }
    res
}

/// Race policy: an empty list leaves every slot absent. A short, non-empty
/// list broadcasts the FIRST token to all n slots.
///
/// The broadcast is a documented compatibility behavior inherited from the
/// source data handling: it assumes all under-specified persons in the
/// incident share one race. It can bias race-level aggregates and must not be
/// extended to other fields.
fn reconcile_races(tokens: Vec<String>, n: usize) -> Vec<Option<String>> {
    if tokens.is_empty() {
        return vec![None; n];
    }
    if tokens.len() < n {
        let first = tokens[0].clone();
        return vec![Some(first); n];
    }
    tokens.into_iter().map(Some).collect()
}

/// Force-descriptor policy: pad the missing tail with absent.
fn reconcile_force(tokens: Vec<String>, n: usize) -> Vec<Option<String>> {
    let mut res: Vec<Option<String>> = tokens.into_iter().map(Some).collect();
    while res.len() < n {
        res.push(None);
    }
    res
}

// **** Identity hashing ****
//
// Content-derived identifiers. Identical inputs always produce identical
// digests, which is what makes re-runs reproducible. This is an identity
// derivation convenience, not a security primitive.

fn tracking_id(ren: &str) -> String {
    sha256::digest(ren.to_string())
}

fn person_uid(ren: &str, role: &str, position: u32, name: &str, race: Option<&str>) -> String {
    let key = format!(
        "{}_{}_{}_{}_{}",
        ren,
        role,
        position,
        name,
        race.unwrap_or("")
    );
    sha256::digest(key)
}

fn interaction_uid(ren: &str, citizen_position: u32, officer_position: u32) -> String {
    sha256::digest(format!("{}_c{}_o{}", ren, citizen_position, officer_position))
}

// **** Record expansion ****

/// The New Orleans troop is reported under two labels in the source data.
fn canonicalize_troop(troop: &str) -> String {
    if troop == "Troop N" {
        "Troop NOLA".to_string()
    } else {
        troop.to_string()
    }
}

fn parse_event_date(ren: &str, value: &str) -> Result<NaiveDate, AnalyticsErrors> {
    let v = value.trim();
    for fmt in ["%Y-%m-%d", "%m/%d/%Y", "%m/%d/%y"] {
        if let Ok(d) = NaiveDate::parse_from_str(v, fmt) {
            return Ok(d);
        }
    }
    Err(AnalyticsErrors::InvalidDate {
        ren: ren.to_string(),
        value: value.to_string(),
    })
}

fn normalize_lower(value: Option<&String>) -> Option<String> {
    match value {
        Some(s) if !s.trim().is_empty() => Some(s.trim().to_lowercase()),
        _ => None,
    }
}

// Reconciled per-person attribute lists for one side of an incident.
struct PersonSlots {
    names: Vec<String>,
    races: Vec<Option<String>>,
    force: Vec<Option<String>>,
}

impl PersonSlots {
    fn build(
        names: Option<&str>,
        races: Option<&str>,
        force: Option<&str>,
        declared: u32,
    ) -> PersonSlots {
        let n = declared as usize;
        PersonSlots {
            names: reconcile_names(parse_delimited(names, ','), n),
            races: reconcile_races(parse_delimited(races, ','), n),
            force: reconcile_force(parse_delimited(force, ','), n),
        }
    }

    fn name(&self, idx: usize) -> String {
        self.names
            .get(idx)
            .cloned()
            .unwrap_or_else(|| UNKNOWN_NAME.to_string())
    }

    fn race(&self, idx: usize) -> Option<String> {
        self.races.get(idx).cloned().flatten()
    }

    fn force(&self, idx: usize) -> Option<String> {
        self.force.get(idx).cloned().flatten()
    }
}

/// Expands each incident into one row per citizen.
///
/// For an incident with declared citizen count n, exactly n rows are emitted
/// with positions 1..=n, each carrying the incident's shared fields verbatim.
/// A malformed event date aborts the whole batch.
pub fn expand_citizen_level(
    incidents: &[IncidentRecord],
) -> Result<Vec<CitizenRecord>, AnalyticsErrors> {
    let mut res: Vec<CitizenRecord> = Vec::new();
    for inc in incidents.iter() {
        let date = parse_event_date(&inc.ren, &inc.event_date)?;
        let troop = canonicalize_troop(&inc.troop);
        let department_desc = troop.to_lowercase();
        let tid = tracking_id(&inc.ren);
        let slots = PersonSlots::build(
            inc.citizen_names.as_deref(),
            inc.citizen_races.as_deref(),
            inc.citizen_force.as_deref(),
            inc.citizen_count,
        );
        debug!(
            "expand_citizen_level: ren {}: declared {} citizens, {} name tokens, {} race tokens",
            inc.ren,
            inc.citizen_count,
            slots.names.len(),
            slots.races.len()
        );

        for i in 0..inc.citizen_count {
            let idx = i as usize;
            let position = i + 1;
            let name = slots.name(idx);
            let race = normalize_lower(slots.race(idx).as_ref());
            let uid = person_uid(&inc.ren, "citizen", position, &name, race.as_deref());
            res.push(CitizenRecord {
                ren: inc.ren.clone(),
                tracking_id: tid.clone(),
                incident_date: date.to_string(),
                incident_year: date.year(),
                incident_month: date.month(),
                incident_day: date.day(),
                troop: troop.clone(),
                department_desc: department_desc.clone(),
                citizen_index: position,
                citizen_name: name,
                citizen_race: race,
                force_by_citizen: normalize_lower(slots.force(idx).as_ref()),
                citizen_uid: uid,
                citizen_count: inc.citizen_count,
                officer_count: inc.officer_count,
                uses_of_force_count: inc.uses_of_force_count,
                all_citizen_names: inc.citizen_names.clone(),
                all_citizen_races: inc.citizen_races.clone(),
                officer_force: inc.officer_force.clone(),
                officer_names_raw: inc.officer_names.clone(),
                officer_races_raw: inc.officer_races.clone(),
                justified: inc.justified.clone(),
            });
        }
    }
    info!(
        "expand_citizen_level: {} incidents expanded into {} citizen rows",
        incidents.len(),
        res.len()
    );
    Ok(res)
}

/// Expands each incident into the full cartesian product of its citizens and
/// officers: n×m rows with positions (i, j), i in 1..=n, j in 1..=m. No pair
/// is filtered out.
pub fn expand_interaction_level(
    incidents: &[IncidentRecord],
) -> Result<Vec<CitizenOfficerInteraction>, AnalyticsErrors> {
    let mut res: Vec<CitizenOfficerInteraction> = Vec::new();
    for inc in incidents.iter() {
        let date = parse_event_date(&inc.ren, &inc.event_date)?;
        let troop = canonicalize_troop(&inc.troop);
        let department_desc = troop.to_lowercase();
        let tid = tracking_id(&inc.ren);
        let citizens = PersonSlots::build(
            inc.citizen_names.as_deref(),
            inc.citizen_races.as_deref(),
            inc.citizen_force.as_deref(),
            inc.citizen_count,
        );
        let officers = PersonSlots::build(
            inc.officer_names.as_deref(),
            inc.officer_races.as_deref(),
            None,
            inc.officer_count,
        );

        for i in 0..inc.citizen_count {
            let ci = i as usize;
            let citizen_position = i + 1;
            let citizen_name = citizens.name(ci);
            let citizen_race = normalize_lower(citizens.race(ci).as_ref());
            let citizen_uid = person_uid(
                &inc.ren,
                "citizen",
                citizen_position,
                &citizen_name,
                citizen_race.as_deref(),
            );
            for j in 0..inc.officer_count {
                let oi = j as usize;
                let officer_position = j + 1;
                let officer_name = officers.name(oi);
                let officer_race = normalize_lower(officers.race(oi).as_ref());
                let officer_uid = person_uid(
                    &inc.ren,
                    "officer",
                    officer_position,
                    &officer_name,
                    officer_race.as_deref(),
                );
                res.push(CitizenOfficerInteraction {
                    ren: inc.ren.clone(),
                    tracking_id: tid.clone(),
                    interaction_uid: interaction_uid(&inc.ren, citizen_position, officer_position),
                    incident_date: date.to_string(),
                    incident_year: date.year(),
                    incident_month: date.month(),
                    incident_day: date.day(),
                    troop: troop.clone(),
                    department_desc: department_desc.clone(),
                    citizen_index: citizen_position,
                    citizen_name: citizen_name.clone(),
                    citizen_race: citizen_race.clone(),
                    force_by_citizen: normalize_lower(citizens.force(ci).as_ref()),
                    citizen_uid: citizen_uid.clone(),
                    officer: OfficerRecord {
                        officer_index: officer_position,
                        officer_name,
                        officer_race,
                        officer_uid,
                    },
                    citizen_count: inc.citizen_count,
                    officer_count: inc.officer_count,
                    uses_of_force_count: inc.uses_of_force_count,
                    officer_force: inc.officer_force.clone(),
                    justified: inc.justified.clone(),
                });
            }
        }
    }
    info!(
        "expand_interaction_level: {} incidents expanded into {} citizen-officer rows",
        incidents.len(),
        res.len()
    );
    Ok(res)
}
