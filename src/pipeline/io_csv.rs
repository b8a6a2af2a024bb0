//! Reading the raw incident extracts and writing the expanded output tables.

use std::io::{Read, Write};
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use uof_analytics::builder::Builder;
use uof_analytics::{
    CitizenOfficerInteraction, CitizenRecord, CoveragePopulation, IncidentRecord, RaceCategory,
};

use crate::pipeline::{
    fmt_pct, fmt_ratio, CsvDecodeSnafu, CsvOpenSnafu, CsvWriteSnafu, PipelineResult,
    ScopedDisparity, WritingOutputSnafu,
};

// **** Raw input rows ****

/// One row of the raw extract, with the original column headers.
#[derive(Deserialize, Debug, Clone)]
struct RawIncidentRow {
    #[serde(rename = "REN")]
    ren: String,
    #[serde(rename = "Event Start Date")]
    event_date: String,
    #[serde(rename = "Troop")]
    troop: String,
    #[serde(rename = "Subject Count")]
    citizen_count: Option<u32>,
    #[serde(rename = "Trooper/Officer Count")]
    officer_count: Option<u32>,
    #[serde(rename = "Subject Full Name")]
    citizen_names: Option<String>,
    #[serde(rename = "Subject Race")]
    citizen_races: Option<String>,
    #[serde(rename = "Type of Force Used By Subject")]
    citizen_force: Option<String>,
    #[serde(rename = "Trooper/Officer Name")]
    officer_names: Option<String>,
    #[serde(rename = "Trooper/Officer Race")]
    officer_races: Option<String>,
    #[serde(rename = "Type of Force Used By Officer")]
    officer_force: Option<String>,
    #[serde(rename = "# of Uses of Force")]
    uses_of_force_count: Option<u32>,
    #[serde(rename = "Justified (Y/N)")]
    justified: Option<String>,
}

impl RawIncidentRow {
    fn into_incident(self) -> IncidentRecord {
        IncidentRecord {
            ren: self.ren,
            event_date: self.event_date,
            troop: self.troop,
            citizen_count: self.citizen_count.unwrap_or(0),
            officer_count: self.officer_count.unwrap_or(0),
            citizen_names: self.citizen_names,
            citizen_races: self.citizen_races,
            citizen_force: self.citizen_force,
            officer_names: self.officer_names,
            officer_races: self.officer_races,
            officer_force: self.officer_force,
            uses_of_force_count: self.uses_of_force_count,
            justified: self.justified,
        }
    }
}

/// Reads one raw incident extract into the builder.
pub fn read_incident_file(path: &str, builder: &mut Builder) -> PipelineResult<()> {
    let rdr = csv::Reader::from_path(path).context(CsvOpenSnafu {
        path: path.to_string(),
    })?;
    let n = read_incidents(rdr, builder)?;
    info!("read_incident_file: {} incidents read from {}", n, path);
    Ok(())
}

fn read_incidents<R: Read>(mut rdr: csv::Reader<R>, builder: &mut Builder) -> PipelineResult<usize> {
    let mut n: usize = 0;
    for (idx, result) in rdr.deserialize().enumerate() {
        // Header is line 1, so data rows start at line 2.
        let row: RawIncidentRow = result.context(CsvDecodeSnafu { lineno: idx + 2 })?;
        builder.add_incident(row.into_incident());
        n += 1;
    }
    Ok(n)
}

// **** Output rows ****

#[derive(Serialize, Debug)]
struct CitizenOutputRow<'a> {
    ren: &'a str,
    tracking_id: &'a str,
    incident_date: &'a str,
    incident_year: i32,
    incident_month: u32,
    incident_day: u32,
    troop: &'a str,
    department_desc: &'a str,
    agency: &'a str,
    citizen_index: u32,
    citizen_name: &'a str,
    citizen_race: Option<&'a str>,
    use_of_force_by_citizen: Option<&'a str>,
    citizen_uid: &'a str,
    subject_count: u32,
    trooper_officer_count: u32,
    number_of_uses_of_force: Option<u32>,
    all_subject_names: Option<&'a str>,
    all_subject_races: Option<&'a str>,
    type_of_force_used_by_officer: Option<&'a str>,
    trooper_officer_names: Option<&'a str>,
    trooper_officer_races: Option<&'a str>,
    justified: Option<&'a str>,
}

impl<'a> CitizenOutputRow<'a> {
    fn from_record(r: &'a CitizenRecord, agency: &'a str) -> CitizenOutputRow<'a> {
        CitizenOutputRow {
            ren: &r.ren,
            tracking_id: &r.tracking_id,
            incident_date: &r.incident_date,
            incident_year: r.incident_year,
            incident_month: r.incident_month,
            incident_day: r.incident_day,
            troop: &r.troop,
            department_desc: &r.department_desc,
            agency,
            citizen_index: r.citizen_index,
            citizen_name: &r.citizen_name,
            citizen_race: r.citizen_race.as_deref(),
            use_of_force_by_citizen: r.force_by_citizen.as_deref(),
            citizen_uid: &r.citizen_uid,
            subject_count: r.citizen_count,
            trooper_officer_count: r.officer_count,
            number_of_uses_of_force: r.uses_of_force_count,
            all_subject_names: r.all_citizen_names.as_deref(),
            all_subject_races: r.all_citizen_races.as_deref(),
            type_of_force_used_by_officer: r.officer_force.as_deref(),
            trooper_officer_names: r.officer_names_raw.as_deref(),
            trooper_officer_races: r.officer_races_raw.as_deref(),
            justified: r.justified.as_deref(),
        }
    }
}

#[derive(Serialize, Debug)]
struct InteractionOutputRow<'a> {
    ren: &'a str,
    tracking_id: &'a str,
    interaction_uid: &'a str,
    incident_date: &'a str,
    incident_year: i32,
    incident_month: u32,
    incident_day: u32,
    troop: &'a str,
    department_desc: &'a str,
    agency: &'a str,
    citizen_index: u32,
    citizen_name: &'a str,
    citizen_race: Option<&'a str>,
    use_of_force_by_citizen: Option<&'a str>,
    citizen_uid: &'a str,
    officer_index: u32,
    officer_name: &'a str,
    officer_race: Option<&'a str>,
    officer_uid: &'a str,
    subject_count: u32,
    trooper_officer_count: u32,
    number_of_uses_of_force: Option<u32>,
    type_of_force_used_by_officer: Option<&'a str>,
    justified: Option<&'a str>,
}

impl<'a> InteractionOutputRow<'a> {
    fn from_record(r: &'a CitizenOfficerInteraction, agency: &'a str) -> InteractionOutputRow<'a> {
        InteractionOutputRow {
            ren: &r.ren,
            tracking_id: &r.tracking_id,
            interaction_uid: &r.interaction_uid,
            incident_date: &r.incident_date,
            incident_year: r.incident_year,
            incident_month: r.incident_month,
            incident_day: r.incident_day,
            troop: &r.troop,
            department_desc: &r.department_desc,
            agency,
            citizen_index: r.citizen_index,
            citizen_name: &r.citizen_name,
            citizen_race: r.citizen_race.as_deref(),
            use_of_force_by_citizen: r.force_by_citizen.as_deref(),
            citizen_uid: &r.citizen_uid,
            officer_index: r.officer.officer_index,
            officer_name: &r.officer.officer_name,
            officer_race: r.officer.officer_race.as_deref(),
            officer_uid: &r.officer.officer_uid,
            subject_count: r.citizen_count,
            trooper_officer_count: r.officer_count,
            number_of_uses_of_force: r.uses_of_force_count,
            type_of_force_used_by_officer: r.officer_force.as_deref(),
            justified: r.justified.as_deref(),
        }
    }
}

#[derive(Serialize, Debug)]
struct PopulationOutputRow<'a> {
    troop: &'a str,
    black_16plus: u64,
    white_16plus: u64,
    hispanic_16plus: u64,
    native_american_16plus: u64,
    asian_pacific_islander_16plus: u64,
    total_16plus: u64,
}

#[derive(Serialize, Debug)]
struct DisparityOutputRow<'a> {
    scope: &'a str,
    race: &'a str,
    incident_count: u64,
    incident_share_pct: String,
    population_share_pct: String,
    disparity_ratio: String,
}

fn writer_for(path: &Path) -> PipelineResult<csv::Writer<std::fs::File>> {
    csv::Writer::from_path(path).context(CsvWriteSnafu {
        path: path.display().to_string(),
    })
}

// The csv writer buffers internally: the tail of the file only reaches disk
// at flush, so a flush failure means a truncated output and must abort the
// run.
fn finish<W: Write>(mut wtr: csv::Writer<W>, path: &str) -> PipelineResult<()> {
    wtr.flush().context(WritingOutputSnafu {
        path: path.to_string(),
    })
}

fn write_citizen_rows<W: Write>(
    mut wtr: csv::Writer<W>,
    rows: &[CitizenRecord],
    agency: &str,
    path: &str,
) -> PipelineResult<()> {
    for r in rows.iter() {
        wtr.serialize(CitizenOutputRow::from_record(r, agency))
            .context(CsvWriteSnafu {
                path: path.to_string(),
            })?;
    }
    finish(wtr, path)
}

pub fn write_citizen_file(
    path: &Path,
    rows: &[CitizenRecord],
    agency: &str,
) -> PipelineResult<()> {
    let wtr = writer_for(path)?;
    write_citizen_rows(wtr, rows, agency, &path.display().to_string())?;
    info!(
        "write_citizen_file: {} rows written to {}",
        rows.len(),
        path.display()
    );
    Ok(())
}

fn write_interaction_rows<W: Write>(
    mut wtr: csv::Writer<W>,
    rows: &[CitizenOfficerInteraction],
    agency: &str,
    path: &str,
) -> PipelineResult<()> {
    for r in rows.iter() {
        wtr.serialize(InteractionOutputRow::from_record(r, agency))
            .context(CsvWriteSnafu {
                path: path.to_string(),
            })?;
    }
    finish(wtr, path)
}

pub fn write_interaction_file(
    path: &Path,
    rows: &[CitizenOfficerInteraction],
    agency: &str,
) -> PipelineResult<()> {
    let wtr = writer_for(path)?;
    write_interaction_rows(wtr, rows, agency, &path.display().to_string())?;
    info!(
        "write_interaction_file: {} rows written to {}",
        rows.len(),
        path.display()
    );
    Ok(())
}

fn write_population_rows<W: Write>(
    mut wtr: csv::Writer<W>,
    rows: &[CoveragePopulation],
    path: &str,
) -> PipelineResult<()> {
    for r in rows.iter() {
        let get = |race: RaceCategory| r.by_race.get(&race).cloned().unwrap_or(0);
        wtr.serialize(PopulationOutputRow {
            troop: &r.troop,
            black_16plus: get(RaceCategory::Black),
            white_16plus: get(RaceCategory::White),
            hispanic_16plus: get(RaceCategory::Hispanic),
            native_american_16plus: get(RaceCategory::NativeAmerican),
            asian_pacific_islander_16plus: get(RaceCategory::AsianPacificIslander),
            total_16plus: r.total,
        })
        .context(CsvWriteSnafu {
            path: path.to_string(),
        })?;
    }
    finish(wtr, path)
}

pub fn write_population_file(path: &Path, rows: &[CoveragePopulation]) -> PipelineResult<()> {
    let wtr = writer_for(path)?;
    write_population_rows(wtr, rows, &path.display().to_string())
}

fn write_disparity_rows<W: Write>(
    mut wtr: csv::Writer<W>,
    scopes: &[ScopedDisparity],
    path: &str,
) -> PipelineResult<()> {
    for sd in scopes.iter() {
        for m in sd.metrics.iter() {
            wtr.serialize(DisparityOutputRow {
                scope: &sd.scope,
                race: m.race.label(),
                incident_count: m.incident_count,
                incident_share_pct: fmt_pct(m.incident_share_pct),
                population_share_pct: fmt_pct(m.population_share_pct),
                disparity_ratio: fmt_ratio(m.ratio),
            })
            .context(CsvWriteSnafu {
                path: path.to_string(),
            })?;
        }
    }
    finish(wtr, path)
}

pub fn write_disparity_file(path: &Path, scopes: &[ScopedDisparity]) -> PipelineResult<()> {
    let wtr = writer_for(path)?;
    write_disparity_rows(wtr, scopes, &path.display().to_string())
}
