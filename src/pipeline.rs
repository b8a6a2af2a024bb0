use log::{info, warn};

use snafu::{prelude::*, Snafu};
use uof_analytics::*;

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::pipeline::config_reader::*;

pub mod census;
pub mod config_reader;
pub mod io_csv;

#[derive(Debug, Snafu)]
pub enum PipelineError {
    #[snafu(display("Error opening configuration file {path}"))]
    OpeningConfig {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Error opening csv file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error decoding csv row {lineno}"))]
    CsvDecode { source: csv::Error, lineno: usize },
    #[snafu(display("Error writing csv file {path}"))]
    CsvWrite { source: csv::Error, path: String },
    #[snafu(display("Error writing output file {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error opening population file {path}"))]
    OpeningPopulation {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Population source failure (status {status}): {message}"))]
    ProviderFailure { status: String, message: String },
    #[snafu(display("Census provider {provider} is not supported"))]
    UnsupportedProvider { provider: String },
    #[snafu(display("Unknown race category label {label:?} in configuration"))]
    UnknownRaceLabel { label: String },
    #[snafu(display("Invalid coverage-area table"))]
    InvalidCoverage { source: AnalyticsErrors },
    #[snafu(display("Incident expansion failed"))]
    Expansion { source: AnalyticsErrors },
    #[snafu(display("Missing parent directory for {path}"))]
    MissingParentDir { path: String },
    #[snafu(display("Calculated summary differs from the reference summary"))]
    ReferenceMismatch {},

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type PipelineResult<T> = Result<T, PipelineError>;

fn resolve_path(root: &Path, path: &str) -> String {
    let p = Path::new(path);
    if p.is_absolute() {
        path.to_string()
    } else {
        let joined: PathBuf = root.join(p);
        joined.as_path().display().to_string()
    }
}

// One decimal place for percentage display. The underlying ratio computation
// uses the unrounded shares.
fn fmt_pct(pct: f64) -> String {
    format!("{:.1}", pct)
}

fn fmt_ratio(ratio: Option<f64>) -> String {
    match ratio {
        Some(r) => format!("{:.2}", r),
        None => "N/A".to_string(),
    }
}

// Troop labels found in the incident data that no coverage area accounts
// for. Rows under these labels still count in the overall scope but in no
// per-troop scope.
fn uncovered_troops(
    by_troop: &BTreeMap<String, BTreeMap<RaceCategory, u64>>,
    coverage_pop: &[CoveragePopulation],
) -> Vec<String> {
    let covered: HashSet<String> = coverage_pop
        .iter()
        .map(|cp| cp.troop.to_lowercase())
        .collect();
    by_troop
        .keys()
        .filter(|t| !covered.contains(t.as_str()))
        .cloned()
        .collect()
}

/// Disparity metrics for one scope: the whole dataset or one coverage area.
pub struct ScopedDisparity {
    pub scope: String,
    pub metrics: Vec<DisparityMetric>,
}

fn disparity_to_json(scopes: &[ScopedDisparity]) -> Vec<JSValue> {
    let mut l: Vec<JSValue> = Vec::new();
    for sd in scopes.iter() {
        let total_incidents: u64 = sd.metrics.iter().map(|m| m.incident_count).sum();
        let mut metrics: Vec<JSValue> = Vec::new();
        for m in sd.metrics.iter() {
            metrics.push(json!({
                "race": m.race.label(),
                "incidentCount": m.incident_count.to_string(),
                "incidentSharePct": fmt_pct(m.incident_share_pct),
                "populationSharePct": fmt_pct(m.population_share_pct),
                "disparityRatio": fmt_ratio(m.ratio),
            }));
        }
        l.push(json!({
            "scope": sd.scope,
            "totalIncidents": total_incidents.to_string(),
            "metrics": metrics,
        }));
    }
    l
}

fn build_summary_js(tables: &RunTables, scopes: &[ScopedDisparity]) -> JSValue {
    json!({
        "config": {
            "dataset": tables.dataset_name,
            "agency": tables.agency,
            "censusYear": tables.dataset_year,
        },
        "results": disparity_to_json(scopes),
    })
}

fn read_summary(path: String) -> PipelineResult<JSValue> {
    let contents = fs::read_to_string(path.clone())
        .context(OpeningConfigSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

/// Runs the whole pipeline: expansion, apportionment, disparity, outputs.
///
/// All the outputs are deterministic functions of the inputs: re-running on
/// identical input produces byte-identical files.
pub fn run_pipeline(args: &Args) -> PipelineResult<()> {
    let config_p = Path::new(args.config.as_str());
    let config_str = fs::read_to_string(args.config.clone()).context(OpeningConfigSnafu {
        path: args.config.clone(),
    })?;
    let config: PipelineConfig =
        serde_json::from_str(&config_str).context(ParsingJsonSnafu {})?;
    info!("config: {:?}", config);

    let tables = validate_config(&config)?;

    let root_p = config_p.parent().context(MissingParentDirSnafu {
        path: args.config.clone(),
    })?;

    let out_dir = match (args.out_dir.clone(), tables.output_directory.clone()) {
        (Some(d), _) => d,
        (None, Some(d)) => resolve_path(root_p, &d),
        (None, None) => ".".to_string(),
    };
    fs::create_dir_all(&out_dir).context(WritingOutputSnafu {
        path: out_dir.clone(),
    })?;
    let out_p = Path::new(out_dir.as_str());

    // Load the raw incident table, one file source at a time.
    let mut builder = builder::Builder::new();
    for src in config.incident_file_sources.iter() {
        let p = resolve_path(root_p, &src.file_path);
        info!("Attempting to read incident file {:?}", p);
        io_csv::read_incident_file(&p, &mut builder)?;
    }
    info!("run_pipeline: {} incidents loaded", builder.incidents().len());

    // Expansion. A malformed date in any incident aborts the run here.
    let citizen_rows = builder.expand_citizens().context(ExpansionSnafu {})?;
    let interactions = builder.expand_interactions().context(ExpansionSnafu {})?;

    let citizen_path = out_p.join(format!("uof_cit_{}.csv", tables.dataset_name));
    io_csv::write_citizen_file(&citizen_path, &citizen_rows, &tables.agency)?;
    let interaction_path = out_p.join(format!("uof_cit_officer_{}.csv", tables.dataset_name));
    io_csv::write_interaction_file(&interaction_path, &interactions, &tables.agency)?;

    // Population: fetch through the provider, then apportion onto the
    // coverage areas.
    let source = census::make_source(&config.census_source, root_p)?;
    let parishes = census::load_parish_populations(source.as_ref(), &tables)?;
    let coverage_pop = apportion_population(&parishes, &tables.coverage);
    let population_path = out_p.join(format!("coverage_population_{}.csv", tables.dataset_name));
    io_csv::write_population_file(&population_path, &coverage_pop)?;

    // Disparity: overall scope first, then one scope per coverage area.
    let mut scopes: Vec<ScopedDisparity> = Vec::new();
    let overall_counts = count_by_race(&citizen_rows);
    let mut overall_pop: BTreeMap<RaceCategory, u64> = BTreeMap::new();
    for cp in coverage_pop.iter() {
        for (race, count) in cp.by_race.iter() {
            *overall_pop.entry(*race).or_insert(0) += count;
        }
    }
    scopes.push(ScopedDisparity {
        scope: "overall".to_string(),
        metrics: compute_disparity(&overall_counts, &overall_pop),
    });

    let by_troop = count_by_troop_and_race(&citizen_rows);
    for troop in uncovered_troops(&by_troop, &coverage_pop) {
        warn!(
            "run_pipeline: troop {} appears in the incident data but no coverage area is configured for it",
            troop
        );
    }
    for cp in coverage_pop.iter() {
        let key = cp.troop.to_lowercase();
        let counts = by_troop.get(&key).cloned().unwrap_or_default();
        if counts.is_empty() {
            info!("run_pipeline: no incidents recorded for {}", cp.troop);
        }
        scopes.push(ScopedDisparity {
            scope: cp.troop.clone(),
            metrics: compute_disparity(&counts, &cp.by_race),
        });
    }
    let disparity_path = out_p.join(format!("disparity_{}.csv", tables.dataset_name));
    io_csv::write_disparity_file(&disparity_path, &scopes)?;

    // Assemble the final json summary.
    let summary_js = build_summary_js(&tables, &scopes);
    let pretty_js = serde_json::to_string_pretty(&summary_js).context(ParsingJsonSnafu {})?;
    let summary_path = out_p.join(format!("summary_{}.json", tables.dataset_name));
    fs::write(&summary_path, &pretty_js).context(WritingOutputSnafu {
        path: summary_path.as_path().display().to_string(),
    })?;
    info!(
        "run_pipeline: summary written to {}",
        summary_path.as_path().display()
    );

    // The reference summary, if provided for comparison.
    if let Some(reference_p) = args.reference.clone() {
        let summary_ref = read_summary(reference_p)?;
        let pretty_js_ref =
            serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
        if pretty_js_ref != pretty_js {
            warn!("Found differences with the reference summary");
            print_diff(pretty_js_ref.as_str(), pretty_js.as_str(), "\n");
            return ReferenceMismatchSnafu {}.fail();
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentages_are_displayed_with_one_decimal() {
        assert_eq!(fmt_pct(14.2857), "14.3");
        assert_eq!(fmt_pct(0.0), "0.0");
        assert_eq!(fmt_pct(100.0), "100.0");
    }

    #[test]
    fn undefined_ratios_are_displayed_as_not_applicable() {
        assert_eq!(fmt_ratio(Some(2.0)), "2.00");
        assert_eq!(fmt_ratio(Some(0.3333333)), "0.33");
        assert_eq!(fmt_ratio(None), "N/A");
    }

    #[test]
    fn troops_outside_the_coverage_table_are_reported() {
        let mut by_troop: BTreeMap<String, BTreeMap<RaceCategory, u64>> = BTreeMap::new();
        for label in ["troop a", "troop x", "troop z"] {
            let mut counts = BTreeMap::new();
            counts.insert(RaceCategory::Black, 1u64);
            by_troop.insert(label.to_string(), counts);
        }
        let coverage_pop = vec![CoveragePopulation {
            troop: "Troop A".to_string(),
            by_race: BTreeMap::new(),
            total: 0,
        }];
        assert_eq!(
            uncovered_troops(&by_troop, &coverage_pop),
            vec!["troop x".to_string(), "troop z".to_string()]
        );
        // Nothing reported when every label is covered.
        by_troop.remove("troop x");
        by_troop.remove("troop z");
        assert!(uncovered_troops(&by_troop, &coverage_pop).is_empty());
    }

    #[test]
    fn summary_json_is_deterministic() {
        let scopes = vec![ScopedDisparity {
            scope: "overall".to_string(),
            metrics: vec![DisparityMetric {
                race: RaceCategory::Black,
                incident_count: 20,
                incident_share_pct: 20.0,
                population_share_pct: 10.0,
                ratio: Some(2.0),
            }],
        }];
        let a = serde_json::to_string_pretty(&disparity_to_json(&scopes)).unwrap();
        let b = serde_json::to_string_pretty(&disparity_to_json(&scopes)).unwrap();
        assert_eq!(a, b);
        assert!(a.contains("\"disparityRatio\": \"2.00\""));
    }
}
