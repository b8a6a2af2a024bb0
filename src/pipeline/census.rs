//! Population retrieval behind a provider abstraction.
//!
//! Only a file-backed provider is implemented. The trait keeps retrieval
//! separate from aggregation so that a network-based provider can be added
//! without touching the rest of the pipeline.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use log::{debug, info, warn};
use serde::Deserialize;
use snafu::prelude::*;
use uof_analytics::{ParishPopulation, RaceCategory};

use crate::pipeline::config_reader::{CensusSource, RunTables};
use crate::pipeline::{
    resolve_path, OpeningPopulationSnafu, ParsingJsonSnafu, PipelineResult, ProviderFailureSnafu,
    UnsupportedProviderSnafu,
};

/// One retrieval request: a set of census variables for one race category
/// over a set of base regions. Mirrors the one-call-per-race shape imposed by
/// the upstream census API variable limit.
#[derive(Debug, Clone)]
pub struct PopulationRequest {
    pub dataset_year: String,
    pub parishes: Vec<String>,
    pub race: RaceCategory,
    pub variables: Vec<String>,
}

/// One raw count, as returned by a provider. Not yet summed per category.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ParishVariableCount {
    pub parish: String,
    pub variable: String,
    pub count: u64,
}

pub trait PopulationSource {
    fn fetch(&self, request: &PopulationRequest) -> PipelineResult<Vec<ParishVariableCount>>;
}

// **** File-backed provider ****

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
struct PopulationEnvelope {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[allow(dead_code)]
    dataset_year: Option<String>,
    #[serde(default)]
    parishes: BTreeMap<String, BTreeMap<String, u64>>,
}

/// A provider backed by a local JSON snapshot of per-parish, per-variable
/// counts, wrapped in a status envelope.
pub struct FilePopulationSource {
    parishes: BTreeMap<String, BTreeMap<String, u64>>,
}

impl FilePopulationSource {
    pub fn from_path(path: &str) -> PipelineResult<FilePopulationSource> {
        let contents = fs::read_to_string(path).context(OpeningPopulationSnafu {
            path: path.to_string(),
        })?;
        Self::from_str(contents.as_str())
    }

    pub fn from_str(contents: &str) -> PipelineResult<FilePopulationSource> {
        let envelope: PopulationEnvelope =
            serde_json::from_str(contents).context(ParsingJsonSnafu {})?;
        // Any non-ok status is fatal: a partial snapshot must not silently
        // zero out population baselines.
        ensure!(
            envelope.status == "ok",
            ProviderFailureSnafu {
                status: envelope.status.clone(),
                message: envelope.message.clone().unwrap_or_default(),
            }
        );
        Ok(FilePopulationSource {
            parishes: envelope.parishes,
        })
    }
}

impl PopulationSource for FilePopulationSource {
    fn fetch(&self, request: &PopulationRequest) -> PipelineResult<Vec<ParishVariableCount>> {
        debug!(
            "fetch: {} for dataset year {} over {} parishes",
            request.race.label(),
            request.dataset_year,
            request.parishes.len()
        );
        let mut res: Vec<ParishVariableCount> = Vec::new();
        for parish in request.parishes.iter() {
            let counts = match self.parishes.get(parish) {
                Some(c) => c,
                None => {
                    warn!("fetch: no snapshot data for parish {}", parish);
                    continue;
                }
            };
            for variable in request.variables.iter() {
                // Variables absent from the snapshot count as zero.
                let count = counts.get(variable).cloned().unwrap_or(0);
                res.push(ParishVariableCount {
                    parish: parish.clone(),
                    variable: variable.clone(),
                    count,
                });
            }
        }
        Ok(res)
    }
}

pub fn make_source(
    source: &CensusSource,
    root_p: &Path,
) -> PipelineResult<Box<dyn PopulationSource>> {
    match source.provider.as_str() {
        "file" => {
            let path = resolve_path(root_p, &source.file_path);
            Ok(Box::new(FilePopulationSource::from_path(&path)?))
        }
        other => UnsupportedProviderSnafu {
            provider: other.to_string(),
        }
        .fail(),
    }
}

/// Fetches every configured race category and folds the raw variable counts
/// into per-parish populations. One request per race category.
pub fn load_parish_populations(
    source: &dyn PopulationSource,
    tables: &RunTables,
) -> PipelineResult<Vec<ParishPopulation>> {
    let mut parish_set: BTreeSet<String> = BTreeSet::new();
    for area in tables.coverage.iter() {
        for m in area.members.iter() {
            parish_set.insert(m.parish.clone());
        }
    }
    let parishes: Vec<String> = parish_set.into_iter().collect();

    let mut by_parish: BTreeMap<String, BTreeMap<RaceCategory, u64>> = BTreeMap::new();
    for p in parishes.iter() {
        by_parish.insert(p.clone(), BTreeMap::new());
    }
    for (race, variables) in tables.census_variables.iter() {
        let request = PopulationRequest {
            dataset_year: tables.dataset_year.clone(),
            parishes: parishes.clone(),
            race: *race,
            variables: variables.clone(),
        };
        info!(
            "load_parish_populations: fetching {} variables for {}",
            variables.len(),
            race.label()
        );
        let counts = source.fetch(&request)?;
        for c in counts.iter() {
            if let Some(races) = by_parish.get_mut(&c.parish) {
                *races.entry(*race).or_insert(0) += c.count;
            }
        }
    }

    Ok(by_parish
        .into_iter()
        .map(|(parish, by_race)| ParishPopulation { parish, by_race })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::config_reader::{validate_config, PipelineConfig};
    use crate::pipeline::PipelineError;

    fn tables() -> RunTables {
        let config: PipelineConfig = serde_json::from_str(
            r#"{
            "outputSettings": { "datasetName": "t" },
            "incidentFileSources": [ { "filePath": "uof.csv" } ],
            "censusSource": {
                "provider": "file",
                "filePath": "population.json",
                "datasetYear": "2022"
            },
            "coverageAreas": [
                {"troop": "Troop NOLA", "parishes": [{"name": "Orleans"}]}
            ],
            "censusVariables": {
                "black": ["B01001B_007E", "B01001B_008E"],
                "white": ["B01001H_007E"]
            }
        }"#,
        )
        .unwrap();
        validate_config(&config).unwrap()
    }

    #[test]
    fn ok_snapshot_sums_variables_per_category() {
        let source = FilePopulationSource::from_str(
            r#"{
            "status": "ok",
            "datasetYear": "2022",
            "parishes": {
                "Orleans": {
                    "B01001B_007E": 100,
                    "B01001B_008E": 50,
                    "B01001H_007E": 300
                }
            }
        }"#,
        )
        .unwrap();
        let pops = load_parish_populations(&source, &tables()).unwrap();
        assert_eq!(pops.len(), 1);
        assert_eq!(pops[0].parish, "Orleans");
        assert_eq!(pops[0].by_race[&RaceCategory::Black], 150);
        assert_eq!(pops[0].by_race[&RaceCategory::White], 300);
    }

    #[test]
    fn missing_variables_count_as_zero() {
        let source = FilePopulationSource::from_str(
            r#"{
            "status": "ok",
            "parishes": { "Orleans": { "B01001B_007E": 7 } }
        }"#,
        )
        .unwrap();
        let pops = load_parish_populations(&source, &tables()).unwrap();
        assert_eq!(pops[0].by_race[&RaceCategory::Black], 7);
        assert_eq!(pops[0].by_race[&RaceCategory::White], 0);
    }

    #[test]
    fn missing_parish_yields_an_empty_population() {
        let source = FilePopulationSource::from_str(
            r#"{ "status": "ok", "parishes": { "Jefferson": { "B01001B_007E": 7 } } }"#,
        )
        .unwrap();
        let pops = load_parish_populations(&source, &tables()).unwrap();
        assert_eq!(pops.len(), 1);
        assert_eq!(pops[0].parish, "Orleans");
        assert!(pops[0].by_race.is_empty());
    }

    #[test]
    fn failed_status_is_fatal() {
        let res = FilePopulationSource::from_str(
            r#"{ "status": "error", "message": "quota exceeded" }"#,
        );
        match res {
            Err(PipelineError::ProviderFailure { status, message }) => {
                assert_eq!(status, "error");
                assert_eq!(message, "quota exceeded");
            }
            _ => panic!("expected a provider failure"),
        }
    }

    #[test]
    fn unsupported_provider_is_rejected() {
        let source = CensusSource {
            provider: "census-api".to_string(),
            file_path: "unused.json".to_string(),
            dataset_year: "2022".to_string(),
        };
        let res = make_source(&source, Path::new("."));
        assert!(matches!(
            res,
            Err(PipelineError::UnsupportedProvider { .. })
        ));
    }
}
