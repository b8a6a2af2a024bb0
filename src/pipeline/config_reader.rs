//! JSON run-configuration structures and their conversion to the validated
//! tables consumed by the pipeline.

use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use uof_analytics::{validate_coverage, CoverageArea, CoverageMember, RaceCategory};

use crate::pipeline::{
    InvalidCoverageSnafu, PipelineResult, UnknownRaceLabelSnafu,
};

const DEFAULT_AGENCY: &str = "louisiana-state-pd";

// **** JSON structures, as they appear in the configuration file ****

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PipelineConfig {
    pub output_settings: OutputSettings,
    pub incident_file_sources: Vec<IncidentFileSource>,
    pub census_source: CensusSource,
    pub coverage_areas: Option<Vec<CoverageAreaConfig>>,
    pub census_variables: Option<BTreeMap<String, Vec<String>>>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct OutputSettings {
    pub dataset_name: String,
    pub output_directory: Option<String>,
    pub agency: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct IncidentFileSource {
    pub file_path: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CensusSource {
    pub provider: String,
    pub file_path: String,
    pub dataset_year: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CoverageAreaConfig {
    pub troop: String,
    pub parishes: Vec<ParishMemberConfig>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ParishMemberConfig {
    pub name: String,
    #[serde(default)]
    pub split: bool,
}

// **** Validated run tables ****

/// The configuration after validation, with every default filled in.
#[derive(Debug, Clone)]
pub struct RunTables {
    pub dataset_name: String,
    pub output_directory: Option<String>,
    pub agency: String,
    pub dataset_year: String,
    pub coverage: Vec<CoverageArea>,
    /// Census variables summed per race category.
    pub census_variables: BTreeMap<RaceCategory, Vec<String>>,
}

fn area(troop: &str, parishes: &[(&str, f64)]) -> CoverageArea {
    CoverageArea {
        troop: troop.to_string(),
        members: parishes
            .iter()
            .map(|(parish, weight)| CoverageMember {
                parish: parish.to_string(),
                weight: *weight,
            })
            .collect(),
    }
}

/// The built-in Louisiana State Police coverage table. St. James and
/// St. John the Baptist populations are split 50/50 between two troops each.
pub fn default_coverage_areas() -> Vec<CoverageArea> {
    vec![
        area(
            "Troop A",
            &[
                ("Ascension", 1.0),
                ("East Baton Rouge", 1.0),
                ("East Feliciana", 1.0),
                ("Iberville", 1.0),
                ("Livingston", 1.0),
                ("Pointe Coupee", 1.0),
                ("West Baton Rouge", 1.0),
                ("West Feliciana", 1.0),
                ("St. James", 0.5),
            ],
        ),
        area(
            "Troop B",
            &[
                ("St. Charles", 1.0),
                ("Plaquemines", 1.0),
                ("St. Bernard", 1.0),
                ("Jefferson", 1.0),
                ("St. John the Baptist", 0.5),
            ],
        ),
        area(
            "Troop C",
            &[
                ("Assumption", 1.0),
                ("Lafourche", 1.0),
                ("Terrebonne", 1.0),
                ("St. James", 0.5),
                ("St. John the Baptist", 0.5),
            ],
        ),
        area(
            "Troop D",
            &[
                ("Allen", 1.0),
                ("Beauregard", 1.0),
                ("Calcasieu", 1.0),
                ("Cameron", 1.0),
                ("Jefferson Davis", 1.0),
            ],
        ),
        area(
            "Troop E",
            &[
                ("Avoyelles", 1.0),
                ("Catahoula", 1.0),
                ("Concordia", 1.0),
                ("Grant", 1.0),
                ("LaSalle", 1.0),
                ("Natchitoches", 1.0),
                ("Rapides", 1.0),
                ("Sabine", 1.0),
                ("Vernon", 1.0),
                ("Winn", 1.0),
            ],
        ),
        area(
            "Troop F",
            &[
                ("Union", 1.0),
                ("West Carroll", 1.0),
                ("East Carroll", 1.0),
                ("Morehouse", 1.0),
                ("Lincoln", 1.0),
                ("Ouachita", 1.0),
                ("Richland", 1.0),
                ("Madison", 1.0),
                ("Jackson", 1.0),
                ("Caldwell", 1.0),
                ("Tensas", 1.0),
                ("Franklin", 1.0),
            ],
        ),
        area(
            "Troop G",
            &[
                ("Caddo", 1.0),
                ("Bossier", 1.0),
                ("De Soto", 1.0),
                ("Webster", 1.0),
                ("Claiborne", 1.0),
                ("Bienville", 1.0),
                ("Red River", 1.0),
            ],
        ),
        area(
            "Troop I",
            &[
                ("Evangeline", 1.0),
                ("St. Landry", 1.0),
                ("Acadia", 1.0),
                ("Lafayette", 1.0),
                ("St. Martin", 1.0),
                ("Vermilion", 1.0),
                ("Iberia", 1.0),
                ("St. Mary", 1.0),
            ],
        ),
        area(
            "Troop L",
            &[
                ("St. Helena", 1.0),
                ("St. Tammany", 1.0),
                ("Tangipahoa", 1.0),
                ("Washington", 1.0),
            ],
        ),
        area("Troop NOLA", &[("Orleans", 1.0)]),
    ]
}

fn age_group_variables(race_code: char) -> Vec<String> {
    // B01001<code>_007E..016E are males 16+, _022E..031E are females 16+.
    (7..=16)
        .chain(22..=31)
        .map(|i| format!("B01001{}_{:03}E", race_code, i))
        .collect()
}

/// The built-in census variable table: B01001 race-specific age-group
/// variables for the population aged 16 and over. The Asian (D) and Pacific
/// Islander (E) tables are combined into one category.
pub fn default_census_variables() -> BTreeMap<RaceCategory, Vec<String>> {
    let mut m: BTreeMap<RaceCategory, Vec<String>> = BTreeMap::new();
    m.insert(RaceCategory::Black, age_group_variables('B'));
    m.insert(RaceCategory::White, age_group_variables('H'));
    m.insert(RaceCategory::Hispanic, age_group_variables('I'));
    m.insert(RaceCategory::NativeAmerican, age_group_variables('C'));
    let mut asian_pi = age_group_variables('D');
    asian_pi.extend(age_group_variables('E'));
    m.insert(RaceCategory::AsianPacificIslander, asian_pi);
    m
}

/// Checks the configuration and fills in every default.
pub fn validate_config(config: &PipelineConfig) -> PipelineResult<RunTables> {
    let coverage: Vec<CoverageArea> = match &config.coverage_areas {
        None => default_coverage_areas(),
        Some(areas) => areas
            .iter()
            .map(|a| CoverageArea {
                troop: a.troop.clone(),
                members: a
                    .parishes
                    .iter()
                    .map(|p| CoverageMember {
                        parish: p.name.clone(),
                        weight: if p.split { 0.5 } else { 1.0 },
                    })
                    .collect(),
            })
            .collect(),
    };
    validate_coverage(&coverage).context(InvalidCoverageSnafu {})?;

    let census_variables: BTreeMap<RaceCategory, Vec<String>> = match &config.census_variables {
        None => default_census_variables(),
        Some(vars) => {
            let mut m: BTreeMap<RaceCategory, Vec<String>> = BTreeMap::new();
            for (label, names) in vars.iter() {
                let race = RaceCategory::from_label(Some(label.as_str()));
                ensure!(
                    race != RaceCategory::Unknown && race.label() == label.as_str(),
                    UnknownRaceLabelSnafu {
                        label: label.clone()
                    }
                );
                m.insert(race, names.clone());
            }
            m
        }
    };
    debug!(
        "validate_config: {} coverage areas, {} race categories with variables",
        coverage.len(),
        census_variables.len()
    );

    Ok(RunTables {
        dataset_name: config.output_settings.dataset_name.clone(),
        output_directory: config.output_settings.output_directory.clone(),
        agency: config
            .output_settings
            .agency
            .clone()
            .unwrap_or_else(|| DEFAULT_AGENCY.to_string()),
        dataset_year: config.census_source.dataset_year.clone(),
        coverage,
        census_variables,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_config() -> PipelineConfig {
        serde_json::from_str(
            r#"{
            "outputSettings": { "datasetName": "lsp_uof_22_24" },
            "incidentFileSources": [ { "filePath": "uof.csv" } ],
            "censusSource": {
                "provider": "file",
                "filePath": "population.json",
                "datasetYear": "2022"
            }
        }"#,
        )
        .unwrap()
    }

    #[test]
    fn minimal_configuration_gets_all_defaults() {
        let tables = validate_config(&minimal_config()).unwrap();
        assert_eq!(tables.dataset_name, "lsp_uof_22_24");
        assert_eq!(tables.agency, "louisiana-state-pd");
        assert_eq!(tables.dataset_year, "2022");
        assert_eq!(tables.coverage.len(), 10);
        assert_eq!(tables.census_variables.len(), 5);
    }

    #[test]
    fn default_coverage_table_is_valid() {
        // Split parishes appear twice at weight 0.5; everything else once.
        assert!(validate_coverage(&default_coverage_areas()).is_ok());
    }

    #[test]
    fn split_parishes_carry_half_weight() {
        let areas = default_coverage_areas();
        let mut st_james: Vec<(String, f64)> = Vec::new();
        for a in areas.iter() {
            for m in a.members.iter() {
                if m.parish == "St. James" {
                    st_james.push((a.troop.clone(), m.weight));
                }
            }
        }
        assert_eq!(
            st_james,
            vec![("Troop A".to_string(), 0.5), ("Troop C".to_string(), 0.5)]
        );
    }

    #[test]
    fn default_variables_cover_both_sexes_16_plus() {
        let vars = default_census_variables();
        let black = &vars[&RaceCategory::Black];
        assert_eq!(black.len(), 20);
        assert_eq!(black[0], "B01001B_007E");
        assert_eq!(black[9], "B01001B_016E");
        assert_eq!(black[10], "B01001B_022E");
        assert_eq!(black[19], "B01001B_031E");
        // Asian and Pacific Islander tables are combined.
        let asian_pi = &vars[&RaceCategory::AsianPacificIslander];
        assert_eq!(asian_pi.len(), 40);
        assert!(asian_pi.iter().any(|v| v.starts_with("B01001D_")));
        assert!(asian_pi.iter().any(|v| v.starts_with("B01001E_")));
    }

    #[test]
    fn explicit_coverage_areas_replace_the_default_table() {
        let mut config = minimal_config();
        config.coverage_areas = Some(
            serde_json::from_str(
                r#"[
                {"troop": "Troop A", "parishes": [{"name": "Orleans"},
                                                  {"name": "Jefferson", "split": true}]},
                {"troop": "Troop B", "parishes": [{"name": "Jefferson", "split": true}]}
            ]"#,
            )
            .unwrap(),
        );
        let tables = validate_config(&config).unwrap();
        assert_eq!(tables.coverage.len(), 2);
        assert_eq!(tables.coverage[0].members[1].weight, 0.5);
    }

    #[test]
    fn unbalanced_split_is_rejected() {
        let mut config = minimal_config();
        config.coverage_areas = Some(
            serde_json::from_str(
                r#"[{"troop": "Troop A", "parishes": [{"name": "Jefferson", "split": true}]}]"#,
            )
            .unwrap(),
        );
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn unknown_race_label_in_variables_is_rejected() {
        let mut config = minimal_config();
        let mut vars: BTreeMap<String, Vec<String>> = BTreeMap::new();
        vars.insert("martian".to_string(), vec!["B01001X_007E".to_string()]);
        config.census_variables = Some(vars);
        assert!(validate_config(&config).is_err());
    }
}
