// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

/// One denormalized source event, as found in the raw incident table.
///
/// The per-person attributes (names, races, force descriptors) are packed as
/// delimited text and may disagree with the declared counts. Reconciling that
/// disagreement is the job of the expansion engine, not of this structure.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct IncidentRecord {
    /// Opaque report number. Natural key of the incident.
    pub ren: String,
    /// Raw event date as found in the source. Parsed during expansion.
    pub event_date: String,
    /// Base-region label of the reporting unit ("Troop A", ...).
    pub troop: String,
    /// Declared number of citizens involved. Authoritative over the token lists.
    pub citizen_count: u32,
    /// Declared number of officers involved.
    pub officer_count: u32,
    /// Delimited citizen names, in positional order.
    pub citizen_names: Option<String>,
    /// Delimited citizen races, in positional order.
    pub citizen_races: Option<String>,
    /// Delimited force-used-by-citizen descriptors.
    pub citizen_force: Option<String>,
    pub officer_names: Option<String>,
    pub officer_races: Option<String>,
    /// Incident-level descriptor of the force used by officers.
    pub officer_force: Option<String>,
    pub uses_of_force_count: Option<u32>,
    /// Justification flag, verbatim ("Y", "N", ...).
    pub justified: Option<String>,
}

// ******** Race categories *********

/// Closed set of race categories used for counting and for the census baseline.
///
/// The source data spells these out as free text; `from_label` accepts the
/// variants observed in the data. `Unknown` is reserved for rows without a
/// usable race value: it participates in incident totals but has no census
/// population, so it never receives a disparity ratio.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum RaceCategory {
    Black,
    White,
    Hispanic,
    NativeAmerican,
    AsianPacificIslander,
    Unknown,
}

impl RaceCategory {
    /// All categories, in the order used for reports and output tables.
    pub const ALL: [RaceCategory; 6] = [
        RaceCategory::Black,
        RaceCategory::White,
        RaceCategory::Hispanic,
        RaceCategory::AsianPacificIslander,
        RaceCategory::NativeAmerican,
        RaceCategory::Unknown,
    ];

    /// The categories carrying a census population baseline (everything
    /// except `Unknown`).
    pub const WITH_POPULATION: [RaceCategory; 5] = [
        RaceCategory::Black,
        RaceCategory::White,
        RaceCategory::Hispanic,
        RaceCategory::AsianPacificIslander,
        RaceCategory::NativeAmerican,
    ];

    /// Canonical snake_case label, used for configuration keys and file columns.
    pub fn label(&self) -> &'static str {
        match self {
            RaceCategory::Black => "black",
            RaceCategory::White => "white",
            RaceCategory::Hispanic => "hispanic",
            RaceCategory::NativeAmerican => "native_american",
            RaceCategory::AsianPacificIslander => "asian_pacific_islander",
            RaceCategory::Unknown => "unknown",
        }
    }

    /// Human-readable label for reports.
    pub fn display_label(&self) -> &'static str {
        match self {
            RaceCategory::Black => "Black",
            RaceCategory::White => "White",
            RaceCategory::Hispanic => "Hispanic",
            RaceCategory::NativeAmerican => "Native American",
            RaceCategory::AsianPacificIslander => "Asian / Pacific Islander",
            RaceCategory::Unknown => "Unknown",
        }
    }

    /// Maps a free-text race value to its category. Case-insensitive.
    /// Anything unrecognized (or absent) falls into `Unknown`.
    pub fn from_label(label: Option<&str>) -> RaceCategory {
        let l = match label {
            Some(s) if !s.trim().is_empty() => s.trim().to_lowercase(),
            _ => return RaceCategory::Unknown,
        };
        match l.as_str() {
            "black" => RaceCategory::Black,
            "white" => RaceCategory::White,
            "hispanic" => RaceCategory::Hispanic,
            "native american" | "american indian or alaska native" => RaceCategory::NativeAmerican,
            "asian"
            | "pacific islander"
            | "asian / pacific islander"
            | "asian/pacific islander"
            | "native hawaiian or other pacific islander" => RaceCategory::AsianPacificIslander,
            _ => RaceCategory::Unknown,
        }
    }
}

// ******** Expanded (output) data structures *********

/// One citizen within one incident, after expansion.
///
/// Invariant: the number of `CitizenRecord`s sharing a `ren` equals that
/// incident's declared citizen count, whatever the source token lists held.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CitizenRecord {
    pub ren: String,
    /// Digest of the natural key. Stable across both expansion modes.
    pub tracking_id: String,
    /// ISO representation of the parsed event date.
    pub incident_date: String,
    pub incident_year: i32,
    pub incident_month: u32,
    pub incident_day: u32,
    /// Canonical coverage-area label ("Troop NOLA", never the "Troop N" alias).
    pub troop: String,
    /// Normalized lowercase form of the troop label.
    pub department_desc: String,
    /// 1-based position of this citizen within the incident.
    pub citizen_index: u32,
    pub citizen_name: String,
    /// Normalized lowercase race, absent when the source had none.
    pub citizen_race: Option<String>,
    pub force_by_citizen: Option<String>,
    pub citizen_uid: String,
    pub citizen_count: u32,
    pub officer_count: u32,
    pub uses_of_force_count: Option<u32>,
    // Raw unexpanded lists, kept for audit.
    pub all_citizen_names: Option<String>,
    pub all_citizen_races: Option<String>,
    // Officer-side incident fields, shared by all citizens of the incident.
    pub officer_force: Option<String>,
    pub officer_names_raw: Option<String>,
    pub officer_races_raw: Option<String>,
    pub justified: Option<String>,
}

/// One officer within one incident. Only materialized by the citizen-officer
/// expansion.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct OfficerRecord {
    /// 1-based position of this officer within the incident.
    pub officer_index: u32,
    pub officer_name: String,
    pub officer_race: Option<String>,
    pub officer_uid: String,
}

/// One ordered (citizen, officer) pair within an incident.
///
/// Invariant: an incident with declared counts (n, m) yields exactly n×m of
/// these, the full cartesian product. No pair is filtered out.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CitizenOfficerInteraction {
    pub ren: String,
    pub tracking_id: String,
    /// Digest unique to the (citizen position, officer position) pair.
    pub interaction_uid: String,
    pub incident_date: String,
    pub incident_year: i32,
    pub incident_month: u32,
    pub incident_day: u32,
    pub troop: String,
    pub department_desc: String,
    pub citizen_index: u32,
    pub citizen_name: String,
    pub citizen_race: Option<String>,
    pub force_by_citizen: Option<String>,
    pub citizen_uid: String,
    pub officer: OfficerRecord,
    pub citizen_count: u32,
    pub officer_count: u32,
    pub uses_of_force_count: Option<u32>,
    pub officer_force: Option<String>,
    pub justified: Option<String>,
}

// ******** Geographic configuration *********

/// Membership of one base region (parish) in a coverage area.
#[derive(PartialEq, Debug, Clone)]
pub struct CoverageMember {
    pub parish: String,
    /// 1.0 for full membership, 0.5 when the parish population is split
    /// between two coverage areas.
    pub weight: f64,
}

/// A target administrative region (troop), defined by its member parishes.
#[derive(PartialEq, Debug, Clone)]
pub struct CoverageArea {
    pub troop: String,
    pub members: Vec<CoverageMember>,
}

/// Population counts for one base region, by race category.
/// Computed once from census-style input; never mutated afterwards.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ParishPopulation {
    pub parish: String,
    pub by_race: std::collections::BTreeMap<RaceCategory, u64>,
}

/// Apportioned population counts for one coverage area.
///
/// `total` is the sum of the race-category parts, not an independent census
/// figure, so sum-of-parts == total holds by construction.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CoveragePopulation {
    pub troop: String,
    pub by_race: std::collections::BTreeMap<RaceCategory, u64>,
    pub total: u64,
}

// ******** Disparity output *********

/// Disparity figures for one race category within one scope (the overall
/// dataset or a single coverage area).
#[derive(PartialEq, Debug, Clone)]
pub struct DisparityMetric {
    pub race: RaceCategory,
    pub incident_count: u64,
    /// Share of incidents, in percent. Unrounded.
    pub incident_share_pct: f64,
    /// Share of the population baseline, in percent. Unrounded.
    pub population_share_pct: f64,
    /// incident share / population share. `None` when the population share
    /// is zero or the category is `Unknown`: the ratio is not applicable,
    /// never zero or infinity.
    pub ratio: Option<f64>,
}

// ******** Errors *********

/// Errors that prevent the engines from completing.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum AnalyticsErrors {
    /// The event date of an incident could not be parsed. Fatal: no partial
    /// output is produced for the batch.
    InvalidDate { ren: String, value: String },
    /// A parish with full membership is listed in more than one coverage area.
    DuplicateParish { parish: String },
    /// The split weights of a parish do not sum to 1.0 across coverage areas.
    UnbalancedSplit { parish: String },
}

impl Error for AnalyticsErrors {}

impl Display for AnalyticsErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalyticsErrors::InvalidDate { ren, value } => {
                write!(f, "incident {}: unparseable event date {:?}", ren, value)
            }
            AnalyticsErrors::DuplicateParish { parish } => write!(
                f,
                "parish {} is fully assigned to multiple coverage areas",
                parish
            ),
            AnalyticsErrors::UnbalancedSplit { parish } => {
                write!(f, "split weights for parish {} do not sum to 1.0", parish)
            }
        }
    }
}

/// Checks the coverage-table invariants: a full-membership parish belongs to
/// exactly one area, and the weights of a split parish sum to 1.0 across the
/// areas that list it.
pub fn validate_coverage(areas: &[CoverageArea]) -> Result<(), AnalyticsErrors> {
    use std::collections::HashMap;
    let mut weights: HashMap<&str, f64> = HashMap::new();
    let mut full: HashMap<&str, u32> = HashMap::new();
    for area in areas.iter() {
        for m in area.members.iter() {
            *weights.entry(m.parish.as_str()).or_insert(0.0) += m.weight;
            if (m.weight - 1.0).abs() < f64::EPSILON {
                *full.entry(m.parish.as_str()).or_insert(0) += 1;
            }
        }
    }
    for (parish, n) in full.iter() {
        if *n > 1 {
            return Err(AnalyticsErrors::DuplicateParish {
                parish: parish.to_string(),
            });
        }
    }
    for (parish, w) in weights.iter() {
        if (w - 1.0).abs() > 1e-9 {
            return Err(AnalyticsErrors::UnbalancedSplit {
                parish: parish.to_string(),
            });
        }
    }
    Ok(())
}
