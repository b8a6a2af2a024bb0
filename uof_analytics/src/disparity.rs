//! Aggregation of expanded citizen rows and computation of
//! population-normalized disparity metrics.

use std::collections::BTreeMap;

use log::debug;

use crate::config::*;

/// Groups citizen rows by race category and folds with addition.
///
/// The result does not depend on the iteration order of the input.
pub fn count_by_race(rows: &[CitizenRecord]) -> BTreeMap<RaceCategory, u64> {
    let mut counts: BTreeMap<RaceCategory, u64> = BTreeMap::new();
    for row in rows.iter() {
        let race = RaceCategory::from_label(row.citizen_race.as_deref());
        *counts.entry(race).or_insert(0) += 1;
    }
    counts
}

/// Groups citizen rows by (normalized troop label, race category).
pub fn count_by_troop_and_race(
    rows: &[CitizenRecord],
) -> BTreeMap<String, BTreeMap<RaceCategory, u64>> {
    let mut counts: BTreeMap<String, BTreeMap<RaceCategory, u64>> = BTreeMap::new();
    for row in rows.iter() {
        let race = RaceCategory::from_label(row.citizen_race.as_deref());
        let per_troop = counts.entry(row.department_desc.clone()).or_default();
        *per_troop.entry(race).or_insert(0) += 1;
    }
    counts
}

/// Computes disparity metrics for one scope from aggregated incident counts
/// and an apportioned population baseline.
///
/// The incident total includes the `Unknown` category; the population total
/// covers only the categories with a census baseline. The ratio is defined
/// only where the population share is strictly positive, and never for
/// `Unknown`; everywhere else it is reported as not-applicable rather than
/// zero or infinity. Ratios are computed from unrounded shares.
pub fn compute_disparity(
    incident_counts: &BTreeMap<RaceCategory, u64>,
    population: &BTreeMap<RaceCategory, u64>,
) -> Vec<DisparityMetric> {
    let total_incidents: u64 = incident_counts.values().sum();
    let total_population: u64 = RaceCategory::WITH_POPULATION
        .iter()
        .map(|r| population.get(r).cloned().unwrap_or(0))
        .sum();
    debug!(
        "compute_disparity: {} incidents against population {}",
        total_incidents, total_population
    );

    let mut res: Vec<DisparityMetric> = Vec::new();
    for race in RaceCategory::ALL.iter() {
        let incident_count = incident_counts.get(race).cloned().unwrap_or(0);
        let incident_share_pct = if total_incidents > 0 {
            incident_count as f64 / total_incidents as f64 * 100.0
        } else {
            0.0
        };
        let population_count = if *race == RaceCategory::Unknown {
            0
        } else {
            population.get(race).cloned().unwrap_or(0)
        };
        let population_share_pct = if total_population > 0 {
            population_count as f64 / total_population as f64 * 100.0
        } else {
            0.0
        };
        let ratio = if *race != RaceCategory::Unknown && population_share_pct > 0.0 {
            Some(incident_share_pct / population_share_pct)
        } else {
            None
        };
        res.push(DisparityMetric {
            race: *race,
            incident_count,
            incident_share_pct,
            population_share_pct,
            ratio,
        });
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(pairs: &[(RaceCategory, u64)]) -> BTreeMap<RaceCategory, u64> {
        pairs.iter().cloned().collect()
    }

    fn metric(metrics: &[DisparityMetric], race: RaceCategory) -> DisparityMetric {
        metrics.iter().find(|m| m.race == race).unwrap().clone()
    }

    #[test]
    fn ratio_is_two_when_incident_share_doubles_population_share() {
        // Population share 10%, incident share 20% -> ratio 2.00x.
        let incidents = counts(&[(RaceCategory::Black, 20), (RaceCategory::White, 80)]);
        let population = counts(&[(RaceCategory::Black, 100), (RaceCategory::White, 900)]);
        let metrics = compute_disparity(&incidents, &population);
        let black = metric(&metrics, RaceCategory::Black);
        assert!((black.incident_share_pct - 20.0).abs() < 1e-9);
        assert!((black.population_share_pct - 10.0).abs() < 1e-9);
        assert!((black.ratio.unwrap() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn ratio_is_not_applicable_for_zero_population_share() {
        let incidents = counts(&[(RaceCategory::Hispanic, 5), (RaceCategory::White, 5)]);
        let population = counts(&[(RaceCategory::White, 100)]);
        let metrics = compute_disparity(&incidents, &population);
        let hispanic = metric(&metrics, RaceCategory::Hispanic);
        assert!(hispanic.incident_share_pct > 0.0);
        assert_eq!(hispanic.ratio, None);
    }

    #[test]
    fn unknown_counts_toward_totals_but_never_gets_a_ratio() {
        let incidents = counts(&[(RaceCategory::Black, 25), (RaceCategory::Unknown, 75)]);
        let population = counts(&[(RaceCategory::Black, 50), (RaceCategory::White, 50)]);
        let metrics = compute_disparity(&incidents, &population);
        let black = metric(&metrics, RaceCategory::Black);
        // Unknown dilutes the incident share: 25 out of 100, not 25 out of 25.
        assert!((black.incident_share_pct - 25.0).abs() < 1e-9);
        let unknown = metric(&metrics, RaceCategory::Unknown);
        assert!((unknown.incident_share_pct - 75.0).abs() < 1e-9);
        assert_eq!(unknown.population_share_pct, 0.0);
        assert_eq!(unknown.ratio, None);
    }

    #[test]
    fn zero_totals_yield_zero_shares_without_panicking() {
        let metrics = compute_disparity(&BTreeMap::new(), &BTreeMap::new());
        for m in metrics.iter() {
            assert_eq!(m.incident_share_pct, 0.0);
            assert_eq!(m.population_share_pct, 0.0);
            assert_eq!(m.ratio, None);
        }
    }

    #[test]
    fn counting_maps_labels_and_is_order_independent() {
        let mut rows = Vec::new();
        for (race, n) in [
            (Some("black"), 3),
            (Some("american indian or alaska native"), 1),
            (Some("asian"), 2),
            (None, 2),
        ] {
            for i in 0..n {
                rows.push(CitizenRecord {
                    ren: format!("r{}", i),
                    tracking_id: String::new(),
                    incident_date: "2022-01-01".to_string(),
                    incident_year: 2022,
                    incident_month: 1,
                    incident_day: 1,
                    troop: "Troop A".to_string(),
                    department_desc: "troop a".to_string(),
                    citizen_index: 1,
                    citizen_name: "Unknown".to_string(),
                    citizen_race: race.map(|s| s.to_string()),
                    force_by_citizen: None,
                    citizen_uid: String::new(),
                    citizen_count: 1,
                    officer_count: 1,
                    uses_of_force_count: None,
                    all_citizen_names: None,
                    all_citizen_races: None,
                    officer_force: None,
                    officer_names_raw: None,
                    officer_races_raw: None,
                    justified: None,
                });
            }
        }
        let forward = count_by_race(&rows);
        rows.reverse();
        let backward = count_by_race(&rows);
        assert_eq!(forward, backward);
        assert_eq!(forward[&RaceCategory::Black], 3);
        assert_eq!(forward[&RaceCategory::NativeAmerican], 1);
        assert_eq!(forward[&RaceCategory::AsianPacificIslander], 2);
        assert_eq!(forward[&RaceCategory::Unknown], 2);
    }
}
