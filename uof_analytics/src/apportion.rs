//! Redistributes base-region (parish) population counts onto coverage areas
//! (troops), applying partial-membership weights.

use std::collections::BTreeMap;

use log::{debug, warn};

use crate::config::*;

/// Apportions parish-level population counts onto the coverage areas.
///
/// For every area and race category the result is the weight-summed
/// contribution of its member parishes, each contribution truncated toward
/// zero: `trunc(parish_count * weight)`. Truncation can under-count an area by
/// up to (members - 1) individuals per category; this matches the upstream
/// census handling and is kept deliberately.
///
/// A member parish with no population row contributes zero and is reported
/// with a warning; the run continues. The per-area total is the sum of its
/// race-category parts. Output rows follow the order of the coverage table.
pub fn apportion_population(
    parishes: &[ParishPopulation],
    coverage: &[CoverageArea],
) -> Vec<CoveragePopulation> {
    let by_parish: BTreeMap<&str, &ParishPopulation> = parishes
        .iter()
        .map(|p| (p.parish.as_str(), p))
        .collect();

    let mut res: Vec<CoveragePopulation> = Vec::new();
    for area in coverage.iter() {
        let mut by_race: BTreeMap<RaceCategory, u64> = RaceCategory::WITH_POPULATION
            .iter()
            .map(|r| (*r, 0u64))
            .collect();
        for member in area.members.iter() {
            let parish = match by_parish.get(member.parish.as_str()) {
                Some(p) => p,
                None => {
                    warn!(
                        "apportion_population: no population data for parish {} (coverage area {}), contributing zero",
                        member.parish, area.troop
                    );
                    continue;
                }
            };
            for race in RaceCategory::WITH_POPULATION.iter() {
                let count = parish.by_race.get(race).cloned().unwrap_or(0);
                let contribution = (count as f64 * member.weight) as u64;
                if let Some(c) = by_race.get_mut(race) {
                    *c += contribution;
                }
            }
        }
        let total: u64 = by_race.values().sum();
        debug!(
            "apportion_population: {} -> total {} over {} members",
            area.troop,
            total,
            area.members.len()
        );
        res.push(CoveragePopulation {
            troop: area.troop.clone(),
            by_race,
            total,
        });
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parish(name: &str, black: u64, white: u64) -> ParishPopulation {
        let mut by_race = BTreeMap::new();
        by_race.insert(RaceCategory::Black, black);
        by_race.insert(RaceCategory::White, white);
        ParishPopulation {
            parish: name.to_string(),
            by_race,
        }
    }

    fn area(troop: &str, members: &[(&str, f64)]) -> CoverageArea {
        CoverageArea {
            troop: troop.to_string(),
            members: members
                .iter()
                .map(|(p, w)| CoverageMember {
                    parish: p.to_string(),
                    weight: *w,
                })
                .collect(),
        }
    }

    #[test]
    fn full_members_are_summed() {
        let parishes = vec![parish("Acadia", 100, 200), parish("Allen", 10, 20)];
        let coverage = vec![area("Troop X", &[("Acadia", 1.0), ("Allen", 1.0)])];
        let res = apportion_population(&parishes, &coverage);
        assert_eq!(res.len(), 1);
        assert_eq!(res[0].by_race[&RaceCategory::Black], 110);
        assert_eq!(res[0].by_race[&RaceCategory::White], 220);
        assert_eq!(res[0].total, 330);
    }

    #[test]
    fn split_contributions_truncate_toward_zero() {
        // An odd population at weight 0.5 contributes the floor: 7 -> 3.
        let parishes = vec![parish("St. James", 7, 9)];
        let coverage = vec![
            area("Troop A", &[("St. James", 0.5)]),
            area("Troop C", &[("St. James", 0.5)]),
        ];
        let res = apportion_population(&parishes, &coverage);
        assert_eq!(res[0].by_race[&RaceCategory::Black], 3);
        assert_eq!(res[1].by_race[&RaceCategory::Black], 3);
        assert_eq!(res[0].by_race[&RaceCategory::White], 4);
    }

    #[test]
    fn mixed_full_and_split_membership() {
        let parishes = vec![parish("Orleans", 1000, 500), parish("St. James", 7, 0)];
        let coverage = vec![area(
            "Troop B",
            &[("Orleans", 1.0), ("St. James", 0.5)],
        )];
        let res = apportion_population(&parishes, &coverage);
        assert_eq!(res[0].by_race[&RaceCategory::Black], 1003);
        assert_eq!(res[0].total, 1003 + 500);
    }

    #[test]
    fn missing_parish_contributes_zero_but_row_is_emitted() {
        let parishes = vec![parish("Acadia", 100, 100)];
        let coverage = vec![area("Troop Y", &[("Acadia", 1.0), ("Nowhere", 1.0)])];
        let res = apportion_population(&parishes, &coverage);
        assert_eq!(res.len(), 1);
        assert_eq!(res[0].by_race[&RaceCategory::Black], 100);
        assert_eq!(res[0].total, 200);
    }

    #[test]
    fn coverage_validation_catches_unbalanced_splits() {
        let ok = vec![
            area("Troop A", &[("St. James", 0.5), ("Acadia", 1.0)]),
            area("Troop C", &[("St. James", 0.5)]),
        ];
        assert_eq!(validate_coverage(&ok), Ok(()));

        let unbalanced = vec![area("Troop A", &[("St. James", 0.5)])];
        assert_eq!(
            validate_coverage(&unbalanced),
            Err(AnalyticsErrors::UnbalancedSplit {
                parish: "St. James".to_string()
            })
        );

        let duplicated = vec![
            area("Troop A", &[("Acadia", 1.0)]),
            area("Troop D", &[("Acadia", 1.0)]),
        ];
        assert_eq!(
            validate_coverage(&duplicated),
            Err(AnalyticsErrors::DuplicateParish {
                parish: "Acadia".to_string()
            })
        );
    }
}
