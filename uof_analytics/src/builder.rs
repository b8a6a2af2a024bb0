pub use crate::config::*;

/// A builder for assembling a batch of incidents before expansion.
///
/// ```
/// use uof_analytics::builder::Builder;
/// # use uof_analytics::{AnalyticsErrors, IncidentRecord};
///
/// let mut builder = Builder::new();
/// builder.add_incident(IncidentRecord {
///     ren: "22-00123".to_string(),
///     event_date: "2022-03-14".to_string(),
///     troop: "Troop A".to_string(),
///     citizen_count: 2,
///     officer_count: 1,
///     citizen_names: Some("P One, P Two".to_string()),
///     citizen_races: Some("Black".to_string()),
///     citizen_force: None,
///     officer_names: Some("O One".to_string()),
///     officer_races: Some("White".to_string()),
///     officer_force: Some("Takedown".to_string()),
///     uses_of_force_count: Some(1),
///     justified: Some("Y".to_string()),
/// });
///
/// let rows = builder.expand_citizens()?;
/// assert_eq!(rows.len(), 2);
///
/// # Ok::<(), AnalyticsErrors>(())
/// ```
#[derive(Default)]
pub struct Builder {
    pub(crate) _incidents: Vec<IncidentRecord>,
}

impl Builder {
    pub fn new() -> Builder {
        Builder {
            _incidents: Vec::new(),
        }
    }

    /// Adds one incident to the batch. Input row order is preserved: the
    /// expanded rows of an incident are contiguous and ordered by position.
    pub fn add_incident(&mut self, incident: IncidentRecord) {
        self._incidents.push(incident);
    }

    pub fn incidents(&self) -> &[IncidentRecord] {
        &self._incidents
    }

    /// Runs the citizen-level expansion on the accumulated batch.
    pub fn expand_citizens(&self) -> Result<Vec<CitizenRecord>, AnalyticsErrors> {
        crate::expand_citizen_level(&self._incidents)
    }

    /// Runs the citizen-officer expansion on the accumulated batch.
    pub fn expand_interactions(&self) -> Result<Vec<CitizenOfficerInteraction>, AnalyticsErrors> {
        crate::expand_interaction_level(&self._incidents)
    }
}
