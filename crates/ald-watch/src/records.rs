//! Per-facility last-observed values and the pure comparison step.

use std::collections::HashMap;

use crate::cycle::Observation;

/// Last observed bed count per saved facility, keyed by facility id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchRecords {
    values: HashMap<String, i64>,
}

impl WatchRecords {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, facility_id: &str) -> Option<i64> {
        self.values.get(facility_id).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> + '_ {
        self.values.iter().map(|(id, v)| (id.as_str(), *v))
    }
}

impl FromIterator<(String, i64)> for WatchRecords {
    fn from_iter<I: IntoIterator<Item = (String, i64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BedCountChange {
    pub facility_id: String,
    pub name: String,
    pub before: i64,
    pub after: i64,
}

impl BedCountChange {
    /// User-facing text. Identical changes produce identical messages.
    #[must_use]
    pub fn message(&self) -> String {
        format!(
            "{}: bed count changed from {} to {}",
            self.name, self.before, self.after
        )
    }
}

/// Result of one comparison: the replacement records and the changes found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comparison {
    pub records: WatchRecords,
    pub changes: Vec<BedCountChange>,
}

/// Compares this cycle's observations against `previous`.
///
/// The previous value for a facility is its record, or failing that the value
/// in its saved snapshot. A facility with no current value (failed fetch or
/// missing field) falls back to that previous value, so it never reports a
/// change. The returned records hold exactly the observed facilities; records
/// for facilities no longer saved are dropped.
#[must_use]
pub fn compare(previous: &WatchRecords, observations: &[Observation]) -> Comparison {
    let mut records = HashMap::with_capacity(observations.len());
    let mut changes = Vec::new();

    for obs in observations {
        let before = previous.get(&obs.facility_id).or(obs.snapshot_value);
        let Some(after) = obs.current.or(before) else {
            continue;
        };

        if let Some(before) = before {
            if before != after {
                changes.push(BedCountChange {
                    facility_id: obs.facility_id.clone(),
                    name: obs.name.clone(),
                    before,
                    after,
                });
            }
        }
        records.insert(obs.facility_id.clone(), after);
    }

    Comparison {
        records: WatchRecords { values: records },
        changes,
    }
}
