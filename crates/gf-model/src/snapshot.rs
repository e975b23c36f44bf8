//! Snapshot index lists.
//!
//! A static scenario uses one synthetic index; a dynamic scenario uses a
//! date-indexed sequence. Either way the list length decides how many
//! output values every entity carries.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// One discrete time index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Snapshot {
    Step(u32),
    At(NaiveDateTime),
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Snapshot::Step(step) => write!(f, "{step}"),
            Snapshot::At(at) => write!(f, "{}", at.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

/// Non-empty list of snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Snapshot>", into = "Vec<Snapshot>")]
pub struct Snapshots(Vec<Snapshot>);

impl Snapshots {
    /// The single synthetic index used by static scenarios.
    pub fn single() -> Self {
        Self(vec![Snapshot::Step(0)])
    }

    /// `count` consecutive integer steps starting at zero.
    pub fn steps(count: u32) -> ModelResult<Self> {
        Self::try_from((0..count).map(Snapshot::Step).collect::<Vec<_>>())
    }

    /// Date-indexed sequence.
    pub fn dated(times: impl IntoIterator<Item = NaiveDateTime>) -> ModelResult<Self> {
        Self::try_from(times.into_iter().map(Snapshot::At).collect::<Vec<_>>())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false: construction rejects empty lists.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Snapshot> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Snapshot] {
        &self.0
    }
}

impl Default for Snapshots {
    fn default() -> Self {
        Self::single()
    }
}

impl TryFrom<Vec<Snapshot>> for Snapshots {
    type Error = ModelError;

    fn try_from(list: Vec<Snapshot>) -> ModelResult<Self> {
        if list.is_empty() {
            return Err(ModelError::EmptySnapshots);
        }
        Ok(Self(list))
    }
}

impl From<Snapshots> for Vec<Snapshot> {
    fn from(snapshots: Snapshots) -> Self {
        snapshots.0
    }
}

impl<'a> IntoIterator for &'a Snapshots {
    type Item = &'a Snapshot;
    type IntoIter = std::slice::Iter<'a, Snapshot>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn single_is_default() {
        let snapshots = Snapshots::default();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots.as_slice(), &[Snapshot::Step(0)]);
    }

    #[test]
    fn empty_list_rejected() {
        assert!(matches!(Snapshots::steps(0), Err(ModelError::EmptySnapshots)));
        assert!(Snapshots::try_from(Vec::new()).is_err());
    }

    #[test]
    fn dated_sequence() {
        let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let times = (0..24).map(|h| day.and_hms_opt(h, 0, 0).unwrap());
        let snapshots = Snapshots::dated(times).unwrap();
        assert_eq!(snapshots.len(), 24);
        assert_eq!(snapshots.iter().next().unwrap().to_string(), "2024-06-01 00:00:00");
    }

    #[test]
    fn yaml_accepts_steps_and_dates() {
        let steps: Snapshots = serde_yaml::from_str("[0, 1, 2]").unwrap();
        assert_eq!(steps, Snapshots::steps(3).unwrap());

        let dated: Snapshots = serde_yaml::from_str("['2024-06-01T00:00:00', '2024-06-01T01:00:00']").unwrap();
        assert!(matches!(dated.as_slice()[1], Snapshot::At(_)));

        assert!(serde_yaml::from_str::<Snapshots>("[]").is_err());
    }
}
