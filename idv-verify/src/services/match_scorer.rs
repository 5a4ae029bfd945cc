//! Heuristic match scoring between the observed identity and one candidate
//!
//! Score is 0-3, one point each for:
//! - name equal (case-insensitive)
//! - both address lines equal (case-insensitive)
//! - candidate age equal to the age computed from the observed birthdate
//!
//! Nationality, gender and expiry are reported as corroboration flags only;
//! they never contribute to the score.

use crate::services::age::{age_between, parse_birthdate};
use crate::models::{CandidateRecord, ObservedRecord};
use chrono::{Local, NaiveDate};
use idv_common::config::DateOrder;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Scoring errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoreError {
    #[error("{record} record is missing required field '{field}'")]
    MissingField {
        record: &'static str,
        field: &'static str,
    },
}

/// Integer similarity in `0..=3`
pub type MatchScore = u8;

/// Per-field comparison result
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchBreakdown {
    pub name: bool,
    pub address: bool,
    pub age: bool,
    /// `None` when either side lacks the field
    pub nationality: Option<bool>,
    pub gender: Option<bool>,
    pub expiry: Option<bool>,
}

impl MatchBreakdown {
    pub fn score(&self) -> MatchScore {
        self.name as MatchScore + self.address as MatchScore + self.age as MatchScore
    }
}

/// Scores candidates against one observed record
///
/// The reference date is fixed at construction so a whole ranking pass uses
/// the same "today".
#[derive(Debug, Clone, Copy)]
pub struct MatchScorer {
    date_order: DateOrder,
    today: NaiveDate,
}

impl MatchScorer {
    /// Scorer using the current local date
    pub fn new(date_order: DateOrder) -> Self {
        Self::with_reference_date(date_order, Local::now().date_naive())
    }

    pub fn with_reference_date(date_order: DateOrder, today: NaiveDate) -> Self {
        Self { date_order, today }
    }

    /// Score `candidate` against `observed`
    pub fn score(
        &self,
        candidate: &CandidateRecord,
        observed: &ObservedRecord,
    ) -> Result<MatchScore, ScoreError> {
        Ok(self.breakdown(candidate, observed)?.score())
    }

    /// Field-by-field comparison
    ///
    /// An unparseable observed birthdate only loses the age point; a missing
    /// required field fails the whole comparison.
    pub fn breakdown(
        &self,
        candidate: &CandidateRecord,
        observed: &ObservedRecord,
    ) -> Result<MatchBreakdown, ScoreError> {
        let obs_name = required("observed", "name", &observed.name)?;
        let obs_line_1 = required("observed", "address-line-1", &observed.address_line_1)?;
        let obs_line_2 = required("observed", "address-line-2", &observed.address_line_2)?;
        let obs_dob = required("observed", "dateOfBirth", &observed.date_of_birth)?;

        let cand_name = required("candidate", "name", &candidate.name)?;
        let cand_line_1 = required("candidate", "address-line-1", &candidate.address_line_1)?;
        let cand_line_2 = required("candidate", "address-line-2", &candidate.address_line_2)?;
        let cand_age = candidate.age.ok_or(ScoreError::MissingField {
            record: "candidate",
            field: "age",
        })?;

        let age = match parse_birthdate(obs_dob, self.date_order)
            .and_then(|dob| age_between(dob, self.today))
        {
            Ok(observed_age) => observed_age == cand_age,
            Err(e) => {
                tracing::debug!(error = %e, "Observed birthdate unusable, age not matched");
                false
            }
        };

        Ok(MatchBreakdown {
            name: text_eq(cand_name, obs_name),
            address: text_eq(cand_line_1, obs_line_1) && text_eq(cand_line_2, obs_line_2),
            age,
            nationality: optional_eq(&candidate.nationality, &observed.nationality),
            gender: optional_eq(&candidate.gender, &observed.gender),
            expiry: optional_eq(&candidate.expiry, &observed.expiry_date),
        })
    }
}

fn required<'a>(
    record: &'static str,
    field: &'static str,
    value: &'a Option<String>,
) -> Result<&'a str, ScoreError> {
    value
        .as_deref()
        .ok_or(ScoreError::MissingField { record, field })
}

fn text_eq(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

fn optional_eq(a: &Option<String>, b: &Option<String>) -> Option<bool> {
    match (a.as_deref(), b.as_deref()) {
        (Some(a), Some(b)) => Some(text_eq(a, b)),
        _ => None,
    }
}
