use chrono::{DateTime, SecondsFormat, Utc};
use lessongate_common::ProgressStatus;
use serde::{Deserialize, Serialize};

/// Links a learner to progress tracking. At most one per learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentProfile {
    pub id: i64,
    pub learner_id: String,
    pub created_at: String,
}

/// One learner at one section, with slugs resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub id: i64,
    pub profile_id: i64,
    pub module_slug: String,
    pub section_slug: String,
    pub status: ProgressStatus,
    pub completion_percentage: f64,
    pub attempts: i64,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub last_accessed_at: String,
    pub payload: Option<serde_json::Value>,
}

/// A fully validated write, ready for the store's atomic upsert.
#[derive(Debug, Clone)]
pub struct ProgressWrite {
    pub profile_id: i64,
    pub module_id: i64,
    pub module_slug: String,
    pub section_id: i64,
    pub section_slug: String,
    pub status: ProgressStatus,
    /// `None` keeps the stored percentage (0 for a new record)
    pub completion_percentage: Option<f64>,
    pub payload: Option<serde_json::Value>,
    pub at: DateTime<Utc>,
    pub clear_completed_on_regress: bool,
}

/// Timestamp format used in every progress column. Microsecond precision keeps
/// two writes within the same second distinguishable.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Summary returned by a catalog seed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedSummary {
    pub modules: usize,
    pub sections: usize,
    pub deactivated_modules: usize,
    pub deactivated_sections: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamps_are_utc_with_micros() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();
        assert_eq!(format_timestamp(at), "2026-03-01T09:30:00.000000Z");
    }

    #[test]
    fn progress_record_serializes_camel_case() {
        let record = ProgressRecord {
            id: 1,
            profile_id: 2,
            module_slug: "a".into(),
            section_slug: "a1".into(),
            status: ProgressStatus::Completed,
            completion_percentage: 100.0,
            attempts: 3,
            started_at: Some("t0".into()),
            completed_at: Some("t1".into()),
            last_accessed_at: "t2".into(),
            payload: None,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["moduleSlug"], "a");
        assert_eq!(json["sectionSlug"], "a1");
        assert_eq!(json["status"], "completed");
        assert_eq!(json["completionPercentage"], 100.0);
        assert_eq!(json["completedAt"], "t1");
    }
}
