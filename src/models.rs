use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A job as extracted from a single source response. First-seen time is not
/// part of this shape: it is assigned during reconciliation, never trusted
/// from the fetch layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub company: String,
    pub title: String,
    pub department: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub link: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedJob {
    pub id: String,
    pub company: String,
    pub title: String,
    pub department: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub link: String,
    #[serde(with = "timestamp")]
    pub found_date: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub last_seen: DateTime<Utc>,
    pub is_active: bool,
    pub is_new: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default, with = "timestamp::opt")]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub total_jobs: usize,
    #[serde(default)]
    pub active_jobs: usize,
    #[serde(default)]
    pub inactive_jobs: usize,
    #[serde(default)]
    pub new_jobs: usize,
    #[serde(default)]
    pub companies_count: usize,
    #[serde(default)]
    pub departments_count: usize,
}

impl Metadata {
    /// Derive the aggregate counts from scratch. Counts are never patched
    /// incrementally; company/department cardinality covers active jobs only.
    pub fn compute(jobs: &[TrackedJob], now: DateTime<Utc>) -> Self {
        let total_jobs = jobs.len();
        let active_jobs = jobs.iter().filter(|j| j.is_active).count();
        let new_jobs = jobs.iter().filter(|j| j.is_new).count();
        let companies: HashSet<&str> = jobs
            .iter()
            .filter(|j| j.is_active)
            .map(|j| j.company.as_str())
            .collect();
        let departments: HashSet<&str> = jobs
            .iter()
            .filter(|j| j.is_active)
            .map(|j| j.department.as_str())
            .collect();

        Metadata {
            last_updated: Some(now),
            total_jobs,
            active_jobs,
            inactive_jobs: total_jobs - active_jobs,
            new_jobs,
            companies_count: companies.len(),
            departments_count: departments.len(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub jobs: Vec<TrackedJob>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Snapshot {
    pub fn empty() -> Self {
        Snapshot {
            jobs: Vec::new(),
            metadata: Metadata::default(),
        }
    }
}

/// Timestamps are written as RFC 3339. Stores written by the previous monitor
/// used naive `%Y-%m-%d %H:%M:%S` strings, so reads accept both.
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const LEGACY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn parse(s: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(s, LEGACY_FORMAT)
            .ok()
            .map(|naive| naive.and_utc())
    }

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&dt.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse(&s).ok_or_else(|| serde::de::Error::custom(format!("unrecognized timestamp: {}", s)))
    }

    pub mod opt {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            dt: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match dt {
                Some(dt) => serializer.serialize_str(&dt.to_rfc3339()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            let s = Option::<String>::deserialize(deserializer)?;
            match s {
                None => Ok(None),
                Some(s) => super::parse(&s).map(Some).ok_or_else(|| {
                    serde::de::Error::custom(format!("unrecognized timestamp: {}", s))
                }),
            }
        }
    }
}
