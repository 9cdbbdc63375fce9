use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};

use crate::identity;
use crate::models::{JobRecord, Metadata, Snapshot, TrackedJob};

/// Jobs first seen within this window count as new. Recomputed every cycle
/// against the original found_date, not frozen at creation.
const NEW_WINDOW_DAYS: i64 = 7;

fn within_new_window(found_date: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - found_date <= Duration::days(NEW_WINDOW_DAYS)
}

/// Merge one cycle's fetched batches against the previous snapshot.
///
/// Observed jobs are matched by identity: known ones are refreshed (last_seen,
/// is_active, is_new), unknown ones are created with found_date = now. Known
/// jobs that no job in any batch matched are marked inactive but retained, so
/// a later reappearance reactivates the original record instead of creating a
/// duplicate. Metadata is rederived from the merged set.
///
/// Returns the new snapshot plus the jobs created this cycle. That second
/// list is for notification and is not the same thing as is_new: a job from
/// a prior cycle can still be inside the recency window without having been
/// added just now.
///
/// Must only be called with the complete set of batches for the cycle; the
/// not-observed-means-inactive rule is wrong over a partial view.
pub fn reconcile(
    batches: &[Vec<JobRecord>],
    previous: &Snapshot,
    now: DateTime<Utc>,
) -> (Snapshot, Vec<TrackedJob>) {
    let mut jobs = previous.jobs.clone();
    let mut index: HashMap<String, usize> = HashMap::with_capacity(jobs.len());
    for (i, job) in jobs.iter().enumerate() {
        index.insert(job.id.clone(), i);
    }

    let mut observed: HashSet<String> = HashSet::new();
    let mut added: Vec<String> = Vec::new();

    for record in batches.iter().flatten() {
        let id = identity::job_id(record);
        match index.get(&id) {
            Some(&i) => {
                let job = &mut jobs[i];
                // Non-identity fields may have been corrected at the source;
                // when one identity shows up twice in a cycle the last
                // observation wins.
                job.location = record.location.clone();
                job.link = record.link.clone();
                job.last_seen = now;
                job.is_active = true;
                job.is_new = within_new_window(job.found_date, now);
            }
            None => {
                index.insert(id.clone(), jobs.len());
                added.push(id.clone());
                jobs.push(TrackedJob {
                    id: id.clone(),
                    company: record.company.clone(),
                    title: record.title.clone(),
                    department: record.department.clone(),
                    location: record.location.clone(),
                    link: record.link.clone(),
                    found_date: now,
                    last_seen: now,
                    is_active: true,
                    is_new: true,
                });
            }
        }
        observed.insert(id);
    }

    // Anything known but unseen this cycle has disappeared from its source.
    // Retained, never evicted: last_seen keeps its old value.
    for job in &mut jobs {
        if !observed.contains(&job.id) {
            job.is_active = false;
            job.is_new = false;
        }
    }

    let metadata = Metadata::compute(&jobs, now);
    let newly_added = added
        .iter()
        .map(|id| jobs[index[id]].clone())
        .collect();

    (Snapshot { jobs, metadata }, newly_added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn record(company: &str, title: &str, department: &str, location: &str) -> JobRecord {
        JobRecord {
            company: company.to_string(),
            title: title.to_string(),
            department: department.to_string(),
            location: location.to_string(),
            link: String::new(),
        }
    }

    fn ids(snapshot: &Snapshot) -> Vec<&str> {
        snapshot.jobs.iter().map(|j| j.id.as_str()).collect()
    }

    #[test]
    fn test_first_observation_creates_new_job() {
        let batches = vec![vec![record("Acme", "Engineer", "Eng", "Remote")]];
        let (snapshot, newly_added) = reconcile(&batches, &Snapshot::empty(), t0());

        assert_eq!(snapshot.jobs.len(), 1);
        let job = &snapshot.jobs[0];
        assert!(job.is_new);
        assert!(job.is_active);
        assert_eq!(job.found_date, t0());
        assert_eq!(job.last_seen, t0());
        assert_eq!(newly_added.len(), 1);
        assert_eq!(newly_added[0].id, job.id);
        assert_eq!(snapshot.metadata.total_jobs, 1);
        assert_eq!(snapshot.metadata.active_jobs, 1);
        assert_eq!(snapshot.metadata.new_jobs, 1);
        assert_eq!(snapshot.metadata.companies_count, 1);
    }

    #[test]
    fn test_idempotent_within_a_cycle_boundary() {
        let batches = vec![vec![
            record("Acme", "Engineer", "Eng", "Remote"),
            record("Acme", "Designer", "Design", "Berlin"),
        ]];
        let (first, _) = reconcile(&batches, &Snapshot::empty(), t0());
        let (second, newly_added) = reconcile(&batches, &first, t0());

        assert_eq!(second.metadata.total_jobs, first.metadata.total_jobs);
        assert_eq!(second.metadata.active_jobs, first.metadata.active_jobs);
        assert!(newly_added.is_empty());
        assert_eq!(ids(&second), ids(&first));
    }

    #[test]
    fn test_no_duplicate_ids_in_output() {
        let batches = vec![
            vec![record("Acme", "Engineer", "Eng", "Remote")],
            vec![record("Globex", "Engineer", "Eng", "")],
        ];
        let (first, _) = reconcile(&batches, &Snapshot::empty(), t0());
        let (second, _) = reconcile(&batches, &first, t0() + Duration::days(1));

        let mut seen = HashSet::new();
        for job in &second.jobs {
            assert!(seen.insert(job.id.clone()), "duplicate id {}", job.id);
        }
        assert_eq!(second.jobs.len(), 2);
    }

    #[test]
    fn test_disappearance_marks_inactive_and_retains() {
        let batches = vec![vec![record("Acme", "Engineer", "Eng", "Remote")]];
        let (first, _) = reconcile(&batches, &Snapshot::empty(), t0());

        let later = t0() + Duration::days(1);
        let (second, newly_added) = reconcile(&[Vec::new()], &first, later);

        assert!(newly_added.is_empty());
        assert_eq!(second.jobs.len(), 1);
        let job = &second.jobs[0];
        assert!(!job.is_active);
        assert!(!job.is_new);
        // last_seen stays at the last cycle that actually saw it.
        assert_eq!(job.last_seen, t0());
        assert_eq!(second.metadata.active_jobs, 0);
        assert_eq!(second.metadata.inactive_jobs, 1);
        assert_eq!(second.metadata.companies_count, 0);
    }

    #[test]
    fn test_reappearance_reactivates_without_duplicate() {
        let batches = vec![vec![record("Acme", "Engineer", "Eng", "Remote")]];
        let (first, _) = reconcile(&batches, &Snapshot::empty(), t0());
        let (gone, _) = reconcile(&[Vec::new()], &first, t0() + Duration::days(1));
        let back_at = t0() + Duration::days(2);
        let (back, newly_added) = reconcile(&batches, &gone, back_at);

        assert_eq!(back.jobs.len(), 1);
        let job = &back.jobs[0];
        assert!(job.is_active);
        assert_eq!(job.found_date, t0());
        assert_eq!(job.last_seen, back_at);
        // Matched by identity, so it is not reported as newly added.
        assert!(newly_added.is_empty());
    }

    #[test]
    fn test_is_new_expires_after_window() {
        let batches = vec![vec![record("Acme", "Engineer", "Eng", "Remote")]];
        let (first, _) = reconcile(&batches, &Snapshot::empty(), t0());

        // Still inside the window a day later, and not newly added again.
        let (second, newly_added) = reconcile(&batches, &first, t0() + Duration::days(1));
        assert!(second.jobs[0].is_new);
        assert!(newly_added.is_empty());

        // Past the window while still listed.
        let (third, _) = reconcile(&batches, &second, t0() + Duration::days(8));
        assert!(third.jobs[0].is_active);
        assert!(!third.jobs[0].is_new);
    }

    #[test]
    fn test_end_to_end_lifecycle_example() {
        let batches = vec![vec![record("Acme", "Engineer", "Eng", "Remote")]];

        let (s1, added1) = reconcile(&batches, &Snapshot::empty(), t0());
        assert_eq!(s1.jobs.len(), 1);
        assert!(s1.jobs[0].is_new && s1.jobs[0].is_active);
        assert_eq!(s1.jobs[0].found_date, t0());
        assert_eq!(added1.len(), 1);

        let (s2, added2) = reconcile(&batches, &s1, t0() + Duration::days(1));
        assert!(s2.jobs[0].is_new);
        assert!(added2.is_empty());

        let (s3, added3) = reconcile(&[Vec::new()], &s2, t0() + Duration::days(8));
        assert_eq!(s3.jobs.len(), 1);
        assert!(!s3.jobs[0].is_active);
        assert!(!s3.jobs[0].is_new);
        assert!(added3.is_empty());
    }

    #[test]
    fn test_same_cycle_identity_collision_last_wins() {
        // Two records in one cycle hashing to the same identity merge into a
        // single tracked job; the later observation's mutable fields win.
        let mut a = record("Acme", "Engineer", "Eng", "Berlin");
        a.link = "https://acme.example.com/jobs/a".to_string();
        let mut b = record("Acme", "Engineer", "Eng", "Remote");
        b.link = "https://acme.example.com/jobs/b".to_string();

        let (snapshot, newly_added) = reconcile(&[vec![a, b]], &Snapshot::empty(), t0());
        assert_eq!(snapshot.jobs.len(), 1);
        assert_eq!(newly_added.len(), 1);
        assert_eq!(snapshot.jobs[0].location, "Remote");
        assert_eq!(snapshot.jobs[0].link, "https://acme.example.com/jobs/b");
        assert_eq!(newly_added[0].location, "Remote");
    }

    #[test]
    fn test_updated_metadata_refreshes_on_reobservation() {
        let batches = vec![vec![record("Acme", "Engineer", "Eng", "Berlin")]];
        let (first, _) = reconcile(&batches, &Snapshot::empty(), t0());

        let corrected = vec![vec![record("Acme", "Engineer", "Eng", "Remote")]];
        let (second, _) = reconcile(&corrected, &first, t0() + Duration::days(1));
        assert_eq!(second.jobs.len(), 1);
        // Same identity, corrected location.
        assert_eq!(second.jobs[0].id, first.jobs[0].id);
        assert_eq!(second.jobs[0].location, "Remote");
    }

    #[test]
    fn test_batches_merge_across_sources_in_order() {
        let batches = vec![
            vec![record("Acme", "Engineer", "Eng", "")],
            vec![record("Globex", "Analyst", "Data", "")],
        ];
        let (snapshot, newly_added) = reconcile(&batches, &Snapshot::empty(), t0());
        assert_eq!(snapshot.jobs.len(), 2);
        assert_eq!(newly_added.len(), 2);
        assert_eq!(snapshot.jobs[0].company, "Acme");
        assert_eq!(snapshot.jobs[1].company, "Globex");
        assert_eq!(snapshot.metadata.companies_count, 2);
        assert_eq!(snapshot.metadata.departments_count, 2);
    }

    #[test]
    fn test_empty_batch_for_one_source_only_affects_that_source() {
        let batches = vec![
            vec![record("Acme", "Engineer", "Eng", "")],
            vec![record("Globex", "Analyst", "Data", "")],
        ];
        let (first, _) = reconcile(&batches, &Snapshot::empty(), t0());

        // Globex times out next cycle and contributes an empty batch.
        let degraded = vec![vec![record("Acme", "Engineer", "Eng", "")], Vec::new()];
        let (second, _) = reconcile(&degraded, &first, t0() + Duration::days(1));

        let acme = second.jobs.iter().find(|j| j.company == "Acme").unwrap();
        let globex = second.jobs.iter().find(|j| j.company == "Globex").unwrap();
        assert!(acme.is_active);
        assert!(!globex.is_active);
        assert_eq!(second.metadata.active_jobs, 1);
    }
}
