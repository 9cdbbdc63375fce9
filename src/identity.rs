use sha2::{Digest, Sha256};

use crate::models::JobRecord;

// Unit separator between fields so "Acme|Engineer" + "Eng" can never hash the
// same as "Acme" + "Engineer|Eng".
const FIELD_SEPARATOR: [u8; 1] = [0x1f];

/// Stable identity for a job role: SHA-256 over (company, title, department).
/// Location and link are deliberately excluded - they get corrected between
/// polls without the role itself changing.
pub fn job_id(record: &JobRecord) -> String {
    id_for(&record.company, &record.title, &record.department)
}

pub fn id_for(company: &str, title: &str, department: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(company.as_bytes());
    hasher.update(FIELD_SEPARATOR);
    hasher.update(title.as_bytes());
    hasher.update(FIELD_SEPARATOR);
    hasher.update(department.as_bytes());
    hex::encode(hasher.finalize())
}
