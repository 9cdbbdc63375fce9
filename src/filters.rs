use serde::Deserialize;

/// Per-source inclusion filters. An empty list means "keep everything" for
/// that dimension; otherwise a job passes when at least one entry appears
/// (case-insensitively) inside the observed field. Both dimensions must pass.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterConfig {
    #[serde(default)]
    pub departments: Vec<String>,
    #[serde(default)]
    pub locations: Vec<String>,
}

pub fn matches(department: &str, location: &str, filters: &FilterConfig) -> bool {
    dimension_matches(department, &filters.departments)
        && dimension_matches(location, &filters.locations)
}

fn dimension_matches(value: &str, wanted: &[String]) -> bool {
    if wanted.is_empty() {
        return true;
    }
    let haystack = value.to_lowercase();
    wanted.iter().any(|w| haystack.contains(&w.to_lowercase()))
}
