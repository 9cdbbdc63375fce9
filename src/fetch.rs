use anyhow::{anyhow, Context, Result};
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use std::time::Duration;

use crate::config::SourceConfig;
use crate::fields;
use crate::filters;
use crate::models::JobRecord;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
const FETCH_TIMEOUT_SECS: u64 = 15;

/// Fetch the current listings for one source. Network and parse errors come
/// back as errors for the caller to isolate; the Reconciler never sees them.
pub fn fetch_jobs(source: &SourceConfig) -> Result<Vec<JobRecord>> {
    if source.is_api() {
        fetch_from_api(source)
    } else {
        fetch_from_html(source)
    }
}

fn client() -> Result<reqwest::blocking::Client> {
    reqwest::blocking::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
        .build()
        .context("Failed to build HTTP client")
}

fn fetch_from_api(source: &SourceConfig) -> Result<Vec<JobRecord>> {
    let api_url = source
        .api_url
        .as_deref()
        .ok_or_else(|| anyhow!("Source '{}' has no api_url", source.name))?;

    let data: Value = client()?
        .get(api_url)
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .with_context(|| format!("Request to {} failed", api_url))?
        .error_for_status()
        .with_context(|| format!("Request to {} failed", api_url))?
        .json()
        .with_context(|| format!("Invalid JSON response from {}", api_url))?;

    extract_api_records(&data, source)
}

fn fetch_from_html(source: &SourceConfig) -> Result<Vec<JobRecord>> {
    let url = source
        .url
        .as_deref()
        .ok_or_else(|| anyhow!("Source '{}' has neither api_url nor url", source.name))?;

    if !source.filters.locations.is_empty() {
        eprintln!(
            "Warning: '{}' is an HTML source with no location data; its location filter will reject every job",
            source.name
        );
    }

    let body = client()?
        .get(url)
        .send()
        .with_context(|| format!("Request to {} failed", url))?
        .error_for_status()
        .with_context(|| format!("Request to {} failed", url))?
        .text()
        .with_context(|| format!("Failed to read response body from {}", url))?;

    extract_html_records(&body, source)
}

/// Pull job records out of an API response. The listings array is found via
/// the common data/jobs/results wrapper keys, or an explicit api_jobs_path.
pub fn extract_api_records(data: &Value, source: &SourceConfig) -> Result<Vec<JobRecord>> {
    let mut listings = data;
    if let Value::Object(map) = listings {
        for key in ["data", "jobs", "results"] {
            if let Some(inner) = map.get(key) {
                listings = inner;
                break;
            }
        }
    }

    if let Some(path) = source.api_jobs_path.as_deref() {
        let mut current = data;
        for key in path.split('.') {
            current = current
                .get(key)
                .ok_or_else(|| anyhow!("Jobs path '{}' not found in response", path))?;
        }
        listings = current;
    }

    let Value::Array(items) = listings else {
        return Err(anyhow!("Expected a list of jobs in the response"));
    };

    let base = api_base(source);
    let mut jobs = Vec::new();
    for item in items {
        let title = fields::resolve(item, &source.api_title_field);
        let department = fields::resolve(item, &source.api_department_field);
        let location = fields::resolve(item, &source.api_location_field);
        let link = absolutize(&fields::resolve(item, &source.api_link_field), &base);

        if filters::matches(&department, &location, &source.filters) {
            jobs.push(JobRecord {
                company: source.name.clone(),
                title,
                department,
                location,
                link,
            });
        }
    }
    Ok(jobs)
}

/// Pull job records out of a careers page using the source's CSS selectors.
/// Listings with no title element are skipped; a missing department element
/// degrades to "Unknown". HTML pages carry no location, so location is always
/// empty here.
pub fn extract_html_records(body: &str, source: &SourceConfig) -> Result<Vec<JobRecord>> {
    let url = source.url.as_deref().unwrap_or_default();
    let job_selector = parse_selector(source.job_selector.as_deref(), "job_selector")?;
    let title_selector = parse_selector(source.title_selector.as_deref(), "title_selector")?;
    let department_selector =
        parse_selector(source.department_selector.as_deref(), "department_selector")?;
    let link_selector = parse_selector(source.link_selector.as_deref(), "link_selector")?;

    let document = Html::parse_document(body);
    let base = site_root(url);

    let mut jobs = Vec::new();
    for listing in document.select(&job_selector) {
        let Some(title) = select_text(&listing, &title_selector) else {
            continue;
        };
        let department =
            select_text(&listing, &department_selector).unwrap_or_else(|| "Unknown".to_string());
        let link = listing
            .select(&link_selector)
            .next()
            .and_then(|el| el.value().attr("href"))
            .unwrap_or_default();
        let link = absolutize(link, &base);

        if filters::matches(&department, "", &source.filters) {
            jobs.push(JobRecord {
                company: source.name.clone(),
                title,
                department,
                location: String::new(),
                link,
            });
        }
    }
    Ok(jobs)
}

fn parse_selector(selector: Option<&str>, field: &str) -> Result<Selector> {
    let raw = selector.ok_or_else(|| anyhow!("HTML source is missing {}", field))?;
    Selector::parse(raw).map_err(|e| anyhow!("Invalid CSS selector '{}': {}", raw, e))
}

fn select_text(listing: &ElementRef, selector: &Selector) -> Option<String> {
    listing
        .select(selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
}

/// Base for relative API links: explicit base_url, else everything before the
/// first "/api" segment of the api_url.
fn api_base(source: &SourceConfig) -> String {
    if let Some(base) = &source.base_url {
        return base.clone();
    }
    let api_url = source.api_url.as_deref().unwrap_or_default();
    api_url.split("/api").next().unwrap_or(api_url).to_string()
}

/// scheme://host portion of a page URL.
fn site_root(url: &str) -> String {
    url.split('/').take(3).collect::<Vec<_>>().join("/")
}

fn absolutize(link: &str, base: &str) -> String {
    if link.is_empty() || link.starts_with("http") {
        return link.to_string();
    }
    format!("{}/{}", base.trim_end_matches('/'), link.trim_start_matches('/'))
}
