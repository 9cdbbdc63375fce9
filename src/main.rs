mod config;
mod fetch;
mod fields;
mod filters;
mod identity;
mod models;
mod reconcile;
mod store;

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use models::Metadata;

#[derive(Parser)]
#[command(name = "jobwatch")]
#[command(about = "Job listing monitor - poll career pages and track what appears and disappears")]
struct Cli {
    /// Path to the monitoring config
    #[arg(short, long, default_value = "job_config.json")]
    config: PathBuf,

    /// Path to the tracked-jobs store (defaults to the user data directory)
    #[arg(short, long)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one poll cycle across all configured sources
    Check,

    /// List tracked jobs
    List {
        /// Include jobs that have disappeared from their source
        #[arg(long)]
        inactive: bool,

        /// Only jobs first seen within the last week
        #[arg(long)]
        new: bool,

        /// Filter by company name
        #[arg(short = 'C', long)]
        company: Option<String>,
    },

    /// Show aggregate stats from the store
    Stats,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let store_path = cli.store.clone().unwrap_or_else(store::default_path);

    match cli.command {
        Commands::Check => run_check(&cli.config, &store_path),
        Commands::List {
            inactive,
            new,
            company,
        } => run_list(&store_path, inactive, new, company.as_deref()),
        Commands::Stats => run_stats(&store_path),
    }
}

fn run_check(config_path: &Path, store_path: &Path) -> Result<()> {
    let config = config::load(config_path)?;
    if config.companies.is_empty() {
        println!("No sources configured in {}.", config_path.display());
        return Ok(());
    }

    let now = Utc::now();
    let previous = store::load(store_path, now)?;

    let mut batches = Vec::with_capacity(config.companies.len());
    for source in &config.companies {
        println!("Fetching jobs from {}...", source.name);
        match fetch::fetch_jobs(source) {
            Ok(jobs) => {
                println!("  {} job(s) match filters", jobs.len());
                batches.push(jobs);
            }
            Err(e) => {
                // One bad source must not abort the cycle, but its jobs will
                // show as inactive until it answers again.
                eprintln!("  Error fetching {}: {:#}", source.name, e);
                eprintln!("  Contributing an empty batch; its jobs will be marked inactive this cycle.");
                batches.push(Vec::new());
            }
        }
    }

    let (snapshot, new_jobs) = reconcile::reconcile(&batches, &previous, now);

    // A failed save is fatal: the next cycle would re-derive lifecycle flags
    // from stale state and report them wrong.
    store::save(store_path, &snapshot)?;

    if new_jobs.is_empty() {
        println!("\nNo new jobs found.");
    } else {
        println!("\n{} new job(s):", new_jobs.len());
        for job in &new_jobs {
            print!("  {} - {}", job.company, job.title);
            if job.location.is_empty() {
                println!(" ({})", job.department);
            } else {
                println!(" ({}, {})", job.department, job.location);
            }
            if !job.link.is_empty() {
                println!("    {}", job.link);
            }
        }
    }

    print_summary(&snapshot.metadata);
    Ok(())
}

fn run_list(store_path: &Path, inactive: bool, new: bool, company: Option<&str>) -> Result<()> {
    let snapshot = store::load(store_path, Utc::now())?;

    let jobs: Vec<_> = snapshot
        .jobs
        .iter()
        .filter(|j| inactive || j.is_active)
        .filter(|j| !new || j.is_new)
        .filter(|j| {
            company
                .map(|c| j.company.eq_ignore_ascii_case(c))
                .unwrap_or(true)
        })
        .collect();

    if jobs.is_empty() {
        println!("No jobs found.");
        return Ok(());
    }

    println!(
        "{:<10} {:<20} {:<34} {:<20} {:<12}",
        "STATE", "COMPANY", "TITLE", "DEPARTMENT", "LAST SEEN"
    );
    println!("{}", "-".repeat(98));
    for job in jobs {
        let state = match (job.is_active, job.is_new) {
            (true, true) => "new",
            (true, false) => "active",
            (false, _) => "inactive",
        };
        println!(
            "{:<10} {:<20} {:<34} {:<20} {:<12}",
            state,
            truncate(&job.company, 18),
            truncate(&job.title, 32),
            truncate(&job.department, 18),
            job.last_seen.format("%Y-%m-%d").to_string()
        );
    }
    Ok(())
}

fn run_stats(store_path: &Path) -> Result<()> {
    let snapshot = store::load(store_path, Utc::now())?;
    print_summary(&snapshot.metadata);
    Ok(())
}

fn print_summary(metadata: &Metadata) {
    println!("\nTracked jobs:");
    println!("  Total:       {}", metadata.total_jobs);
    println!("  Active:      {}", metadata.active_jobs);
    println!("  Inactive:    {}", metadata.inactive_jobs);
    println!("  New (7d):    {}", metadata.new_jobs);
    println!("  Companies:   {}", metadata.companies_count);
    println!("  Departments: {}", metadata.departments_count);
    if let Some(last_updated) = metadata.last_updated {
        println!("  Updated:     {}", last_updated.format("%Y-%m-%d %H:%M:%S UTC"));
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a much longer title here", 10), "a much ...");
    }
}
