//! Formatted terminal output for run summaries and store statistics

use crate::model::{RunSummary, SiteStatus};
use crate::store::StoreStats;

/// Prints the outcome of a harvest run to stdout
pub fn print_run_summary(summary: &RunSummary) {
    println!("=== Harvest Summary ===\n");

    println!(
        "Run finished in {:.1}s ({} sites completed, {} failed)",
        summary.duration_seconds,
        summary.sites_completed(),
        summary.sites_failed()
    );
    println!();

    println!("Per Site:");
    for (key, outcome) in &summary.per_site {
        let stats = &outcome.stats;
        match &outcome.status {
            SiteStatus::Completed => {
                println!(
                    "  {}: {} pages, {} listings ({} new, {} updated, {} unchanged, {} errors)",
                    key,
                    stats.pages_fetched,
                    stats.records_found,
                    stats.new,
                    stats.updated,
                    stats.unchanged,
                    stats.errors
                );
            }
            SiteStatus::Failed { error } => {
                println!("  {}: FAILED after {} pages ({})", key, stats.pages_fetched, error);
            }
        }
    }
    println!();

    let totals = &summary.totals;
    println!("Totals:");
    println!("  Pages fetched: {}", totals.pages_fetched);
    println!("  Listings found: {}", totals.records_found);
    println!("  New postings: {}", totals.new);
    println!("  Updated postings: {}", totals.updated);
    println!("  Unchanged: {}", totals.unchanged);
    println!("  Errors: {}", totals.errors);
}

/// Prints aggregate store statistics to stdout
pub fn print_store_stats(stats: &StoreStats) {
    println!("=== Store Statistics ===\n");

    println!("Overview:");
    println!("  Total postings: {}", stats.total);
    println!("  Flagged new: {}", stats.new);
    println!("  Marked relevant: {}", stats.relevant);
    println!("  Processed: {}", stats.processed);
    println!();

    if !stats.by_site.is_empty() {
        println!("Postings by Site:");
        for (site, count) in &stats.by_site {
            let percentage = if stats.total > 0 {
                (*count as f64 / stats.total as f64) * 100.0
            } else {
                0.0
            };
            println!("  {}: {} ({:.1}%)", site, count, percentage);
        }
    }
}
