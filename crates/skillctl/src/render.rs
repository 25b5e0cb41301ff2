//! Output rendering for skillctl CLI.

use std::path::PathBuf;

use skill_core::bundle::parse_bundle;

use crate::client::{Bundle, Listing, Validated};

/// Print the skills a repository offers in tabular format.
pub fn print_listing(listing: &Listing) {
    println!("Repository: {}", listing.github_url);
    if listing.multiple_skills {
        println!("  offers more than one skill; pick one to resolve");
    }
    println!();

    if listing.skills.is_empty() {
        println!("No skills found.");
        return;
    }

    println!("{:<24}  {:<12}  {:<40}", "NAME", "CATEGORY", "PATH");
    println!("{}", "-".repeat(80));
    for skill in &listing.skills {
        println!(
            "{:<24}  {:<12}  {:<40}",
            truncate(&skill.name, 24),
            truncate(&skill.category, 12),
            skill.path
        );
    }

    println!();
    println!("{} skill(s)", listing.skills.len());
    println!("Resolve one with: skillctl resolve <repo> --skill <path>");
}

/// Print a summary of a resolved bundle.
pub fn print_bundle_summary(bundle: &Bundle) {
    println!("Repository: {}/{} ({})", bundle.owner, bundle.repo, bundle.branch);
    println!("  URL:       {}", bundle.github_url);
    println!("  Digest:    {}", bundle.digest);
    println!(
        "  Fetched:   {} of {} supporting file(s)",
        bundle.files.collected, bundle.files.attempted
    );
    if bundle.files.dropped() > 0 {
        println!("  Skipped:   {} file(s) could not be fetched", bundle.files.dropped());
    }

    match parse_bundle(&bundle.content) {
        Ok(files) => {
            println!();
            println!("  Files:");
            for file in &files {
                println!("    {:<48}  {:>8} bytes", file.filename, file.content.len());
            }
        }
        Err(e) => println!("  (bundle could not be parsed: {e})"),
    }
}

/// Print the outcome of a validation check.
pub fn print_validation(result: &Validated) {
    let verdict = if result.validated { "valid" } else { "not valid" };
    println!("{} ({verdict})", result.message);
    println!("  URL:    {}", result.github_url);
    println!("  Branch: {}", result.branch);
    for (key, value) in &result.meta {
        println!("  {:<12} {}", format!("{key}:"), truncate(value, 60));
    }
}

/// Print the files written by an install.
pub fn print_installed(paths: &[PathBuf]) {
    for path in paths {
        println!("  wrote {}", path.display());
    }
    println!("Installed {} file(s)", paths.len());
}

/// Truncate to at most `max_len` characters.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
