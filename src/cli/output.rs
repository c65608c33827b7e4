//! Pretty and JSON rendering of command results.

use super::Context;
use console::{style, Term};
use media_hash_organizer::core::organize::OrganizeResult;
use media_hash_organizer::core::pipeline::{FileState, PlanEntry, RenameReport, ResolvedAction};
use media_hash_organizer::core::similar::SimilarResult;
use media_hash_organizer::core::stats::MetadataStats;
use serde_json::{json, Value};
use std::path::Path;

pub fn header(ctx: &Context, title: &str) {
    if !ctx.pretty() {
        return;
    }
    ctx.term
        .write_line(&format!(
            "{} {} {}",
            style("Media Organizer").bold().cyan(),
            style(format!("v{}", env!("CARGO_PKG_VERSION"))).dim(),
            style(format!("- {}", title)).dim()
        ))
        .ok();
    ctx.term.write_line("").ok();
}

pub fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => tracing::error!("Failed to render JSON: {}", e),
    }
}

/// Shorten paths under the home directory to `~/...`
fn display_path(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(rest) = path.strip_prefix(&home) {
            return format!("~/{}", rest.display());
        }
    }
    path.display().to_string()
}

fn row(term: &Term, label: &str, value: impl std::fmt::Display) {
    term.write_line(&format!("  {:<14} {}", label, value)).ok();
}

pub fn print_failures(term: &Term, failures: &[String]) {
    if failures.is_empty() {
        return;
    }
    term.write_line("").ok();
    term.write_line(&format!(
        "{}",
        style(format!("Failures ({}):", failures.len())).red().bold()
    ))
    .ok();
    for failure in failures {
        term.write_line(&format!("  {} {}", style("✗").red(), failure))
            .ok();
    }
}

fn state_label(state: FileState) -> &'static str {
    match state {
        FileState::Resolved(ResolvedAction::Rename) => "rename",
        FileState::Resolved(ResolvedAction::Remove) => "remove",
        FileState::Resolved(ResolvedAction::Move) => "move",
        FileState::Resolved(ResolvedAction::KeepUnchanged) => "unchanged",
        FileState::Skipped => "skipped",
        FileState::NoMetadataWarning => "no metadata",
        FileState::Failed => "failed",
        FileState::Cancelled => "cancelled",
        FileState::Discovered | FileState::PreparedRename => "pending",
    }
}

fn print_entry(term: &Term, entry: &PlanEntry) {
    let label = state_label(entry.state);
    let line = match (&entry.target, &entry.duplicate_of) {
        (Some(target), _) => format!(
            "    {:<10} {} {} {}",
            style(label).yellow(),
            display_path(&entry.source),
            style("→").dim(),
            display_path(target)
        ),
        (None, Some(kept)) => format!(
            "    {:<10} {} {}",
            style(label).red(),
            display_path(&entry.source),
            style(format!("(same as {})", display_path(kept))).dim()
        ),
        (None, None) => format!("    {:<10} {}", style(label).dim(), display_path(&entry.source)),
    };
    term.write_line(&line).ok();
}

pub fn print_rename(term: &Term, report: &RenameReport, verbose: bool) {
    let title = if report.dry_run {
        "Plan (dry run, nothing changed)"
    } else if report.cancelled {
        "Cancelled"
    } else {
        "Done"
    };
    term.write_line(&format!("{} {}", style("✓").green().bold(), title))
        .ok();
    term.write_line("").ok();

    let counts = &report.counts;
    row(term, "Files", style(report.total_files).cyan());
    row(term, "Renamed", style(counts.renamed).green());
    row(term, "Removed", style(counts.removed).red());
    row(term, "Moved", style(counts.moved).yellow());
    row(term, "Unchanged", counts.unchanged);
    row(term, "Skipped", counts.skipped);
    row(term, "No metadata", counts.no_metadata);
    row(term, "Failed", style(counts.failed).red());
    if counts.cancelled > 0 {
        row(term, "Cancelled", counts.cancelled);
    }
    row(
        term,
        "Duration",
        format!("{:.1}s", report.duration_ms as f64 / 1000.0),
    );

    let shown: Vec<&PlanEntry> = report
        .entries
        .iter()
        .filter(|e| {
            verbose
                || matches!(
                    e.state,
                    FileState::Resolved(ResolvedAction::Rename)
                        | FileState::Resolved(ResolvedAction::Remove)
                        | FileState::Resolved(ResolvedAction::Move)
                )
        })
        .collect();

    if (report.dry_run || verbose) && !shown.is_empty() {
        term.write_line("").ok();
        term.write_line(&format!("{}", style("Actions:").bold().underlined()))
            .ok();
        for entry in shown {
            print_entry(term, entry);
        }
    }

    if !report.no_metadata_images.is_empty() {
        term.write_line("").ok();
        term.write_line(&format!(
            "  {} image(s) without metadata; try {} to group them",
            style(report.no_metadata_images.len()).yellow(),
            style("--similar").bold()
        ))
        .ok();
    }

    if verbose && !report.warnings.is_empty() {
        term.write_line("").ok();
        term.write_line(&format!(
            "{}",
            style(format!("Warnings ({}):", report.warnings.len())).yellow().bold()
        ))
        .ok();
        for warning in &report.warnings {
            term.write_line(&format!("  {} {}", style("!").yellow(), warning))
                .ok();
        }
    }

    let failures: Vec<String> = report
        .scan_errors
        .iter()
        .map(ToString::to_string)
        .chain(report.errors.iter().map(ToString::to_string))
        .collect();
    print_failures(term, &failures);
}

pub fn rename_json(report: &RenameReport) -> Value {
    json!({
        "dry_run": report.dry_run,
        "cancelled": report.cancelled,
        "total_files": report.total_files,
        "counts": report.counts,
        "duration_ms": report.duration_ms,
        "entries": report.entries,
        "no_metadata_images": report.no_metadata_images,
        "warnings": report
            .warnings
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>(),
        "failures": report
            .scan_errors
            .iter()
            .map(ToString::to_string)
            .chain(report.errors.iter().map(ToString::to_string))
            .collect::<Vec<_>>(),
    })
}

pub fn print_organize(term: &Term, result: &OrganizeResult, verbose: bool) {
    let plan = &result.plan;
    let title = if result.dry_run {
        "Plan (dry run, nothing changed)"
    } else if result.cancelled {
        "Cancelled"
    } else {
        "Done"
    };
    term.write_line(&format!("{} {}", style("✓").green().bold(), title))
        .ok();
    term.write_line("").ok();

    row(term, "Files", style(plan.total_files).cyan());
    row(term, "Processed", style(result.files_processed).green());
    row(term, "Size", format_bytes(result.total_size_bytes));
    row(term, "Folders", result.folders_created);
    row(term, "Undated", plan.no_date_count);
    row(term, "Renamed", plan.conflict_count);
    row(term, "In place", plan.in_place);
    if let Some((earliest, latest)) = plan.date_range {
        row(term, "Dates", format!("{} .. {}", earliest, latest));
    }
    row(
        term,
        "Duration",
        format!("{:.1}s", result.duration_ms as f64 / 1000.0),
    );

    if !plan.by_year.is_empty() {
        term.write_line("").ok();
        term.write_line(&format!("{}", style("By year:").bold().underlined()))
            .ok();
        for year in &plan.by_year {
            term.write_line(&format!(
                "    {}  {:>6} files  {:>10}",
                style(year.year).cyan(),
                year.count,
                format_bytes(year.size_bytes)
            ))
            .ok();
        }
    }

    if result.dry_run || verbose {
        term.write_line("").ok();
        for file in &plan.files {
            term.write_line(&format!(
                "    {} {} {}",
                display_path(&file.source),
                style("→").dim(),
                display_path(&file.destination)
            ))
            .ok();
        }
    }

    let failures: Vec<String> = result
        .scan_errors
        .iter()
        .map(ToString::to_string)
        .chain(result.errors.iter().map(ToString::to_string))
        .collect();
    print_failures(term, &failures);
}

pub fn organize_json(result: &OrganizeResult) -> Value {
    json!({
        "dry_run": result.dry_run,
        "cancelled": result.cancelled,
        "plan": result.plan,
        "files_processed": result.files_processed,
        "folders_created": result.folders_created,
        "total_size_bytes": result.total_size_bytes,
        "duration_ms": result.duration_ms,
        "failures": result
            .scan_errors
            .iter()
            .map(ToString::to_string)
            .chain(result.errors.iter().map(ToString::to_string))
            .collect::<Vec<_>>(),
    })
}

pub fn print_similar(term: &Term, result: &SimilarResult) {
    term.write_line("").ok();
    term.write_line(&format!(
        "{} Compared {} of {} images in {:.1}s",
        style("✓").green().bold(),
        style(result.hashed_images).cyan(),
        result.total_images,
        result.duration_ms as f64 / 1000.0
    ))
    .ok();

    if result.groups.is_empty() {
        term.write_line("  No similar images found").ok();
    }

    for (i, group) in result.groups.iter().enumerate() {
        term.write_line("").ok();
        term.write_line(&format!(
            "  {} {} images, best match {:.1}%",
            style(format!("Group {}:", i + 1)).bold(),
            group.paths.len(),
            group.best_similarity
        ))
        .ok();
        for path in &group.paths {
            term.write_line(&format!("    {} {}", style("○").dim(), display_path(path)))
                .ok();
        }
    }

    let failures: Vec<String> = result.errors.iter().map(ToString::to_string).collect();
    print_failures(term, &failures);
}

pub fn similar_json(result: &SimilarResult) -> Value {
    json!({
        "total_images": result.total_images,
        "hashed_images": result.hashed_images,
        "duration_ms": result.duration_ms,
        "pairs": result.pairs,
        "groups": result.groups,
        "failures": result.errors.iter().map(ToString::to_string).collect::<Vec<_>>(),
    })
}

pub fn print_stats(term: &Term, stats: &MetadataStats, failures: &[String]) {
    let pct = |n: usize| {
        if stats.total == 0 {
            0.0
        } else {
            n as f64 / stats.total as f64 * 100.0
        }
    };

    row(term, "Files", style(stats.total).cyan());
    row(term, "Images", stats.images);
    row(term, "Videos", stats.videos);
    row(
        term,
        "Capture date",
        format!("{} ({:.0}%)", stats.with_created_at, pct(stats.with_created_at)),
    );
    row(
        term,
        "Camera model",
        format!("{} ({:.0}%)", stats.with_model, pct(stats.with_model)),
    );
    row(
        term,
        "GPS",
        format!("{} ({:.0}%)", stats.with_gps, pct(stats.with_gps)),
    );
    row(term, "No metadata", style(stats.without_metadata).yellow());
    row(term, "Hashed names", stats.hashed_names);
    row(term, "Coverage", format!("{:.1}%", stats.coverage()));

    let models = stats.top_models(10);
    if !models.is_empty() {
        term.write_line("").ok();
        term.write_line(&format!("{}", style("Top models:").bold().underlined()))
            .ok();
        for (model, count) in models {
            term.write_line(&format!("    {:>6}  {}", count, model)).ok();
        }
    }

    if !stats.by_year.is_empty() {
        term.write_line("").ok();
        term.write_line(&format!("{}", style("By year:").bold().underlined()))
            .ok();
        for (year, count) in stats.by_year.iter().rev() {
            term.write_line(&format!("    {}  {:>6}", style(year).cyan(), count))
                .ok();
        }
    }

    print_failures(term, failures);
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
