//! Renders core events as an indicatif progress bar.

use indicatif::{ProgressBar, ProgressStyle};
use media_hash_organizer::events::{
    CompareEvent, Event, EventReceiver, ExecuteEvent, MetadataEvent, PipelineEvent, ScanEvent,
};
use std::thread::{self, JoinHandle};
use std::time::Duration;

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓░")
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// Drain `receiver` on its own thread until every sender is gone.
///
/// With `visible` off the events are consumed silently.
pub fn spawn(receiver: EventReceiver, visible: bool, verbose: bool) -> JoinHandle<()> {
    thread::spawn(move || {
        let pb = if visible {
            let pb = ProgressBar::new_spinner();
            pb.set_style(spinner_style());
            pb.enable_steady_tick(Duration::from_millis(120));
            Some(pb)
        } else {
            None
        };

        for event in receiver.iter() {
            let Some(pb) = &pb else {
                continue;
            };
            render(pb, event, verbose);
        }

        if let Some(pb) = pb {
            pb.finish_and_clear();
        }
    })
}

fn restart(pb: &ProgressBar, total: usize, message: &str) {
    pb.set_style(bar_style());
    pb.set_length(total as u64);
    pb.set_position(0);
    pb.set_message(message.to_string());
}

fn render(pb: &ProgressBar, event: Event, verbose: bool) {
    match event {
        Event::Pipeline(PipelineEvent::PhaseChanged { phase }) => {
            pb.set_message(format!("{}", phase));
        }
        Event::Pipeline(PipelineEvent::Cancelled) => {
            pb.println("Cancelled, completed operations are kept");
        }
        Event::Scan(ScanEvent::Progress(p)) => {
            pb.set_message(format!(
                "Scanning: {} files in {} folders",
                p.files_found, p.directories_scanned
            ));
        }
        Event::Scan(ScanEvent::Error { path, message }) if verbose => {
            pb.println(format!("  skipped {}: {}", path.display(), message));
        }
        Event::Metadata(MetadataEvent::Started { total_files }) => {
            restart(pb, total_files, "Reading metadata");
        }
        Event::Metadata(MetadataEvent::Progress(p)) => {
            pb.set_position(p.completed as u64);
            if verbose {
                pb.set_message(format!(
                    "{} (cache: {})",
                    p.current_path.file_name().unwrap_or_default().to_string_lossy(),
                    p.cache_hits
                ));
            }
        }
        Event::Execute(ExecuteEvent::Started {
            total_actions,
            dry_run,
        }) => {
            restart(
                pb,
                total_actions,
                if dry_run { "Planning (dry run)" } else { "Applying" },
            );
        }
        Event::Execute(ExecuteEvent::Applied {
            completed, source, ..
        }) => {
            pb.set_position(completed as u64);
            if verbose {
                pb.set_message(format!(
                    "{}",
                    source.file_name().unwrap_or_default().to_string_lossy()
                ));
            }
        }
        Event::Execute(ExecuteEvent::Failed { path, message }) if verbose => {
            pb.println(format!("  failed {}: {}", path.display(), message));
        }
        Event::Compare(CompareEvent::Started { total_images, .. }) => {
            restart(pb, total_images, "Fingerprinting images");
        }
        Event::Compare(CompareEvent::Hashed { completed, .. }) => {
            pb.set_position(completed as u64);
        }
        _ => {}
    }
}
