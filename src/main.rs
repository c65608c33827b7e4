//! # media-organizer CLI
//!
//! Command-line interface for the media organizer.
//!
//! ## Usage
//! ```bash
//! media-organizer rename-by-meta ~/Photos --dry-run
//! media-organizer --output json find-same ~/Photos --threshold 95
//! ```

mod cli;

use media_hash_organizer::Result;

fn main() -> Result<()> {
    cli::run()
}
