//! # Media Hash Organizer
//!
//! Names photos and videos after what they are, not what the camera called them.
//!
//! ## Core Philosophy
//! - **Deterministic names** - The same capture always gets the same name
//! - **Duplicates by identity** - Equal name and size means the same file
//! - **Nothing silent** - Every skipped, removed or failed file is reported
//!
//! ## Architecture
//! - `core` - The organizing engine
//! - `events` - Event-driven progress reporting
//! - `error` - User-facing error types
//! - `cli` - Command-line interface (binary only)

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{OrganizerError, Result};

/// Initialize tracing for the library
///
/// This should be called by the application entry point. `RUST_LOG` wins;
/// otherwise `default_level` applies to this crate.
pub fn init_tracing(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("media_hash_organizer={}", default_level))
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
