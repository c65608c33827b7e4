//! # Events Module
//!
//! Progress reporting that stays out of the algorithms.
//!
//! ## Design
//! Stages receive an [`EventSender`] and push events into it. Whoever holds the
//! receiver (the CLI, a test) decides how to render them.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         if let Event::Metadata(MetadataEvent::Progress(p)) = event {
//!             println!("Read {}/{}", p.completed, p.total);
//!         }
//!     }
//! });
//!
//! pipeline.run_with_events(&sender)?;
//! ```

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender, ProgressCounter};
pub use types::*;
