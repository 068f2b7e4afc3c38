//! # Events Module
//!
//! One-directional progress reporting from a batch worker to a UI.
//!
//! ## Design
//! The worker pushes events into a channel; the interactive side drains
//! it on its own schedule and never blocks waiting on the worker.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//! let handle = spawn_worker(pipeline, sender)?;
//!
//! loop {
//!     for event in receiver.drain() {
//!         match event {
//!             Event::Progress(p) => println!("{}/{} {}", p.processed, p.total, p.status),
//!             Event::Completed(result) => println!("{} copied", result.success_count()),
//!             Event::Failed { message } => eprintln!("{}", message),
//!         }
//!     }
//!     std::thread::sleep(POLL_INTERVAL);
//! }
//! ```

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::*;
