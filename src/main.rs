//! # media-organize CLI
//!
//! Command-line interface for the media organizer.
//!
//! ## Usage
//! ```bash
//! media-organize organize ~/Camera ~/Pictures/Sorted
//! media-organize organize ~/Camera ~/Pictures/Sorted --move --verify --review
//! media-organize inspect ~/Camera/IMG_0001.JPG
//! ```

mod cli;

use media_organizer::Result;

fn main() -> Result<()> {
    cli::run()
}
