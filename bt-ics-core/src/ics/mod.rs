//! ICS file generation.
//!
//! This module turns schedulables into RFC 5545 documents: value
//! formatting, VTIMEZONE derivation, VEVENT building and the calendar
//! envelope around them.

pub mod event;
pub mod formatter;
mod generate;
pub mod timezone;

pub use generate::{Generator, PRODUCT_ID, generate_filename, generate_ics};
pub use timezone::{ChronoTzProvider, TimezoneProvider, Transition, build_vtimezone};
