//! iCalendar export for Better Together community events.
//!
//! This crate converts the platform's schedulable records into RFC 5545
//! documents that Google Calendar, Outlook and Apple Calendar import as-is:
//! - `ics` module for formatting, VTIMEZONE, VEVENT and document generation
//! - `schedulable` for the input model
//! - `i18n` for the strings embedded in descriptions and reminders

pub mod error;
pub mod i18n;
pub mod ics;
pub mod schedulable;

pub use error::{IcsError, IcsResult};
pub use i18n::{Catalog, Translator};
pub use ics::{ChronoTzProvider, Generator, TimezoneProvider, generate_ics};
pub use schedulable::{Description, Recurrence, Schedulable, Schedule};
