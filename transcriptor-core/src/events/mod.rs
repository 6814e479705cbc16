//! Backend event stream: wire records, classification and log loading.

mod classify;
pub mod log;
mod raw;

pub use classify::{classify, Event};
pub use log::{load_log, parse_log, EventLog};
pub use raw::{types, RawEvent};
