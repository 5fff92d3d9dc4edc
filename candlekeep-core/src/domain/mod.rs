//! Domain types shared by adapters, the fetcher and the store.

pub mod bar;
pub mod interval;
pub mod request;

pub use bar::{day_start_ms, Bar, DAY_MS};
pub use interval::{Interval, ParseIntervalError};
pub use request::{FetchRequest, PageLimit};
