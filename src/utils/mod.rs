pub mod logging;
pub mod time;

pub use time::parse_entry_date;
