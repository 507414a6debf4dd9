pub mod csv_loader;
pub mod endnote_loader;

pub use csv_loader::{load_records_csv, write_records_csv};
pub use endnote_loader::{load_export, parse_export};
