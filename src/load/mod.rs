pub mod csv_sink;
pub mod db_sink;

pub use csv_sink::{load_to_csv, read_csv};
pub use db_sink::load_to_db;
