//! Historical candle loading.

mod csv_source;

pub use csv_source::CsvSource;

use signal_core::error::DataError;
use signal_core::types::Candle;

/// Load candles from a CSV file, sorted oldest to newest.
pub fn load_csv(path: &str) -> Result<Vec<Candle>, DataError> {
    CsvSource::new(path)?.load_all()
}
