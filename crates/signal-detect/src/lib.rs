//! Statistical anomaly detection and chart pattern recognition.
//!
//! Both detectors are pure functions over rolling candle windows: they hold
//! no state, never fail, and report "insufficient data" below their minimum
//! sample sizes instead of erroring.

pub mod anomaly;
pub mod pattern;

pub use anomaly::{Anomaly, AnomalyConfig, AnomalyDetector, AnomalyKind, AnomalyReport, Severity};
pub use pattern::{Bias, ChartPattern, PatternConfig, PatternDetector, PatternKind};
