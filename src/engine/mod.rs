pub mod filter;
pub mod predictor;
pub mod stats;

pub use predictor::{PredictionQuery, PredictionResult, Predictor, DEFAULT_WINDOWS};
pub use stats::Trend;
