//! Trained model parameters as handed to the exporter.

mod snapshot;
mod state_file;

pub use snapshot::{MAX_STATE, MIN_STATE, ModelParams, ModelSnapshot, Polarity, ShapeOrRangeError};
pub use state_file::{ModelStateFile, StateFileError, load_model_state};
