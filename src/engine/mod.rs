pub mod analysis;
pub mod intent;
pub mod predictor;
pub mod synthesizer;
pub mod views;

pub use analysis::*;
pub use intent::*;
pub use predictor::*;
pub use synthesizer::*;
pub use views::*;
