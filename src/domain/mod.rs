pub mod history;
pub mod indicators;
pub mod types;

pub use history::*;
pub use indicators::*;
pub use types::*;
