pub mod replay;
pub mod validation;

pub use replay::*;
pub use validation::*;
