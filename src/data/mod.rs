pub mod cache;
pub mod fetcher;

pub use cache::*;
pub use fetcher::*;
