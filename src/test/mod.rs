mod engine;
pub mod utils;

pub use utils::test_utils;
