pub mod achievements;
pub mod activity;
pub mod clock;
pub mod engine;
pub mod level;
pub mod streak;
pub mod transfer;

pub use achievements::*;
pub use activity::*;
pub use clock::*;
pub use engine::*;
pub use level::*;
pub use streak::*;
pub use transfer::*;
