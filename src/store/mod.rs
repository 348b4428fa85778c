pub mod keys;
pub mod schema;
pub mod store;

pub use keys::*;
pub use schema::*;
pub use store::*;
