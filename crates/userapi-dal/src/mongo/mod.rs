//! MongoDB backend.

mod driver;

pub use driver::{MongoUserDataDriver, ACCOUNT_ID_INDEX};
