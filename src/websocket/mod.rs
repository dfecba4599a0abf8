pub mod change_feed;
pub mod handlers;
pub mod types;
