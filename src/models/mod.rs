pub mod business;
pub mod inbox;
pub mod message;
pub mod user;
