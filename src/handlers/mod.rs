pub mod chat_handlers;
pub mod inbox_handlers;
