pub mod chat_service;
pub mod conversation_service;
pub mod inbox_service;
pub mod jwt_service;
