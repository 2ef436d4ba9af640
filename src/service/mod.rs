pub mod chat_service;
pub mod theme_service;
