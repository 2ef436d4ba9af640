pub mod chat_history_repository;
pub mod kv_store;
pub mod theme_repository;
