pub mod chat;
pub mod sidebar;
