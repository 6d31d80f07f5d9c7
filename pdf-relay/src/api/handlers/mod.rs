// pdf-relay/src/api/handlers/mod.rs
pub mod relay_handler;
pub mod system_handler;
