// pdf-relay/src/service/mod.rs
pub mod drive_service;
pub mod email_service;
pub mod merge_service;
pub mod relay_service;
