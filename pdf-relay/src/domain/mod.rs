// pdf-relay/src/domain/mod.rs
pub mod document;
pub mod share_link;
