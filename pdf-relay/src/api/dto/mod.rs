// pdf-relay/src/api/dto/mod.rs
pub mod relay_dto;
