pub mod capability;
pub mod dto;
pub mod error;
pub mod model;
pub mod service;
pub mod transfer;
