pub mod status_models;

pub use status_models::*;
