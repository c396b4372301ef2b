pub mod auth;
pub mod email;
pub mod finance;
pub mod media;
pub mod metrics;
pub mod persons;
pub mod photos;
pub mod storage;
pub mod trips;
