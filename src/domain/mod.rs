pub mod error;
pub mod repository;
pub mod restaurant;
pub mod user;
pub mod validation;
