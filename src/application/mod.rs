pub mod auth_service;
pub mod restaurant_service;
