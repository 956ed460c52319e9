pub mod delivery;
pub mod handlers;
pub mod id_token;
pub mod middleware;
pub mod models;
pub mod service;
pub mod verification;
