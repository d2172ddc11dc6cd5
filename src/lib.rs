//! User management REST API: registration, login, bearer-token auth and
//! CRUD over user records.

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod password;
pub mod service;
pub mod state;
pub mod user_handlers;
pub mod validation;
