pub mod auth;
pub mod config;
pub mod console;
pub mod domain;
pub mod service;
pub mod sync;
pub mod titledate;
