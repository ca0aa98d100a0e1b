pub mod config;
pub mod error;
pub mod models;
pub mod registry;
pub mod source;
pub mod task;
pub mod validator;
