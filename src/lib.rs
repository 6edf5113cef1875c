pub mod cli;
pub mod config;
pub mod crud;
pub mod database;
pub mod error;
