pub mod config;
pub mod render;
pub mod route;
pub mod serve;
