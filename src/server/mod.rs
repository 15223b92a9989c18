// src/server/mod.rs
pub mod builder;
pub mod handler;
mod listener;

pub use builder::ServerBuilder;
pub use handler::RequestHandler;
pub use listener::bind_tcp;
