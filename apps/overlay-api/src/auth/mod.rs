pub mod extension;
pub mod middleware;
