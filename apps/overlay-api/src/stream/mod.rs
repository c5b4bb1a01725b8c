pub mod announce;
pub mod events;
pub mod queue;
pub mod replay;
pub mod router;
pub mod server;
pub mod session;
