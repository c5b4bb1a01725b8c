pub mod id;

pub use id::{ChannelId, ViewerId};
