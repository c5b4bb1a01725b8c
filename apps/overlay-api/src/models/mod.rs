pub mod item;
pub mod ownership;
