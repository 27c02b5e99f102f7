pub mod channel;
pub mod client;
pub mod event;

pub use channel::{OneBotChannel, OneBotResolver};
pub use client::OneBotClient;
