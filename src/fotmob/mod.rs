pub mod client;
pub mod normalize;
pub mod provider;

pub use client::FotMob;
pub use normalize::normalize_snapshot;
pub use provider::FeedProvider;
