// Contract value analytics: joins player production with contract cost and
// scores each player-season against its position group.

pub mod aggregate;
pub mod config;
pub mod contracts;
pub mod export;
pub mod merge;
pub mod pipeline;
pub mod positions;
pub mod record;
pub mod scoring;
pub mod sources;
