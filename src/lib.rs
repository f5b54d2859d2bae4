pub mod archetype;
pub mod cache;
pub mod config;
pub mod export;
pub mod matching;
pub mod metrics;
pub mod normalize;
pub mod provider;
pub mod radar;
pub mod record;
pub mod scouting;
pub mod synthetic;
pub mod taxonomy;
