pub mod downsampling;
pub mod filter;
pub mod noise;
pub mod normalizer;
pub mod statistics;
