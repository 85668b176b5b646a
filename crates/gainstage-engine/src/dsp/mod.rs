pub mod clip;
pub mod filter;
pub mod gain;
pub mod scale;
