//! Dry-signal generators implementing `rodio::Source`
//!
//! All of them are mono and run forever unless stated otherwise.

mod constant;
mod impulse;
mod noise;

pub use self::constant::Constant;
pub use self::impulse::Impulse;
pub use self::noise::Noise;
