//! The bank-feed processing pipeline: normalize, detect duplicates,
//! classify, decide, persist

pub mod core;
pub mod decide;
pub mod duplicate;
pub mod normalize;
pub mod rules;

pub use self::core::*;
pub use decide::*;
pub use duplicate::*;
pub use normalize::*;
pub use rules::*;
