//! Image naming: references, content hashes, resolution and registry lookups

pub mod hash;
pub mod reference;
pub mod registry;
pub mod resolve;
