pub mod fit;
pub mod mapping;
