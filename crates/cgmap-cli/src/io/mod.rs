pub mod parameters;
pub mod samples;
