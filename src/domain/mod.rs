pub mod job;
pub mod place;
