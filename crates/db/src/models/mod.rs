pub mod job;
pub mod ticket;
