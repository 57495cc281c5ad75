pub mod job_repo;
pub mod ticket_repo;

pub use job_repo::JobRepo;
pub use ticket_repo::TicketRepo;
