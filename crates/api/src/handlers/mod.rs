pub mod jobs;
pub mod tickets;
pub mod webhooks;
