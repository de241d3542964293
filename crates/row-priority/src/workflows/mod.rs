pub mod prioritization;
pub mod publication;
