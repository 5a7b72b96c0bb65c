pub mod checklist;
pub mod error;
pub mod inspection;
pub mod ports;
