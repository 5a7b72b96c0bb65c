pub mod checklist_repository;
pub mod connection;
