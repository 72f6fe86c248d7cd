pub mod capability;
pub mod catalog;
pub mod error;
pub mod session;
pub mod shared_wizard;
pub mod submission_wizard;
