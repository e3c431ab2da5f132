pub mod approval;
pub mod dashboard;
pub mod request;
