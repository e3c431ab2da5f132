pub mod headers;
pub mod session;
