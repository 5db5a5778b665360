pub mod framework;
pub mod session;
pub mod tissue;
