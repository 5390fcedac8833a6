pub mod connect;
pub mod options;
pub mod tcp;
