pub mod database;
pub mod offline;
pub mod remote;
pub mod session;
