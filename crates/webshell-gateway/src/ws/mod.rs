pub mod exec;
pub mod transport;
pub mod upgrade;
