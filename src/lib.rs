pub mod config;
pub mod error;
pub mod gateway_state;
pub mod io_struct;
pub mod server;
pub mod upstream;
