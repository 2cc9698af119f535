mod migrate;
mod server;

pub use migrate::{migrate, reset};
pub use server::{build_state, serve};
