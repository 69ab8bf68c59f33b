pub mod api;
pub mod config;
pub mod error;
pub mod gamification;
pub mod server;
pub mod state;
pub mod types;
pub mod util;

#[cfg(test)]
mod test_support;
