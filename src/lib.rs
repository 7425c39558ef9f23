pub mod api;
pub mod auth;
pub mod db;
pub mod error;
pub mod evidence;
pub mod models;
pub mod services;
pub mod state;

#[cfg(test)]
pub(crate) mod testutil;
