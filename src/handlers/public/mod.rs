// handlers/public/mod.rs - Endpoints reachable without a principal
//
// Account creation and activation, token acquisition, and the healthcheck.

pub mod healthcheck;
pub mod tokens;
pub mod users;
