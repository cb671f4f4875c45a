// handlers/protected/mod.rs - Endpoints behind the access-control chain
//
// Every route here is declared with a required permission; see routes.rs.

pub mod movies;
