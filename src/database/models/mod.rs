pub mod movie;
pub mod permission;
pub mod token;
pub mod user;

pub use movie::{Movie, MovieQuery, NewMovie, Runtime};
pub use permission::Permissions;
pub use token::{Scope, TokenRecord};
pub use user::{validate_email, validate_name, validate_password, NewUser, User};
