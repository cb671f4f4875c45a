pub mod password;
pub mod principal;
pub mod tokens;

pub use password::{BcryptHasher, PasswordHasher};
pub use principal::Principal;
pub use tokens::{Token, TokenError, TokenService, TOKEN_LEN};
