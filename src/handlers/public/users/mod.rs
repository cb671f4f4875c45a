// handlers/public/users/mod.rs - Account lifecycle

pub mod activate;
pub mod register;

pub use activate::activate_user;
pub use register::register_user;
