pub mod prelude;

pub mod commanders;
pub mod games;
pub mod users;
