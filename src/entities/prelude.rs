pub use super::commanders::Entity as Commanders;
pub use super::games::Entity as Games;
pub use super::users::Entity as Users;
