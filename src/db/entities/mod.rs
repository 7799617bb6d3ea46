pub mod artist;
pub mod release;
pub mod user;

pub use artist::Entity as Artist;
pub use release::Entity as Release;
pub use user::Entity as User;
