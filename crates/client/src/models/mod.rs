//! Domain models exchanged with the backend.

pub mod product;
pub mod user;

pub use product::Product;
pub use user::UserProfile;
