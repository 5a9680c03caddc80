pub mod health;
pub use self::health::health;

pub mod pages;
pub use self::pages::not_found;
