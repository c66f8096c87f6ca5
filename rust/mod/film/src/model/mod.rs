mod catalog;
mod film;
mod review;
mod user;

pub use catalog::*;
pub use film::*;
pub use review::*;
pub use user::*;
