mod constants;
mod game;
mod league;
mod pick;
mod standing;
mod team;
mod user;

pub use constants::*;
pub use game::*;
pub use league::*;
pub use pick::*;
pub use standing::*;
pub use team::*;
pub use user::*;
