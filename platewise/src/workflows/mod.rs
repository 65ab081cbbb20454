//! Operations spanning more than one collection or command.

pub mod accounts;
pub mod catalog;
pub mod engagement;

pub use accounts::{LoginRequest, login};
pub use engagement::{
    CounterSynchronizer, FavoriteAction, FavoriteRequest, FavoriteToggle, LikeAction, LikeRegister, LikeRequest,
    LikeToggle,
};
