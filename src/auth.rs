//! Session state, token models, and the callback contracts the client consumes.

pub mod callbacks;
pub mod claims;
pub mod secret;
pub mod state;

pub use callbacks::*;
pub use claims::*;
pub use secret::*;
pub use state::*;
