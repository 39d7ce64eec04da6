//! Client side of the message board: the HTTP store, the renderer and the
//! controller that ties them to a display surface.

pub mod controller;
pub mod error;
pub mod render;
pub mod store;

pub use controller::{
    BoardController, BoardView, ListOutcome, Notice, SubmitControl, SubmitOutcome, UiState,
};
pub use error::{ConfigError, FetchError, SubmitError};
pub use render::{RenderedFragment, Renderer};
pub use store::{Endpoint, HttpMessageStore, MessageStore, StoreConfig, SubmitEncoding};
