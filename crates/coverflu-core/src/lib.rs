pub mod config;
pub mod error;
pub mod observer;
pub mod scroll;
pub mod tiles;
pub mod view;

pub use config::AppConfig;
pub use error::{Error, Result};
pub use observer::{NoopObserver, ScrollObserver, ViewEvent};
pub use view::{CoverFlowView, Frame, TileDraw};
