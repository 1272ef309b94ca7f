//! HTTP Handlers

mod audio;
mod flow;
mod ping;
mod playback;
mod websocket;

pub use audio::*;
pub use flow::*;
pub use ping::*;
pub use playback::*;
pub use websocket::*;
