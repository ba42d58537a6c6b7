pub mod backend;
pub mod controller;

pub use backend::{
    ClipboardBackend, ClipboardError, ClipboardResult, MemoryClipboard, SystemClipboard,
};
pub use controller::ClipboardController;
