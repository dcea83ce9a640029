pub mod api;
pub mod cache;
pub mod cancellation;
pub mod config;
pub mod error;
pub mod page;
pub mod playback;
pub mod poller;
pub mod runtime;
pub mod segmenter;
pub mod sidebar;
pub mod timeline;
