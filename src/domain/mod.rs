pub mod block_type;
pub mod error;
pub mod hour_window;
pub mod layout_config;
pub mod models;
pub mod mutation;
pub mod status;
pub mod time_codec;
pub mod time_range;
pub mod timeline;
