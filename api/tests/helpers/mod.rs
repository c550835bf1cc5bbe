pub mod app;
pub mod ws;

pub use app::{TestApp, make_test_app, send};
pub use ws::{connect_ws, spawn_server};
