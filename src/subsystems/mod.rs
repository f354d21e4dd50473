mod order_listener;
mod web_server;

pub use order_listener::{ORDER_CHANGES_CHANNEL, OrderListener, relay};
pub use web_server::{WebServer, router};
