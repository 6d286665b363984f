pub mod identity;
pub mod record;
pub mod format;
pub mod sink;
pub mod shipper;
pub mod http_queue;
pub mod layer;

pub mod init;
pub mod env;
pub mod noop_sink;
