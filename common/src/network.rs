pub mod host;
pub mod interface;
pub mod prefix;
pub mod target;
