// Interface de bibliotheque du routeur a etat de liens.

pub mod config;
pub mod control;
pub mod dijkstra;
pub mod error;
pub mod interface;
pub mod lsdb;
pub mod route;
pub mod router;
pub mod timer;
pub mod transport;
pub mod types;
pub mod wire;

pub use error::AppError;
