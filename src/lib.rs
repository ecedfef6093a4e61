pub mod clean;
pub mod cluster;
pub mod config;
pub mod embed;
pub mod pca;
pub mod pipeline;
pub mod plot;
pub mod select;
pub mod source;
pub mod utils;

pub use config::Opts;
