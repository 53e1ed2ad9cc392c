pub mod chunking;
pub mod commands;
pub mod config;
pub mod error;
pub mod flatten;
pub mod flow;
pub mod props;
pub mod text;
pub mod timestamps;
pub mod validation;
