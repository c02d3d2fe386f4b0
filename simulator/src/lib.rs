pub mod config;
pub mod init;
pub mod plugin;
pub mod rain;
