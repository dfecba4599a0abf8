pub mod init;
pub mod listener;
pub mod migrations;
