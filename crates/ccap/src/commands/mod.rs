pub mod build;
pub mod delta_q;
pub mod deploy;
pub mod dev;
pub mod init;
pub mod make;
pub mod serve;
