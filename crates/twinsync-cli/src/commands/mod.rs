pub mod common;
pub mod diff;
pub mod init;
pub mod pull;
pub mod push;
pub mod shell;

pub use common::CommandOptions;
pub use diff::Diff;
pub use init::Init;
pub use pull::Pull;
pub use push::Push;
pub use shell::Shell;
