/// Azure CLI backed operations on a private AKS cluster
pub mod auth;
pub mod cluster;
pub mod command;
pub mod invocation;
pub mod scanner;

pub use cluster::{LifecycleAction, LifecycleOutcome};
pub use command::CommandDispatcher;
pub use invocation::{CommandOptions, CommandSpec, InvocationBuilder};
pub use scanner::FileReferenceScanner;
