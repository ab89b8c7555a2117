pub mod command;
pub mod resolver;
pub mod runtime;

pub use command::{CommandOutput, CommandRunner, SystemCommandRunner};
pub use resolver::{RuntimeCandidate, RuntimeResolver, RuntimeSearch};
pub use runtime::required_java_major;
