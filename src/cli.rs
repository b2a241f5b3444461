pub mod containers;
pub mod detach_keys;
pub mod session;
pub mod start;

pub use containers::{ContainerCommand, RmArgs, StopArgs};
pub use session::{Session, finish, finish_to};
pub use start::StartArgs;
