pub mod digest;
pub mod dispatch;
pub mod runtime;
pub mod scheduler;
pub mod subscription;
