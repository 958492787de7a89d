pub mod auth;
pub mod error;
pub mod tasks;

pub use auth::{AuthService, TokenPair};
pub use error::{DomainError, DomainResult};
pub use tasks::TaskService;
