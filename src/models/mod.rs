// --- Domain Models ---
mod task;
mod user;

// --- Request/Response DTOs ---
mod dto;

pub use dto::{
    Claims, ListTasksQuery, LoginRequest, RefreshRequest, RegisterRequest, SetActiveRequest,
    StatusUpdate, TaskResponse, Token, UserPublic,
};
pub use task::{NewTask, Task, TaskPatch, TaskStatus};
pub use user::{NewUser, Role, User};
