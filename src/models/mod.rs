pub mod oauth2_client;
pub mod session;
pub mod task;
pub mod user;

pub use oauth2_client::{CreateClientRequest, NewClient, OAuth2Client};
pub use session::Session;
pub use task::{Task, TaskInput, TaskPriority, TaskQuery, TaskStatus};
pub use user::{NewUser, User, UserResponse};
