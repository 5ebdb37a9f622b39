mod auth;
mod health_check;
mod users;

pub use auth::refresh;
pub use health_check::health_check;
pub use users::{delete_user, edit_user, list_users, login, register, search_users};
