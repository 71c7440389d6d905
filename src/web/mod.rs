//! Web server module
//!
//! Search form, result pages, filtering and downloads over HTTP. Each
//! visitor gets a session identified by the `duck_session` cookie.

mod handlers;
mod routes;
mod state;
mod templates;

pub use handlers::{SessionView, TableView, SESSION_COOKIE};
pub use routes::create_router;
pub use state::AppState;
pub use templates::Templates;
