mod accounts;
mod health;
mod redirect;
mod url;

pub use accounts::current_user_handler;
pub use health::health_handler;
pub use redirect::redirect_handler;
pub use url::{analytics_handler, create_url_handler, delete_url_handler, list_urls_handler};
