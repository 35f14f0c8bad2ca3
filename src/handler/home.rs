use crate::handler::default::Reply;
use crate::handler::exchange::Exchange;
use crate::http::response::{Response, StatusCode};

/// Redirects a bare `/` to the default page.
///
/// Returns `None` for any other URL so the chain moves on.
pub fn home_page_redirect(exchange: &Exchange, default_page: &str) -> Option<Reply> {
    if exchange.url.is_empty() || exchange.url == "/" {
        return Some(Reply::Done {
            response: Response::redirect(default_page),
            status: StatusCode::Found,
        });
    }
    None
}
