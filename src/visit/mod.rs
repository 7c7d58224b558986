pub mod cookie;
pub mod service;

pub use cookie::{create_visitor_cookie, get_visitor_cookie};
pub use service::VisitService;
