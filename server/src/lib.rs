// HTTP boundary for the shelf catalog:
// - Session cookie binding
// - Routes, handlers and error mapping

pub mod http_server;
pub mod session_cookie;
