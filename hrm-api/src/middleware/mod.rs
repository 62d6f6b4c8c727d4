/// Middleware for the API server
///
/// - `security`: security response headers
///
/// Bearer authentication lives in `hrm_shared::auth::middleware` and is
/// wired in `app`.

pub mod security;
