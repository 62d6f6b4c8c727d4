/// API route handlers
///
/// Handlers are thin: extract, call one service operation, wrap the result
/// in the `{ success: true, ... }` envelope. Authorization and validation
/// happen in `hrm_shared::services`.
///
/// - `health`: liveness and database status
/// - `auth`: login, token refresh, profile
/// - `teams`: team CRUD and roster management
/// - `holidays`: holiday calendar
/// - `departments`: department directory
/// - `users`: user administration

pub mod auth;
pub mod departments;
pub mod health;
pub mod holidays;
pub mod teams;
pub mod users;
