/// Router Module Index
///
/// Organizes the application's routing into security-segregated modules so
/// access control is applied explicitly at the module level (via Axum
/// layers), preventing accidental exposure of protected endpoints.

/// Routes accessible without a token: liveness and the auth entry points.
pub mod public;

/// Routes protected by the `AuthUser` extractor middleware.
/// Requires a validated bearer token on every request.
pub mod authenticated;
