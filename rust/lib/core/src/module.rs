use axum::Router;

/// A service module that contributes HTTP routes.
///
/// Each business module (auth, contracts) implements this trait to
/// register its API endpoints. The server binary collects all modules
/// and nests their routes under `/api`.
pub trait Module: Send + Sync {
    /// Module name, used for logging.
    fn name(&self) -> &str;

    /// Routes that must be reachable without a bearer token.
    fn public_routes(&self) -> Router {
        Router::new()
    }

    /// Routes that require an authenticated [`crate::CurrentUser`].
    fn routes(&self) -> Router;
}
