//! Engine dispatch macros.
//!
//! Generates the per-backend match over `AsyncEngine` so callers stay linear.

/// Macro for generating `AsyncEngine` dispatch match arms.
///
/// # Example
///
/// ```ignore
/// impl_db_dispatch!(engine, {
///     MySql(p) => do_mysql(p),
///     Postgres(p) => do_postgres(p),
///     SQLite(p) => do_sqlite(p),
/// });
/// ```
#[macro_export]
macro_rules! impl_db_dispatch {
    ($engine:expr, { $($variant:ident($p:ident) => $body:expr),+ $(,)? }) => {
        match $engine {
            $(
                $crate::db::engine::AsyncEngine::$variant($p) => $body,
            )+
        }
    };
}

pub use impl_db_dispatch;
