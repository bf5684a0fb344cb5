//! The server's route table.
//!
//! | Method | Pattern          | Handler                 |
//! |--------|------------------|-------------------------|
//! | GET    | `^/echo/(.+)$`   | [`basic::echo`]         |
//! | GET    | `^/$`            | [`basic::root`]         |
//! | GET    | `^/user-agent$`  | [`basic::user_agent`]   |
//! | GET    | `^/files/(.+)$`  | [`files::FileStore::serve`] |
//! | POST   | `^/files/(.+)$`  | [`files::FileStore::store`] |

pub mod basic;
pub mod files;

use std::path::PathBuf;
use std::sync::Arc;

use crate::http::router::Router;
use files::FileStore;

/// Builds the route table, serving files from `directory`.
pub fn build_router(directory: impl Into<PathBuf>) -> anyhow::Result<Router> {
    let store = Arc::new(FileStore::new(directory));
    let mut router = Router::new();

    router
        .register("GET", "^/echo/(.+)$", basic::echo)?
        .register("GET", "^/$", basic::root)?
        .register("GET", "^/user-agent$", basic::user_agent)?;

    let reader = store.clone();
    router.register("GET", "^/files/(.+)$", move |req, params| {
        reader.serve(req, params)
    })?;
    router.register("POST", "^/files/(.+)$", move |req, params| {
        store.store(req, params)
    })?;

    Ok(router)
}
