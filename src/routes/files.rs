//! Static file routes rooted at a configured directory.

use std::io::{ErrorKind, Write};
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use crate::http::request::Request;
use crate::http::response::{Response, ResponseBuilder, StatusCode};
use crate::http::router::PathParams;

/// Reads and writes files below `root`.
///
/// File I/O is plain blocking I/O on the calling task.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves `name` under the root, refusing anything that could
    /// escape it.
    fn resolve(&self, name: &str) -> Option<PathBuf> {
        let relative = Path::new(name);
        let mut components = relative.components().peekable();
        components.peek()?;
        if components.all(|c| matches!(c, Component::Normal(_))) {
            Some(self.root.join(relative))
        } else {
            None
        }
    }

    /// `GET /files/<name>`
    pub fn serve(&self, req: &Request, params: &PathParams) -> Response {
        let Some(path) = params.get(0).and_then(|name| self.resolve(name)) else {
            debug!(path = %req.url, "Refusing file name outside the root");
            return Response::not_found();
        };

        let file = match std::fs::File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Response::not_found(),
            Err(e) => {
                warn!(file = %path.display(), error = %e, "Failed to open file");
                return Response::internal_error();
            }
        };

        let metadata = match file.metadata() {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "Failed to stat file");
                return Response::internal_error();
            }
        };

        if !metadata.is_file() {
            return Response::not_found();
        }

        ResponseBuilder::new(StatusCode::Ok)
            .header("Content-Type", "application/octet-stream")
            .file(tokio::fs::File::from_std(file), metadata.len())
            .build()
    }

    /// `POST /files/<name>`: creates or overwrites the file with the body.
    pub fn store(&self, req: &Request, params: &PathParams) -> Response {
        let Some(path) = params.get(0).and_then(|name| self.resolve(name)) else {
            debug!(path = %req.url, "Refusing file name outside the root");
            return Response::not_found();
        };

        let written = std::fs::File::create(&path).and_then(|mut file| {
            file.write_all(&req.body)?;
            file.flush()
        });

        match written {
            Ok(()) => {
                debug!(file = %path.display(), bytes = req.body.len(), "Stored file");
                Response::empty(StatusCode::Created)
            }
            Err(e) => {
                warn!(file = %path.display(), error = %e, "Failed to write file");
                Response::internal_error()
            }
        }
    }
}
