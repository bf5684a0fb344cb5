use crate::http::request::Request;
use crate::http::response::{Response, StatusCode};
use crate::http::router::PathParams;

/// `GET /`
pub fn root(_req: &Request, _params: &PathParams) -> Response {
    Response::empty(StatusCode::Ok)
}

/// `GET /echo/<text>`: the captured text as a plain text body.
pub fn echo(_req: &Request, params: &PathParams) -> Response {
    Response::text(params.get(0).unwrap_or_default())
}

/// `GET /user-agent`: the client's User-Agent header as the body.
pub fn user_agent(req: &Request, _params: &PathParams) -> Response {
    Response::text(req.header("user-agent").unwrap_or_default())
}
