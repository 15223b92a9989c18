// src/proxy/routes.rs
// Inbound path matching. Segments are percent-decoded once, then used
// verbatim: nothing is re-escaped on the way out.

use hyper::Method;
use serde_json::Value;

pub const DEFAULT_PAGE: &str = "1";
pub const DEFAULT_QUERY: &str = "";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Popular { page: String },
    TopRated { page: String },
    Upcoming { page: String },
    Credits { movie_id: String },
    Actor { person_id: String },
    Similar { movie_id: String, page: String },
    Movie { movie_id: String },
    Search { query: String, page: String },
}

/// What part of the upstream bodies is sent back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extract {
    /// One top-level property of the first body.
    Field(&'static str),
    /// The first body as-is.
    Whole,
    /// Every body, as an array in call order.
    All,
}

impl Extract {
    /// `None` when the body has no such field; callers send that as an
    /// empty 200.
    pub fn apply(self, bodies: Vec<Value>) -> Option<Value> {
        match self {
            Extract::All => Some(Value::Array(bodies)),
            Extract::Whole => bodies.into_iter().next(),
            Extract::Field(name) => match bodies.into_iter().next()? {
                Value::Object(mut map) => map.remove(name),
                _ => None,
            },
        }
    }
}

/// One outbound call: resource path plus the route's own query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamCall {
    pub resource: String,
    /// Resource with ids blanked out, used as a metrics label.
    pub template: &'static str,
    pub params: Vec<(&'static str, String)>,
}

impl UpstreamCall {
    fn new(resource: String, template: &'static str) -> Self {
        Self {
            resource,
            template,
            params: Vec::new(),
        }
    }

    fn param(mut self, name: &'static str, value: &str) -> Self {
        self.params.push((name, value.to_string()));
        self
    }
}

impl Route {
    /// Match a request against the route table. `None` means 404.
    pub fn parse(method: &Method, path: &str) -> Option<Route> {
        if method != Method::GET && method != Method::HEAD {
            return None;
        }

        // Invalid UTF-8 after decoding matches nothing.
        let decoded = path
            .trim_start_matches('/')
            .split('/')
            .map(|segment| urlencoding::decode(segment).ok())
            .collect::<Option<Vec<_>>>()?;
        let segments: Vec<&str> = decoded.iter().map(|segment| &**segment).collect();
        let param = |i: usize| segments.get(i).copied().filter(|s| !s.is_empty());
        let page = |i: usize| param(i).unwrap_or(DEFAULT_PAGE).to_string();

        let route = match segments.as_slice() {
            [""] => Route::Popular { page: page(1) },
            ["toprated"] | ["toprated", _] => Route::TopRated { page: page(1) },
            ["upcoming"] | ["upcoming", _] => Route::Upcoming { page: page(1) },
            ["actors", _] => Route::Credits {
                movie_id: param(1)?.to_string(),
            },
            ["actor", _] => Route::Actor {
                person_id: param(1)?.to_string(),
            },
            ["similar", _] | ["similar", _, _] => Route::Similar {
                movie_id: param(1)?.to_string(),
                page: page(2),
            },
            ["movie", "search"] | ["movie", "search", _] | ["movie", "search", _, _] => {
                Route::Search {
                    query: param(2).unwrap_or(DEFAULT_QUERY).to_string(),
                    page: page(3),
                }
            }
            ["movie", _] => Route::Movie {
                movie_id: param(1)?.to_string(),
            },
            [_] => Route::Popular { page: page(0) },
            _ => return None,
        };

        Some(route)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Route::Popular { .. } => "popular",
            Route::TopRated { .. } => "toprated",
            Route::Upcoming { .. } => "upcoming",
            Route::Credits { .. } => "actors",
            Route::Actor { .. } => "actor",
            Route::Similar { .. } => "similar",
            Route::Movie { .. } => "movie",
            Route::Search { .. } => "search",
        }
    }

    /// Outbound calls for this route, in response order.
    pub fn calls(&self) -> Vec<UpstreamCall> {
        match self {
            Route::Popular { page } => {
                vec![UpstreamCall::new("movie/popular".into(), "movie/popular").param("page", page)]
            }
            Route::TopRated { page } => {
                vec![UpstreamCall::new("movie/top_rated".into(), "movie/top_rated").param("page", page)]
            }
            Route::Upcoming { page } => {
                vec![UpstreamCall::new("movie/upcoming".into(), "movie/upcoming").param("page", page)]
            }
            Route::Credits { movie_id } => vec![UpstreamCall::new(
                format!("movie/{}/credits", movie_id),
                "movie/{id}/credits",
            )],
            Route::Actor { person_id } => vec![
                UpstreamCall::new(format!("person/{}", person_id), "person/{id}"),
                UpstreamCall::new(
                    format!("person/{}/external_ids", person_id),
                    "person/{id}/external_ids",
                ),
                UpstreamCall::new(
                    format!("person/{}/movie_credits", person_id),
                    "person/{id}/movie_credits",
                ),
            ],
            Route::Similar { movie_id, page } => vec![UpstreamCall::new(
                format!("movie/{}/similar", movie_id),
                "movie/{id}/similar",
            )
            .param("page", page)],
            Route::Movie { movie_id } => {
                vec![UpstreamCall::new(format!("movie/{}", movie_id), "movie/{id}")]
            }
            Route::Search { query, page } => vec![UpstreamCall::new(
                "search/movie".into(),
                "search/movie",
            )
            .param("query", query)
            .param("page", page)],
        }
    }

    pub fn extract(&self) -> Extract {
        match self {
            Route::Credits { .. } => Extract::Field("cast"),
            Route::Movie { .. } => Extract::Whole,
            Route::Actor { .. } => Extract::All,
            _ => Extract::Field("results"),
        }
    }
}
