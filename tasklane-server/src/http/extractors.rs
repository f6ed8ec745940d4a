//! Custom Axum extractors

use std::convert::Infallible;

use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;

use super::error::ApiError;
use crate::models::PageRequest;

/// JSON body whose decode failures render as the 400 error envelope
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

/// `?page=&perPage=&search=` of list endpoints.
///
/// Never rejects: values stay raw strings so a bad number falls back to its
/// default, a repeated key keeps its first value and unknown keys are ignored.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ListParams {
    page: Option<String>,
    per_page: Option<String>,
    search: Option<String>,
}

impl<S: Send + Sync> FromRequestParts<S> for ListParams {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_query(parts.uri.query().unwrap_or_default()))
    }
}

impl ListParams {
    pub fn from_query(query: &str) -> Self {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query).unwrap_or_default();
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "page" => &mut params.page,
                "perPage" => &mut params.per_page,
                "search" => &mut params.search,
                _ => continue,
            };
            slot.get_or_insert(value);
        }
        params
    }

    pub fn page_request(&self) -> PageRequest {
        PageRequest::from_query(self.page.as_deref(), self.per_page.as_deref())
    }

    pub fn search(&self) -> &str {
        self.search.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, StatusCode};
    use axum::response::IntoResponse;

    #[derive(Debug, serde::Deserialize)]
    struct Payload {
        #[allow(dead_code)]
        title: String,
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let req = Request::builder()
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"title\":"))
            .unwrap();

        let Err(err) = JsonBody::<Payload>::from_request(req, &()).await else {
            panic!("expected a rejection");
        };
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn list_params_default_and_parse() {
        let params = ListParams::from_query("page=x&perPage=25");
        assert_eq!(params.page_request(), PageRequest::new(1, 25));
        assert_eq!(params.search(), "");
    }

    #[test]
    fn repeated_key_keeps_first_value() {
        let params = ListParams::from_query("page=2&page=3&perPage=1&perPage=x&search=a&search=b");
        assert_eq!(params.page_request(), PageRequest::new(2, 1));
        assert_eq!(params.search(), "a");
    }

    #[test]
    fn search_is_percent_decoded() {
        let params = ListParams::from_query("search=buy%20milk&other=1");
        assert_eq!(params.search(), "buy milk");
        assert_eq!(ListParams::from_query(""), ListParams::default());
    }
}
