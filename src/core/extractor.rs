use axum::{
    body::Body,
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Query, Request},
    http::{header, request::Parts},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize};
use std::convert::Infallible;
use validator::Validate;

use crate::core::error::AppError;

/// JSON extractor that rejects malformed bodies and failed presence checks with a 400
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request<Body>, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(json_rejection_to_error)?;

        value
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        Ok(Self(value))
    }
}

fn json_rejection_to_error(rejection: JsonRejection) -> AppError {
    let message = match rejection {
        JsonRejection::JsonDataError(err) => format!("Invalid JSON data: {}", err),
        JsonRejection::JsonSyntaxError(err) => format!("Invalid JSON syntax: {}", err),
        JsonRejection::MissingJsonContentType(err) => {
            format!("Missing JSON content type: {}", err)
        }
        _ => "Failed to parse JSON body".to_string(),
    };

    AppError::BadRequest(message)
}

/// How the caller wants a response rendered.
///
/// JSON is chosen when the `Accept` header mentions `application/json` or the query
/// string carries `format=json`; browsers get HTML.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Html,
    Json,
}

#[derive(Debug, Default, Deserialize)]
struct FormatQuery {
    format: Option<String>,
}

impl ResponseFormat {
    pub fn from_parts(parts: &Parts) -> Self {
        // A query string that does not deserialize just means no format was asked for
        let query_wants_json = Query::<FormatQuery>::try_from_uri(&parts.uri)
            .map(|Query(q)| q)
            .unwrap_or_default()
            .format
            .is_some_and(|f| f.eq_ignore_ascii_case("json"));

        let accept_wants_json = parts
            .headers
            .get(header::ACCEPT)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains("application/json"))
            .unwrap_or(false);

        if query_wants_json || accept_wants_json {
            Self::Json
        } else {
            Self::Html
        }
    }
}

impl<S> FromRequestParts<S> for ResponseFormat
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(uri: &str, accept: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri(uri);
        if let Some(accept) = accept {
            builder = builder.header(header::ACCEPT, accept);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_response_format_defaults_to_html() {
        let p = parts("/files", Some("text/html,application/xhtml+xml"));
        assert_eq!(ResponseFormat::from_parts(&p), ResponseFormat::Html);
    }

    #[test]
    fn test_response_format_json_from_accept_or_query() {
        let p = parts("/files", Some("application/json"));
        assert_eq!(ResponseFormat::from_parts(&p), ResponseFormat::Json);

        let p = parts("/files?page=1&format=json", None);
        assert_eq!(ResponseFormat::from_parts(&p), ResponseFormat::Json);
    }

    #[test]
    fn test_response_format_query_is_decoded() {
        let p = parts("/files?format=%6Ason", None);
        assert_eq!(ResponseFormat::from_parts(&p), ResponseFormat::Json);

        let p = parts("/files?format=JSON", None);
        assert_eq!(ResponseFormat::from_parts(&p), ResponseFormat::Json);

        let p = parts("/files?format=jsonp", None);
        assert_eq!(ResponseFormat::from_parts(&p), ResponseFormat::Html);

        let p = parts("/files?format=html&formats=json", None);
        assert_eq!(ResponseFormat::from_parts(&p), ResponseFormat::Html);
    }
}
