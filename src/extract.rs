use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// `Json` wrapper whose rejection is rendered through the response envelope.
pub struct AppJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for AppJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
        Ok(AppJson(value))
    }
}

/// `Path` wrapper whose rejection is rendered through the response envelope.
pub struct AppPath<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for AppPath<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::bad_request("Invalid path parameter"))?;
        Ok(AppPath(value))
    }
}

/// `Query` wrapper whose rejection is rendered through the response envelope.
pub struct AppQuery<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for AppQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::bad_request("Invalid query parameters"))?;
        Ok(AppQuery(value))
    }
}

/// Clamp pagination inputs and return `(page, size, offset)`. Page is at
/// least 1, size is kept within 1..=100.
pub fn page_window(page: i64, page_size: i64) -> (i64, i64, i64) {
    let page = page.max(1);
    let size = page_size.clamp(1, 100);
    (page, size, (page - 1) * size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_window_clamps_out_of_range_input() {
        assert_eq!(page_window(0, 10), (1, 10, 0));
        assert_eq!(page_window(-5, 0), (1, 1, 0));
        assert_eq!(page_window(1, 1000), (1, 100, 0));
    }

    #[test]
    fn page_window_computes_offsets() {
        assert_eq!(page_window(1, 20), (1, 20, 0));
        assert_eq!(page_window(3, 10), (3, 10, 20));
        assert_eq!(page_window(2, 100), (2, 100, 100));
    }
}
