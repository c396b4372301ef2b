use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::Response,
};
use serde::Deserialize;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::AppState;

#[derive(Deserialize)]
pub struct ServeMediaQuery {
    pub download: Option<u8>,
}

/// Serve a stored object with HTTP range support.
/// Add ?download=1 to get Content-Disposition: attachment.
pub async fn serve_media(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Query(params): Query<ServeMediaQuery>,
    headers: HeaderMap,
) -> Result<Response, StatusCode> {
    let file_path = state.storage.resolve(&path).map_err(|_| StatusCode::NOT_FOUND)?;

    let metadata = tokio::fs::metadata(&file_path)
        .await
        .map_err(|_| StatusCode::NOT_FOUND)?;
    if !metadata.is_file() {
        return Err(StatusCode::NOT_FOUND);
    }
    let file_size = metadata.len();

    let content_type = mime_guess::from_path(&file_path)
        .first_raw()
        .unwrap_or("application/octet-stream");

    let mut builder = Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CACHE_CONTROL, "private, max-age=86400");

    if params.download.unwrap_or(0) != 0 {
        let fname = file_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("download");
        builder = builder.header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", fname),
        );
    }

    let range = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| parse_range(v, file_size));

    let (status, body) = match range {
        Some((start, end)) => {
            let length = end - start + 1;
            let mut file = tokio::fs::File::open(&file_path)
                .await
                .map_err(|_| StatusCode::NOT_FOUND)?;
            file.seek(std::io::SeekFrom::Start(start))
                .await
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
            let mut buf = vec![0u8; length as usize];
            file.read_exact(&mut buf)
                .await
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

            builder = builder
                .header(header::CONTENT_LENGTH, length.to_string())
                .header(header::CONTENT_RANGE, format!("bytes {}-{}/{}", start, end, file_size));
            (StatusCode::PARTIAL_CONTENT, buf)
        }
        None => {
            let buf = tokio::fs::read(&file_path)
                .await
                .map_err(|_| StatusCode::NOT_FOUND)?;
            builder = builder.header(header::CONTENT_LENGTH, buf.len().to_string());
            (StatusCode::OK, buf)
        }
    };

    builder.status(status).body(Body::from(body)).map_err(|e| {
        tracing::error!("building media response for {} failed: {}", path, e);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

/// Parse a single `bytes=start-end` range (either bound may be omitted).
/// Returns inclusive bounds, or `None` for anything unsatisfiable.
fn parse_range(header: &str, size: u64) -> Option<(u64, u64)> {
    let ranges = header.strip_prefix("bytes=")?;
    if ranges.contains(',') || size == 0 {
        return None;
    }
    let (start, end) = ranges.split_once('-')?;
    let (start, end) = match (start.trim(), end.trim()) {
        ("", "") => return None,
        // Suffix range: the last N bytes.
        ("", suffix) => {
            let n: u64 = suffix.parse().ok()?;
            if n == 0 {
                return None;
            }
            (size.saturating_sub(n), size - 1)
        }
        (start, "") => (start.parse().ok()?, size - 1),
        (start, end) => (start.parse().ok()?, end.parse::<u64>().ok()?.min(size - 1)),
    };
    (start <= end && start < size).then_some((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_range_forms() {
        assert_eq!(parse_range("bytes=0-99", 1000), Some((0, 99)));
        assert_eq!(parse_range("bytes=900-", 1000), Some((900, 999)));
        assert_eq!(parse_range("bytes=-100", 1000), Some((900, 999)));
        assert_eq!(parse_range("bytes=500-5000", 1000), Some((500, 999)));
    }

    #[test]
    fn test_parse_range_rejects_unsatisfiable() {
        assert_eq!(parse_range("bytes=1000-", 1000), None);
        assert_eq!(parse_range("bytes=50-10", 1000), None);
        assert_eq!(parse_range("bytes=0-1,5-9", 1000), None);
        assert_eq!(parse_range("items=0-1", 1000), None);
        assert_eq!(parse_range("bytes=0-0", 0), None);
    }
}
