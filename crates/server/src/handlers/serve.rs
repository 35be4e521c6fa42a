//! Site file serving: every request not claimed by another route.

use crate::error::{ApiError, ApiResult};
use crate::resolve::ResolvedFile;
use crate::state::AppState;
use axum::body::Body;
use axum::extract::State;
use axum::http::header::{
    ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, ETAG, HOST, IF_MODIFIED_SINCE,
    IF_NONE_MATCH, LAST_MODIFIED, RANGE,
};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use percent_encoding::percent_decode_str;
use sitehost_core::{Hostname, SitePath};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

/// IMF-fixdate, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
const HTTP_DATE: &[BorrowedFormatItem<'static>] = format_description!(
    "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
);

/// GET|HEAD /{path} - Serve a file of the site named by the Host header.
pub async fn serve_site(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> ApiResult<Response> {
    if method != Method::GET && method != Method::HEAD {
        return Err(ApiError::MethodNotAllowed);
    }

    let hostname = request_hostname(&headers, &uri)
        .ok_or_else(|| ApiError::NotFound("unknown host".to_string()))?;
    let decoded = percent_decode_str(uri.path())
        .decode_utf8()
        .map_err(|_| ApiError::NotFound("file not found".to_string()))?;
    let path = SitePath::from_request(&decoded);

    let file = state.resolution.resolve(&hostname, &path).await?;
    build_response(&method, &headers, file)
}

/// Host from the `Host` header, falling back to the request target's
/// authority (HTTP/2 `:authority`).
fn request_hostname(headers: &HeaderMap, uri: &Uri) -> Option<Hostname> {
    headers
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .and_then(Hostname::from_host_header)
        .or_else(|| {
            uri.authority()
                .and_then(|authority| Hostname::from_host_header(authority.as_str()))
        })
}

fn build_response(method: &Method, headers: &HeaderMap, file: ResolvedFile) -> ApiResult<Response> {
    let total = file.content.len() as u64;
    let last_modified = format_http_date(file.last_modified)?;

    let mut response_headers = HeaderMap::new();
    response_headers.insert(ETAG, header_value(&file.etag)?);
    response_headers.insert(LAST_MODIFIED, header_value(&last_modified)?);
    response_headers.insert(ACCEPT_RANGES, HeaderValue::from_static("bytes"));

    if is_not_modified(headers, &file) {
        return Ok((StatusCode::NOT_MODIFIED, response_headers).into_response());
    }

    response_headers.insert(CONTENT_TYPE, HeaderValue::from_static(file.media_type));

    let range = headers
        .get(RANGE)
        .and_then(|value| value.to_str().ok())
        .map(|value| parse_range(value, total))
        .unwrap_or(ByteRange::Ignored);

    let (status, body) = match range {
        ByteRange::Ignored => (StatusCode::OK, file.content),
        ByteRange::Satisfiable { start, end } => {
            response_headers.insert(
                CONTENT_RANGE,
                header_value(&format!("bytes {start}-{end}/{total}"))?,
            );
            let body = file.content.slice(start as usize..=end as usize);
            (StatusCode::PARTIAL_CONTENT, body)
        }
        ByteRange::Unsatisfiable => {
            response_headers.insert(CONTENT_RANGE, header_value(&format!("bytes */{total}"))?);
            response_headers.insert(CONTENT_LENGTH, HeaderValue::from(0u64));
            response_headers.remove(CONTENT_TYPE);
            return Ok((StatusCode::RANGE_NOT_SATISFIABLE, response_headers).into_response());
        }
    };

    response_headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len() as u64));
    let body = if *method == Method::HEAD {
        Body::empty()
    } else {
        Body::from(body)
    };
    Ok((status, response_headers, body).into_response())
}

fn header_value(value: &str) -> ApiResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| ApiError::Internal(format!("invalid header value {value:?}: {e}")))
}

/// Whether the client's cached copy is current.
///
/// `If-None-Match` wins when present; `If-Modified-Since` is consulted only
/// without it.
fn is_not_modified(headers: &HeaderMap, file: &ResolvedFile) -> bool {
    if let Some(value) = headers.get(IF_NONE_MATCH) {
        return value
            .to_str()
            .is_ok_and(|value| etag_list_matches(value, &file.etag));
    }
    headers
        .get(IF_MODIFIED_SINCE)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_http_date)
        .is_some_and(|since| file.last_modified.unix_timestamp() <= since.unix_timestamp())
}

/// Weak comparison against an `If-None-Match` list.
fn etag_list_matches(list: &str, etag: &str) -> bool {
    list.split(',').map(str::trim).any(|candidate| {
        candidate == "*" || candidate.strip_prefix("W/").unwrap_or(candidate) == etag
    })
}

/// Format a timestamp as an HTTP date.
pub fn format_http_date(at: OffsetDateTime) -> ApiResult<String> {
    at.to_offset(UtcOffset::UTC)
        .format(HTTP_DATE)
        .map_err(|e| ApiError::Internal(format!("cannot format date: {e}")))
}

/// Parse an IMF-fixdate HTTP date. Obsolete formats are not accepted.
pub fn parse_http_date(value: &str) -> Option<OffsetDateTime> {
    PrimitiveDateTime::parse(value.trim(), HTTP_DATE)
        .ok()
        .map(PrimitiveDateTime::assume_utc)
}

/// Interpretation of a `Range` header against a representation length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteRange {
    /// Absent, malformed or multi-range: serve the full body.
    Ignored,
    /// Inclusive byte bounds within the body.
    Satisfiable { start: u64, end: u64 },
    /// Well-formed but outside the body.
    Unsatisfiable,
}

/// Parse a single `bytes=` range (`a-b`, `a-` or `-n`).
pub fn parse_range(value: &str, len: u64) -> ByteRange {
    let Some(spec) = value.trim().strip_prefix("bytes=") else {
        return ByteRange::Ignored;
    };
    if spec.contains(',') {
        return ByteRange::Ignored;
    }
    let Some((first, last)) = spec.trim().split_once('-') else {
        return ByteRange::Ignored;
    };
    let (first, last) = (first.trim(), last.trim());

    if first.is_empty() {
        // Suffix range: the final `n` bytes.
        let Ok(suffix) = last.parse::<u64>() else {
            return ByteRange::Ignored;
        };
        if suffix == 0 || len == 0 {
            return ByteRange::Unsatisfiable;
        }
        return ByteRange::Satisfiable {
            start: len.saturating_sub(suffix),
            end: len - 1,
        };
    }

    let Ok(start) = first.parse::<u64>() else {
        return ByteRange::Ignored;
    };
    let end = if last.is_empty() {
        None
    } else {
        match last.parse::<u64>() {
            Ok(end) if end >= start => Some(end),
            _ => return ByteRange::Ignored,
        }
    };
    if start >= len {
        return ByteRange::Unsatisfiable;
    }
    ByteRange::Satisfiable {
        start,
        end: end.map_or(len - 1, |end| end.min(len - 1)),
    }
}
