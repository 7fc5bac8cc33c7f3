//! Serving files from a directory.
//!
//! [`WebServer::register_static_files`](crate::WebServer::register_static_files)
//! routes `prefix(/.*)` to a [`StaticFiles`] value, which resolves the
//! captured tail below its root directory.
//!
//! Supported:
//!
//! - index file fallback for directories
//! - `ETag`, `Last-Modified` and conditional `304` responses
//! - single byte ranges
//! - MIME type detection by extension
//!
//! # Security
//!
//! - the path is percent-decoded once, then `..` components are rejected
//!   before touching the filesystem
//! - resolved paths must stay below the canonical root
//! - hidden files (leading `.`) and symlinks are refused unless enabled

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use percent_encoding::percent_decode_str;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::handler::Response;

/// Errors that can occur when serving static files.
#[derive(Debug, Error)]
pub enum StaticFileError {
    /// The requested file was not found.
    #[error("File not found: {0}")]
    NotFound(String),

    /// The path is forbidden (e.g., directory traversal attempt).
    #[error("Forbidden path: {0}")]
    Forbidden(String),

    /// Only `GET` and `HEAD` are served.
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// I/O error while reading file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Unsatisfiable or malformed `Range` header.
    #[error("Invalid range: {0}")]
    InvalidRange(String),
}

impl StaticFileError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InvalidRange(_) => StatusCode::RANGE_NOT_SATISFIABLE,
        }
    }
}

/// A directory served over HTTP.
///
/// # Example
///
/// ```rust
/// use critter_server::StaticFiles;
///
/// let files = StaticFiles::new("./public")
///     .index("index.html")
///     .cache_control("max-age=3600");
/// assert_eq!(files.index_file(), Some("index.html"));
/// ```
#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
    index_file: Option<String>,
    cache_control: Option<String>,
    etag_enabled: bool,
    last_modified_enabled: bool,
    serve_hidden: bool,
    follow_symlinks: bool,
    mime_types: HashMap<String, String>,
}

impl StaticFiles {
    /// Serves files below `root`, with `index.html` as the directory index.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            index_file: Some("index.html".to_string()),
            cache_control: None,
            etag_enabled: true,
            last_modified_enabled: true,
            serve_hidden: false,
            follow_symlinks: true,
            mime_types: HashMap::new(),
        }
    }

    /// Sets the file served for a directory path.
    pub fn index<S: Into<String>>(mut self, index: S) -> Self {
        self.index_file = Some(index.into());
        self
    }

    /// Disables the directory index.
    pub fn no_index(mut self) -> Self {
        self.index_file = None;
        self
    }

    /// Sets a `Cache-Control` value for every file.
    pub fn cache_control<S: Into<String>>(mut self, value: S) -> Self {
        self.cache_control = Some(value.into());
        self
    }

    /// Enables or disables `ETag` headers.
    pub fn etag(mut self, enabled: bool) -> Self {
        self.etag_enabled = enabled;
        self
    }

    /// Enables or disables `Last-Modified` headers.
    pub fn last_modified(mut self, enabled: bool) -> Self {
        self.last_modified_enabled = enabled;
        self
    }

    /// Allows files and directories whose name starts with `.`.
    pub fn serve_hidden(mut self, enabled: bool) -> Self {
        self.serve_hidden = enabled;
        self
    }

    /// Allows symlinks, as long as their target stays below the root.
    pub fn follow_symlinks(mut self, enabled: bool) -> Self {
        self.follow_symlinks = enabled;
        self
    }

    /// Maps a file extension (without the dot) to a content type.
    pub fn mime_type<S1: Into<String>, S2: Into<String>>(mut self, extension: S1, mime: S2) -> Self {
        self.mime_types
            .insert(extension.into().to_lowercase(), mime.into());
        self
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The directory index file name.
    pub fn index_file(&self) -> Option<&str> {
        self.index_file.as_deref()
    }

    /// Serves `request_path`, which is relative to the root.
    pub async fn handle(
        &self,
        request_path: &str,
        headers: &HeaderMap,
        method: &Method,
    ) -> Result<Response, StaticFileError> {
        if method != Method::GET && method != Method::HEAD {
            return Err(StaticFileError::MethodNotAllowed);
        }

        let file_path = self.resolve_path(request_path).await?;
        let metadata = tokio::fs::metadata(&file_path).await?;

        if metadata.is_dir() {
            if let Some(index) = &self.index_file {
                let index_path = file_path.join(index);
                if let Ok(index_meta) = tokio::fs::metadata(&index_path).await {
                    if index_meta.is_file() {
                        return self.serve_file(&index_path, &index_meta, headers, method).await;
                    }
                }
            }
            return Err(StaticFileError::NotFound(request_path.to_string()));
        }

        self.serve_file(&file_path, &metadata, headers, method).await
    }

    async fn resolve_path(&self, request_path: &str) -> Result<PathBuf, StaticFileError> {
        let decoded = percent_decode_str(request_path)
            .decode_utf8()
            .map_err(|_| StaticFileError::NotFound(request_path.to_string()))?;
        if decoded.contains('\0') {
            return Err(StaticFileError::Forbidden("NUL in path".to_string()));
        }
        let relative = decoded.trim_start_matches('/');

        for component in Path::new(relative).components() {
            match component {
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(StaticFileError::Forbidden(
                        "Directory traversal not allowed".to_string(),
                    ));
                }
                Component::Normal(name) => {
                    if !self.serve_hidden && name.to_str().is_some_and(|n| n.starts_with('.')) {
                        return Err(StaticFileError::Forbidden("Hidden files not allowed".to_string()));
                    }
                }
                Component::CurDir => {}
            }
        }

        let full_path = self.root.join(relative);

        if !self.follow_symlinks {
            if let Ok(meta) = tokio::fs::symlink_metadata(&full_path).await {
                if meta.file_type().is_symlink() {
                    return Err(StaticFileError::Forbidden("Symlinks not allowed".to_string()));
                }
            }
        }

        let canonical = tokio::fs::canonicalize(&full_path)
            .await
            .map_err(|_| StaticFileError::NotFound(request_path.to_string()))?;
        let canonical_root = tokio::fs::canonicalize(&self.root).await.map_err(|e| {
            StaticFileError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Root directory not found: {e}"),
            ))
        })?;

        if !canonical.starts_with(&canonical_root) {
            return Err(StaticFileError::Forbidden("Path escapes root directory".to_string()));
        }

        Ok(canonical)
    }

    async fn serve_file(
        &self,
        path: &Path,
        metadata: &std::fs::Metadata,
        headers: &HeaderMap,
        method: &Method,
    ) -> Result<Response, StaticFileError> {
        let file_size = metadata.len();
        let modified = metadata.modified().ok();
        let etag = if self.etag_enabled {
            generate_etag(metadata)
        } else {
            None
        };

        // If-None-Match takes precedence over If-Modified-Since.
        if let Some(value) = headers.get(header::IF_NONE_MATCH).and_then(|v| v.to_str().ok()) {
            let matches = etag
                .as_deref()
                .is_some_and(|etag| value == "*" || value.split(',').any(|tag| tag.trim() == etag));
            if matches {
                return Ok(self.not_modified(etag.as_deref()));
            }
        } else if self.last_modified_enabled && not_modified_since(headers, modified) {
            return Ok(self.not_modified(etag.as_deref()));
        }

        let range = parse_range(headers, file_size)?;
        let mime_type = self.detect_mime_type(path);

        let (status, body, content_range) = if *method == Method::HEAD {
            (StatusCode::OK, Bytes::new(), None)
        } else if let Some((start, end)) = range {
            let content = read_range(path, start, end).await?;
            (StatusCode::PARTIAL_CONTENT, content, Some((start, end, file_size)))
        } else {
            let content = tokio::fs::read(path).await?;
            (StatusCode::OK, Bytes::from(content), None)
        };

        let content_length = if *method == Method::HEAD {
            file_size
        } else {
            body.len() as u64
        };

        let mut response = Response::new(body);
        *response.status_mut() = status;
        let out = response.headers_mut();
        out.insert(header::CONTENT_TYPE, header_value(&mime_type)?);
        out.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
        out.insert(header::CONTENT_LENGTH, HeaderValue::from(content_length));
        if let Some(cache_control) = &self.cache_control {
            out.insert(header::CACHE_CONTROL, header_value(cache_control)?);
        }
        if let Some(etag) = &etag {
            out.insert(header::ETAG, header_value(etag)?);
        }
        if self.last_modified_enabled {
            if let Some(modified) = modified {
                out.insert(header::LAST_MODIFIED, header_value(&httpdate::fmt_http_date(modified))?);
            }
        }
        if let Some((start, end, total)) = content_range {
            out.insert(
                header::CONTENT_RANGE,
                header_value(&format!("bytes {start}-{end}/{total}"))?,
            );
        }
        Ok(response)
    }

    fn not_modified(&self, etag: Option<&str>) -> Response {
        let mut response = Response::new(Bytes::new());
        *response.status_mut() = StatusCode::NOT_MODIFIED;
        let headers = response.headers_mut();
        if let Some(etag) = etag.and_then(|e| HeaderValue::from_str(e).ok()) {
            headers.insert(header::ETAG, etag);
        }
        if let Some(cache_control) = self
            .cache_control
            .as_deref()
            .and_then(|c| HeaderValue::from_str(c).ok())
        {
            headers.insert(header::CACHE_CONTROL, cache_control);
        }
        response
    }

    fn detect_mime_type(&self, path: &Path) -> String {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        if let Some(mime) = self.mime_types.get(&extension) {
            return mime.clone();
        }

        match extension.as_str() {
            "html" | "htm" => "text/html; charset=utf-8",
            "css" => "text/css; charset=utf-8",
            "js" | "mjs" => "text/javascript; charset=utf-8",
            "json" | "map" => "application/json",
            "xml" => "application/xml",
            "txt" => "text/plain; charset=utf-8",
            "csv" => "text/csv; charset=utf-8",
            "md" => "text/markdown; charset=utf-8",
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "svg" => "image/svg+xml",
            "webp" => "image/webp",
            "ico" => "image/x-icon",
            "woff" => "font/woff",
            "woff2" => "font/woff2",
            "ttf" => "font/ttf",
            "pdf" => "application/pdf",
            "zip" => "application/zip",
            "gz" => "application/gzip",
            "mp3" => "audio/mpeg",
            "mp4" => "video/mp4",
            "webm" => "video/webm",
            "wasm" => "application/wasm",
            _ => "application/octet-stream",
        }
        .to_string()
    }
}

fn header_value(value: &str) -> Result<HeaderValue, StaticFileError> {
    HeaderValue::from_str(value)
        .map_err(|e| StaticFileError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}

/// Weak validator from modification time and size.
fn generate_etag(metadata: &std::fs::Metadata) -> Option<String> {
    let modified = metadata.modified().ok()?;
    let since_epoch = modified.duration_since(SystemTime::UNIX_EPOCH).ok()?;
    Some(format!(
        "\"{:x}-{:x}-{:x}\"",
        since_epoch.as_secs(),
        since_epoch.subsec_nanos(),
        metadata.len()
    ))
}

fn not_modified_since(headers: &HeaderMap, modified: Option<SystemTime>) -> bool {
    let Some(modified) = modified else {
        return false;
    };
    let Some(since) = headers
        .get(header::IF_MODIFIED_SINCE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| httpdate::parse_http_date(v).ok())
    else {
        return false;
    };

    match (
        modified.duration_since(SystemTime::UNIX_EPOCH),
        since.duration_since(SystemTime::UNIX_EPOCH),
    ) {
        (Ok(modified), Ok(since)) => modified.as_secs() <= since.as_secs(),
        _ => false,
    }
}

/// Parses a single `bytes=` range into inclusive offsets.
fn parse_range(headers: &HeaderMap, file_size: u64) -> Result<Option<(u64, u64)>, StaticFileError> {
    let Some(value) = headers.get(header::RANGE) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| StaticFileError::InvalidRange("Invalid range header encoding".to_string()))?;
    let byte_range = value
        .strip_prefix("bytes=")
        .ok_or_else(|| StaticFileError::InvalidRange("Only byte ranges supported".to_string()))?;
    let (start, end) = byte_range
        .split_once('-')
        .ok_or_else(|| StaticFileError::InvalidRange("Invalid range format".to_string()))?;

    if file_size == 0 {
        return Err(StaticFileError::InvalidRange("Empty file".to_string()));
    }
    let last = file_size - 1;

    let (start, end) = if start.is_empty() {
        let suffix: u64 = end
            .parse()
            .map_err(|_| StaticFileError::InvalidRange("Invalid suffix length".to_string()))?;
        if suffix == 0 {
            return Err(StaticFileError::InvalidRange("Empty suffix range".to_string()));
        }
        (file_size.saturating_sub(suffix), last)
    } else {
        let start: u64 = start
            .parse()
            .map_err(|_| StaticFileError::InvalidRange("Invalid start".to_string()))?;
        let end = if end.is_empty() {
            last
        } else {
            end.parse()
                .map_err(|_| StaticFileError::InvalidRange("Invalid end".to_string()))?
        };
        (start, end)
    };

    if start > end || start >= file_size {
        return Err(StaticFileError::InvalidRange(format!(
            "Range {start}-{end} not satisfiable for file size {file_size}"
        )));
    }

    Ok(Some((start, end.min(last))))
}

async fn read_range(path: &Path, start: u64, end: u64) -> Result<Bytes, StaticFileError> {
    let mut file = tokio::fs::File::open(path).await?;
    file.seek(std::io::SeekFrom::Start(start)).await?;

    let length = usize::try_from(end - start + 1)
        .map_err(|_| StaticFileError::InvalidRange("Range too large".to_string()))?;
    let mut buffer = vec![0u8; length];
    file.read_exact(&mut buffer).await?;
    Ok(Bytes::from(buffer))
}
