/**
 * Upload Routes
 * Image uploads for the post editor and read-back of stored objects
 */
use axum::{
    extract::{Multipart, Path, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::session::current_admin_identity;
use crate::state::AppState;
use crate::storage::{build_object_key, public_url, sniff_image_type, ObjectStore};

/// 10 MiB
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Body cap for the upload route: the image plus multipart framing.
pub const UPLOAD_BODY_LIMIT: usize = MAX_IMAGE_BYTES + 64 * 1024;

const IMMUTABLE_CACHE: &str = "public, max-age=31536000, immutable";

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub url: String,
}

struct ImageUpload {
    file_name: String,
    content_type: String,
    data: axum::body::Bytes,
}

async fn read_file_field(multipart: &mut Multipart) -> AppResult<Option<ImageUpload>> {
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::warn!(error = %e, "malformed multipart upload");
        AppError::BadRequest("Invalid multipart data".to_string())
    })? {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("image").to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let data = field.bytes().await.map_err(|e| {
            tracing::warn!(error = %e, "failed to read upload bytes");
            AppError::BadRequest("Failed to read file data".to_string())
        })?;

        return Ok(Some(ImageUpload {
            file_name,
            content_type,
            data,
        }));
    }
    Ok(None)
}

/// POST /api/uploads/image
pub async fn upload_image(
    State(state): State<AppState>,
    jar: CookieJar,
    mut multipart: Multipart,
) -> AppResult<Json<UploadResponse>> {
    if current_admin_identity(&state.settings.admin, &jar).is_none() {
        return Err(AppError::Unauthorized);
    }

    let upload = read_file_field(&mut multipart)
        .await?
        .ok_or_else(|| AppError::BadRequest("No file provided".to_string()))?;

    if !upload.content_type.starts_with("image/") {
        return Err(AppError::BadRequest(
            "Only image uploads are supported".to_string(),
        ));
    }
    if upload.data.is_empty() {
        return Err(AppError::BadRequest("Uploaded file is empty".to_string()));
    }
    if upload.data.len() > MAX_IMAGE_BYTES {
        return Err(AppError::BadRequest(
            "File too large. Maximum size is 10MB.".to_string(),
        ));
    }

    let Some(content_type) = sniff_image_type(&upload.data) else {
        tracing::warn!(
            declared = %upload.content_type,
            file_name = %upload.file_name,
            "upload is not a recognized image"
        );
        return Err(AppError::BadRequest(
            "Invalid image file. Supported formats: JPEG, PNG, GIF, WebP".to_string(),
        ));
    };

    let key = build_object_key(&upload.file_name, content_type, Utc::now());
    let size = upload.data.len();
    state.storage.store(&key, upload.data, content_type).await?;

    tracing::info!(key = %key, size, content_type, "image uploaded");

    Ok(Json(UploadResponse {
        url: public_url(state.settings.uploads.public_base_url.as_deref(), &key),
    }))
}

/// GET /api/uploads/{*key}
pub async fn serve_upload(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> AppResult<Response> {
    let object = state.storage.fetch(&key).await?;

    let content_type = HeaderValue::from_str(&object.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    let mut response = object.data.into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, content_type);
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(IMMUTABLE_CACHE));
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    if let Some(length) = object.content_length {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    }
    if let Some(etag) = object.etag.and_then(|e| HeaderValue::from_str(&e).ok()) {
        headers.insert(header::ETAG, etag);
    }

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::ErrorResponse;
    use crate::test_support::{admin_cookie, test_app, test_app_with, test_settings, TestApp};
    use axum::body::Body;
    use axum::extract::DefaultBodyLimit;
    use axum::http::{Request, StatusCode};
    use axum::routing::{get, post};
    use axum::Router;
    use tower::ServiceExt;

    const BOUNDARY: &str = "upload-test-boundary";
    const PNG: &[u8] = b"\x89PNG\r\n\x1a\npixels";
    const JPEG: &[u8] = b"\xFF\xD8\xFF\xE0pixels";

    fn router(app: &TestApp) -> Router {
        Router::new()
            .route(
                "/api/uploads/image",
                post(upload_image).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
            )
            .route("/api/uploads/{*key}", get(serve_upload))
            .with_state(app.state.clone())
    }

    fn upload_request(file_name: &str, content_type: &str, data: &[u8], signed_in: bool) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
             Content-Type: {content_type}\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        let mut builder = Request::post("/api/uploads/image").header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
        if signed_in {
            builder = builder.header(header::COOKIE, admin_cookie());
        }
        builder.body(Body::from(body)).unwrap()
    }

    async fn json<T: serde::de::DeserializeOwned>(res: Response) -> T {
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn upload_requires_session() {
        let app = test_app();
        let res = router(&app)
            .oneshot(upload_request("a.png", "image/png", PNG, false))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body: ErrorResponse = json(res).await;
        assert_eq!(body.error, "Unauthorized");
        assert!(app.objects.keys().is_empty());
    }

    #[tokio::test]
    async fn non_images_are_rejected() {
        let app = test_app();
        let res = router(&app)
            .oneshot(upload_request("notes.txt", "text/plain", b"hello", true))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert!(app.objects.keys().is_empty());
    }

    #[tokio::test]
    async fn uploaded_image_is_served_back() {
        let app = test_app();
        let res = router(&app)
            .oneshot(upload_request("My Photo.PNG", "image/png", PNG, true))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let body: UploadResponse = json(res).await;
        assert!(body.url.starts_with("/api/uploads/blog/"));
        assert!(body.url.ends_with("-my-photo.png"));

        let res = router(&app)
            .oneshot(Request::get(body.url.as_str()).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[header::CONTENT_TYPE], "image/png");
        assert_eq!(res.headers()[header::CACHE_CONTROL], IMMUTABLE_CACHE);
        assert_eq!(res.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(
            res.headers()[header::CONTENT_LENGTH],
            PNG.len().to_string().as_str()
        );
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], PNG);
    }

    #[tokio::test]
    async fn html_disguised_as_image_is_rejected() {
        let app = test_app();
        let res = router(&app)
            .oneshot(upload_request(
                "evil.html",
                "image/png",
                b"<html><script>alert(1)</script></html>",
                true,
            ))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert!(app.objects.keys().is_empty());
    }

    #[tokio::test]
    async fn stored_type_comes_from_the_bytes_not_the_file_name() {
        let app = test_app();
        let res = router(&app)
            .oneshot(upload_request("evil.html", "image/gif", PNG, true))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let body: UploadResponse = json(res).await;
        assert!(body.url.ends_with("-evil.png"), "{}", body.url);

        let res = router(&app)
            .oneshot(Request::get(body.url.as_str()).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.headers()[header::CONTENT_TYPE], "image/png");
    }

    #[tokio::test]
    async fn public_base_url_is_used_when_configured() {
        let app = test_app_with(test_settings(&[(
            "OBJECT_PUBLIC_BASE_URL",
            "https://cdn.example.com/",
        )]));
        let res = router(&app)
            .oneshot(upload_request("cover.jpg", "image/jpeg", JPEG, true))
            .await
            .unwrap();

        let body: UploadResponse = json(res).await;
        assert!(body.url.starts_with("https://cdn.example.com/blog/"));
        assert_eq!(app.objects.keys().len(), 1);
    }

    #[tokio::test]
    async fn missing_object_is_json_404() {
        let app = test_app();
        let res = router(&app)
            .oneshot(
                Request::get("/api/uploads/blog/2025/01/01/nope.png")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let body: ErrorResponse = json(res).await;
        assert!(body.error.contains("not found"));
    }
}
