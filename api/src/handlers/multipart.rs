// Collects a multipart request into text fields and files

use axum::async_trait;
use axum::extract::{FromRequest, Multipart, Request};
use common::errors::AppError;
use common::storage::UploadFile;
use std::collections::HashMap;

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: HashMap<String, Vec<UploadFile>>,
}

impl MultipartForm {
    /// Read every part. Parts with a file name or content type are files.
    pub async fn parse(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = MultipartForm::default();

        while let Some(field) = multipart.next_field().await.map_err(|e| {
            tracing::warn!(error = %e, "Malformed multipart body");
            AppError::bad_request(format!("Malformed multipart body: {}", e))
        })? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            if field.file_name().is_some() || field.content_type().is_some() {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field
                    .content_type()
                    .unwrap_or(FALLBACK_CONTENT_TYPE)
                    .to_string();
                let data = field.bytes().await.map_err(|e| {
                    AppError::bad_request(format!("Failed to read file '{}': {}", name, e))
                })?;

                // Browsers send an empty part for an untouched file input
                if data.is_empty() && file_name.as_deref().map_or(true, str::is_empty) {
                    continue;
                }

                form.files.entry(name).or_default().push(UploadFile {
                    file_name,
                    content_type,
                    data: data.to_vec(),
                });
            } else {
                let text = field.text().await.map_err(|e| {
                    AppError::bad_request(format!("Failed to read field '{}': {}", name, e))
                })?;
                form.fields.insert(name, text);
            }
        }

        Ok(form)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn take_files(&mut self, name: &str) -> Vec<UploadFile> {
        self.files.remove(name).unwrap_or_default()
    }

    /// The single file under `name`; more than one is a bad request
    pub fn take_file(&mut self, name: &str) -> Result<Option<UploadFile>, AppError> {
        let mut files = self.take_files(name);
        match files.len() {
            0 => Ok(None),
            1 => Ok(files.pop()),
            _ => Err(AppError::bad_request(format!(
                "Only one file is allowed in '{}'",
                name
            ))),
        }
    }

    pub fn require_file(&mut self, name: &str) -> Result<UploadFile, AppError> {
        self.take_file(name)?
            .ok_or_else(|| AppError::bad_request(format!("Missing file: {}", name)))
    }
}

#[async_trait]
impl<S> FromRequest<S> for MultipartForm
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let multipart = Multipart::from_request(req, state).await?;
        Self::parse(multipart).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::header;

    const BOUNDARY: &str = "XBOUNDARYX";

    fn part(name: &str, file: Option<(&str, &str)>, body: &str) -> String {
        match file {
            Some((file_name, content_type)) => format!(
                "--{b}\r\nContent-Disposition: form-data; name=\"{n}\"; filename=\"{f}\"\r\nContent-Type: {c}\r\n\r\n{body}\r\n",
                b = BOUNDARY,
                n = name,
                f = file_name,
                c = content_type,
                body = body
            ),
            None => format!(
                "--{b}\r\nContent-Disposition: form-data; name=\"{n}\"\r\n\r\n{body}\r\n",
                b = BOUNDARY,
                n = name,
                body = body
            ),
        }
    }

    async fn form(parts: &[String]) -> MultipartForm {
        let body = format!("{}--{}--\r\n", parts.concat(), BOUNDARY);
        let request = axum::http::Request::builder()
            .method("POST")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .expect("request");
        MultipartForm::from_request(request, &())
            .await
            .expect("parse")
    }

    #[tokio::test]
    async fn test_non_multipart_body_is_bad_request() {
        let request = axum::http::Request::builder()
            .method("POST")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .expect("request");

        let err = MultipartForm::from_request(request, &()).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_fields_and_files_are_separated() {
        let mut form = form(&[
            part("title", None, "Jeju trip"),
            part("images", Some(("a.jpg", "image/jpeg")), "aaaa"),
            part("images", Some(("b.png", "image/png")), "bb"),
        ])
        .await;

        assert_eq!(form.text("title"), Some("Jeju trip"));
        let images = form.take_files("images");
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].content_type, "image/jpeg");
        assert_eq!(images[0].data, b"aaaa");
        assert_eq!(images[1].file_name.as_deref(), Some("b.png"));
        assert!(form.take_files("images").is_empty());
    }

    #[tokio::test]
    async fn test_take_file_rejects_multiple() {
        let mut form = form(&[
            part("image", Some(("a.jpg", "image/jpeg")), "a"),
            part("image", Some(("b.jpg", "image/jpeg")), "b"),
        ])
        .await;
        assert!(matches!(form.take_file("image"), Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_require_file_missing() {
        let mut form = form(&[part("title", None, "x")]).await;
        assert!(matches!(form.require_file("image"), Err(AppError::BadRequest(_))));
    }
}
