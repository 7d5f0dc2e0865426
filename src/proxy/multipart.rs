use bytes::Bytes;
use hyper::header::CONTENT_TYPE;
use hyper::HeaderMap;
use reqwest::multipart::{Form, Part};

use crate::core::request::GatewayBody;
use crate::error::ProxyError;

/// A decoded multipart field, buffered for re-encoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormPart {
    /// Field name
    pub name: String,

    /// File name, present for file parts
    pub file_name: Option<String>,

    /// Declared part content type
    pub content_type: Option<String>,

    /// Part payload
    pub data: Bytes,
}

/// Whether the inbound content type is multipart/form-data
pub fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|ct| ct.to_ascii_lowercase().starts_with("multipart/form-data"))
        .unwrap_or(false)
}

/// Decode the inbound multipart body into re-encoding order: file parts
/// first in original order, then scalar fields in original order.
pub async fn collect_parts(
    headers: &HeaderMap,
    body: GatewayBody,
) -> Result<Vec<FormPart>, ProxyError> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ProxyError::MultipartBody("missing content-type header".to_string()))?;

    let boundary = multer::parse_boundary(content_type)
        .map_err(|e| ProxyError::MultipartBody(format!("invalid boundary: {}", e)))?;

    let mut multipart = multer::Multipart::new(body.into_stream(), boundary);

    let mut files = Vec::new();
    let mut fields = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ProxyError::MultipartBody(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(|s| s.to_string());
        let content_type = field.content_type().map(|mime| mime.to_string());
        let data = field
            .bytes()
            .await
            .map_err(|e| ProxyError::MultipartBody(e.to_string()))?;

        let part = FormPart {
            name,
            file_name,
            content_type,
            data,
        };

        if part.file_name.is_some() {
            files.push(part);
        } else {
            fields.push(part);
        }
    }

    let mut parts = files;
    parts.extend(fields);
    Ok(parts)
}

/// Encode decoded parts into a fresh multipart form
pub fn build_form(parts: Vec<FormPart>) -> Result<Form, ProxyError> {
    let mut form = Form::new();

    for part in parts {
        let mut encoded = Part::bytes(part.data.to_vec());

        if let Some(file_name) = part.file_name {
            encoded = encoded.file_name(file_name);
        }
        if let Some(content_type) = &part.content_type {
            encoded = encoded.mime_str(content_type).map_err(|e| {
                ProxyError::MultipartBody(format!("invalid part content type: {}", e))
            })?;
        }

        form = form.part(part.name, encoded);
    }

    Ok(form)
}

/// Decode and re-encode the inbound multipart body
pub async fn reencode(headers: &HeaderMap, body: GatewayBody) -> Result<Form, ProxyError> {
    build_form(collect_parts(headers, body).await?)
}
