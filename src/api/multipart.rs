//! Minimal `multipart/form-data` reader for the upload route.

use anyhow::{anyhow, Result};

use super::http::find_subsequence;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct FormPart {
    pub name: String,
    pub data: Vec<u8>,
}

/// Extract the boundary parameter of a multipart content type.
pub(crate) fn boundary_from_content_type(content_type: &str) -> Option<String> {
    let mut params = content_type.split(';');
    let media = params.next()?.trim();
    if !media.eq_ignore_ascii_case("multipart/form-data") {
        return None;
    }
    params
        .filter_map(|p| p.trim().split_once('='))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("boundary"))
        .map(|(_, v)| v.trim().trim_matches('"').to_string())
        .filter(|b| !b.is_empty())
}

pub(crate) fn parse_multipart(body: &[u8], boundary: &str) -> Result<Vec<FormPart>> {
    let delimiter = format!("--{}", boundary).into_bytes();
    let mut close = b"\r\n".to_vec();
    close.extend_from_slice(&delimiter);

    let mut pos = find_subsequence(body, &delimiter, 0)
        .ok_or_else(|| anyhow!("multipart body missing boundary"))?
        + delimiter.len();
    let mut parts = Vec::new();

    loop {
        if body[pos..].starts_with(b"--") {
            return Ok(parts);
        }
        if !body[pos..].starts_with(b"\r\n") {
            return Err(anyhow!("malformed multipart delimiter"));
        }
        let head_start = pos + 2;
        let head_end = find_subsequence(body, b"\r\n\r\n", head_start)
            .ok_or_else(|| anyhow!("multipart part missing headers"))?;
        let data_start = head_end + 4;
        let data_end = find_subsequence(body, &close, data_start)
            .ok_or_else(|| anyhow!("unterminated multipart body"))?;

        let head = String::from_utf8_lossy(&body[head_start..head_end]);
        parts.push(parse_part(&head, body[data_start..data_end].to_vec())?);
        pos = data_end + close.len();
    }
}

/// Only the `name` parameter of `Content-Disposition` is used; part
/// content types are ignored and the payload is sniffed later.
fn parse_part(head: &str, data: Vec<u8>) -> Result<FormPart> {
    let name = head
        .split("\r\n")
        .filter_map(|line| line.split_once(':'))
        .filter(|(key, _)| key.trim().eq_ignore_ascii_case("content-disposition"))
        .flat_map(|(_, value)| value.split(';').skip(1))
        .filter_map(|param| param.trim().split_once('='))
        .find(|(k, _)| k.trim() == "name")
        .map(|(_, v)| v.trim().trim_matches('"').to_string())
        .ok_or_else(|| anyhow!("multipart part missing name"))?;
    Ok(FormPart { name, data })
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDARY: &str = "----WebKitFormBoundary7MA4YWxkTrZu0gW";

    fn body() -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            b"Content-Disposition: form-data; name=\"file\"; filename=\"deer.jpg\"\r\n\
              Content-Type: image/jpeg\r\n\r\n",
        );
        body.extend_from_slice(b"\xff\xd8\r\n--not-a-boundary\xff\xd9");
        body.extend_from_slice(format!("\r\n--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(b"Content-Disposition: form-data; name=\"vehicleSpeed\"\r\n\r\n90");
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    #[test]
    fn reads_boundary_from_header() {
        assert_eq!(
            boundary_from_content_type(&format!("multipart/form-data; boundary={BOUNDARY}")),
            Some(BOUNDARY.to_string())
        );
        assert_eq!(
            boundary_from_content_type("multipart/form-data; boundary=\"abc\""),
            Some("abc".to_string())
        );
        assert_eq!(boundary_from_content_type("image/jpeg"), None);
        assert_eq!(boundary_from_content_type("multipart/form-data"), None);
    }

    #[test]
    fn splits_file_and_text_fields() {
        let parts = parse_multipart(&body(), BOUNDARY).unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].name, "file");
        assert_eq!(parts[0].data, b"\xff\xd8\r\n--not-a-boundary\xff\xd9".to_vec());
        assert_eq!(parts[1].name, "vehicleSpeed");
        assert_eq!(parts[1].data, b"90".to_vec());
    }

    #[test]
    fn filename_parameter_does_not_shadow_name() {
        let body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; filename=\"x.png\"; name=\"file\"\r\n\r\nabc\r\n--{BOUNDARY}--\r\n"
        );
        let parts = parse_multipart(body.as_bytes(), BOUNDARY).unwrap();
        assert_eq!(parts[0].name, "file");
        assert_eq!(parts[0].data, b"abc".to_vec());
    }

    #[test]
    fn part_without_name_is_an_error() {
        let body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data\r\n\r\nabc\r\n--{BOUNDARY}--\r\n"
        );
        assert!(parse_multipart(body.as_bytes(), BOUNDARY).is_err());
    }

    #[test]
    fn truncated_body_is_an_error() {
        let full = body();
        let truncated = &full[..full.len() - 30];
        assert!(parse_multipart(truncated, BOUNDARY).is_err());
    }
}
