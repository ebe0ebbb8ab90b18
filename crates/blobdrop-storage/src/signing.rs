//! Shared Key request signing for the blob service.
//!
//! The string-to-sign is the verb, eleven standard headers, the canonical
//! `x-ms-*` headers and the canonical resource, each newline separated. The
//! `Date` slot stays empty because requests always carry `x-ms-date`.

use std::collections::BTreeMap;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use reqwest::Method;
use reqwest::header::{
    CONTENT_ENCODING, CONTENT_LANGUAGE, CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, IF_MATCH,
    IF_MODIFIED_SINCE, IF_NONE_MATCH, IF_UNMODIFIED_SINCE, RANGE,
};
use sha2::Sha256;
use url::Url;

use crate::error::{StorageError, StorageResult};

/// Build the Shared Key string-to-sign for a request.
#[must_use]
pub fn string_to_sign(method: &Method, url: &Url, account: &str, headers: &HeaderMap) -> String {
    let header = |name: &str| header_value(headers, name);
    let content_length = match header(CONTENT_LENGTH.as_str()) {
        "0" => "",
        other => other,
    };

    let standard = [
        header(CONTENT_ENCODING.as_str()),
        header(CONTENT_LANGUAGE.as_str()),
        content_length,
        header("content-md5"),
        header(CONTENT_TYPE.as_str()),
        "",
        header(IF_MODIFIED_SINCE.as_str()),
        header(IF_MATCH.as_str()),
        header(IF_NONE_MATCH.as_str()),
        header(IF_UNMODIFIED_SINCE.as_str()),
        header(RANGE.as_str()),
    ];

    let mut out = String::from(method.as_str());
    out.push('\n');
    for value in standard {
        out.push_str(value);
        out.push('\n');
    }
    out.push_str(&canonical_headers(headers));
    out.push_str(&canonical_resource(account, url));
    out
}

/// Sign `string_to_sign` with the decoded account key and return the base64 signature.
///
/// # Errors
///
/// Returns an error if the key cannot initialise the HMAC.
pub fn sign(key: &[u8], string_to_sign: &str) -> StorageResult<String> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key)
        .map_err(|_| StorageError::invalid_connection_string("AccountKey", "invalid_length"))?;
    mac.update(string_to_sign.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Render the `Authorization` header value.
#[must_use]
pub fn authorization(account: &str, signature: &str) -> String {
    format!("SharedKey {account}:{signature}")
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
}

fn canonical_headers(headers: &HeaderMap) -> String {
    let mut grouped: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (name, value) in headers {
        let name = name.as_str();
        if !name.starts_with("x-ms-") {
            continue;
        }
        if let Ok(value) = value.to_str() {
            grouped.entry(name).or_default().push(value.trim());
        }
    }

    grouped
        .into_iter()
        .map(|(name, values)| format!("{name}:{}\n", values.join(",")))
        .collect()
}

fn canonical_resource(account: &str, url: &Url) -> String {
    let mut resource = format!("/{account}{}", url.path());
    let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in url.query_pairs() {
        params
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(value.into_owned());
    }
    for (name, mut values) in params {
        values.sort();
        resource.push('\n');
        resource.push_str(&name);
        resource.push(':');
        resource.push_str(&values.join(","));
    }
    resource
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn string_to_sign_for_container_create() -> Result<(), url::ParseError> {
        let url = Url::parse("https://acme.blob.core.windows.net/uploads?restype=container")?;
        let map = headers(&[
            ("content-length", "0"),
            ("x-ms-version", "2021-12-02"),
            ("x-ms-date", "Mon, 19 Oct 2026 10:00:00 GMT"),
        ]);

        let rendered = string_to_sign(&Method::PUT, &url, "acme", &map);
        assert_eq!(
            rendered,
            "PUT\n\n\n\n\n\n\n\n\n\n\n\n\
             x-ms-date:Mon, 19 Oct 2026 10:00:00 GMT\n\
             x-ms-version:2021-12-02\n\
             /acme/uploads\nrestype:container"
        );
        Ok(())
    }

    #[test]
    fn string_to_sign_for_blob_upload_includes_length_type_and_tags() -> Result<(), url::ParseError>
    {
        let url = Url::parse("http://127.0.0.1:10000/devstoreaccount1/uploads/a%20b.pdf")?;
        let map = headers(&[
            ("content-length", "42"),
            ("content-type", "application/pdf"),
            ("x-ms-blob-type", "BlockBlob"),
            ("x-ms-tags", "source=scanner"),
            ("x-ms-version", "2021-12-02"),
            ("x-ms-date", "Mon, 19 Oct 2026 10:00:00 GMT"),
        ]);

        let rendered = string_to_sign(&Method::PUT, &url, "devstoreaccount1", &map);
        let lines: Vec<&str> = rendered.split('\n').collect();
        assert_eq!(lines[0], "PUT");
        assert_eq!(lines[3], "42");
        assert_eq!(lines[5], "application/pdf");
        assert_eq!(lines[12], "x-ms-blob-type:BlockBlob");
        assert_eq!(lines[13], "x-ms-date:Mon, 19 Oct 2026 10:00:00 GMT");
        assert_eq!(lines[14], "x-ms-tags:source=scanner");
        assert_eq!(lines[15], "x-ms-version:2021-12-02");
        assert_eq!(
            lines[16],
            "/devstoreaccount1/devstoreaccount1/uploads/a%20b.pdf"
        );
        assert_eq!(lines.len(), 17);
        Ok(())
    }

    #[test]
    fn query_parameters_are_sorted_and_lowercased() -> Result<(), url::ParseError> {
        let url = Url::parse("https://acme.blob.core.windows.net/c?restype=container&Comp=list")?;
        let rendered = string_to_sign(&Method::GET, &url, "acme", &HeaderMap::new());
        assert!(rendered.ends_with("/acme/c\ncomp:list\nrestype:container"));
        Ok(())
    }

    #[test]
    fn sign_produces_hmac_sha256_base64() -> StorageResult<()> {
        let signature = sign(b"secret", "PUT\n")?;
        assert_eq!(signature, "Z7jUwNW5BIT1Q3Cyw4r4oSHJavCLJ5QQD6FB1zqlNF0=");
        assert_eq!(
            authorization("acme", &signature),
            "SharedKey acme:Z7jUwNW5BIT1Q3Cyw4r4oSHJavCLJ5QQD6FB1zqlNF0="
        );
        Ok(())
    }

    #[test]
    fn emulator_container_create_signature_matches_reference() -> Result<(), Box<dyn std::error::Error>>
    {
        let key = STANDARD.decode(
            "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==",
        )?;
        let url = Url::parse("http://127.0.0.1:10000/devstoreaccount1/uploads?restype=container")?;
        let map = headers(&[
            ("content-length", "0"),
            ("x-ms-version", "2021-12-02"),
            ("x-ms-date", "Mon, 19 Oct 2026 10:00:00 GMT"),
        ]);

        let rendered = string_to_sign(&Method::PUT, &url, "devstoreaccount1", &map);
        assert_eq!(
            rendered,
            "PUT\n\n\n\n\n\n\n\n\n\n\n\n\
             x-ms-date:Mon, 19 Oct 2026 10:00:00 GMT\n\
             x-ms-version:2021-12-02\n\
             /devstoreaccount1/devstoreaccount1/uploads\nrestype:container"
        );
        assert_eq!(
            sign(&key, &rendered)?,
            "g4Lk387eaVXMnASNk13IIPw9Cb6uNerF0AglHFuAvfE="
        );
        Ok(())
    }
}
