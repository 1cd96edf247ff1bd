//! Certificate files
//!
//! Signing certificates exported from a device or build (`apksigner
//! verify --print-certs`, `keytool -exportcert`) come either as raw DER or
//! as PEM with one or more certificate blocks (`CERTIFICATE`,
//! `X509 CERTIFICATE` or OpenSSL's `TRUSTED CERTIFICATE`).

use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::debug;

use bindguard_access::{Certificate, SourceError};

const TRUSTED_LABEL: &str = "TRUSTED CERTIFICATE";

/// Parse DER or PEM certificate data, keeping file order
pub fn parse_certificates(data: &[u8]) -> Result<Vec<Certificate>, SourceError> {
    if data.iter().all(u8::is_ascii_whitespace) {
        return Err(SourceError::InvalidCertificate("empty certificate data".into()));
    }

    if !looks_like_pem(data) {
        return Ok(vec![Certificate::new(data.to_vec())]);
    }

    let text = std::str::from_utf8(data)
        .map_err(|e| SourceError::InvalidCertificate(format!("PEM is not UTF-8: {}", e)))?;

    let mut certificates = Vec::new();
    // label and base64 body of the open certificate block
    let mut block: Option<(&str, String)> = None;

    for line in text.lines().map(str::trim) {
        if let Some(label) = certificate_label(line, "BEGIN") {
            block = Some((label, String::new()));
        } else if let Some(label) = certificate_label(line, "END") {
            let (open, encoded) = block.take().ok_or_else(|| {
                SourceError::InvalidCertificate(format!("END {} without BEGIN", label))
            })?;
            if open != label {
                return Err(SourceError::InvalidCertificate(format!(
                    "BEGIN {} closed by END {}",
                    open, label
                )));
            }
            let der = STANDARD
                .decode(encoded.as_bytes())
                .map_err(|e| SourceError::InvalidCertificate(format!("bad PEM body: {}", e)))?;
            let der = if label == TRUSTED_LABEL {
                leading_der_element(&der)?.to_vec()
            } else {
                der
            };
            certificates.push(Certificate::new(der));
        } else if let Some((_, body)) = block.as_mut() {
            body.push_str(line);
        }
    }

    if block.is_some() {
        return Err(SourceError::InvalidCertificate("unterminated PEM block".into()));
    }
    if certificates.is_empty() {
        return Err(SourceError::InvalidCertificate("no CERTIFICATE block in PEM data".into()));
    }

    Ok(certificates)
}

/// Read the certificates stored in `path`
pub fn read_certificates(path: &Path) -> Result<Vec<Certificate>, SourceError> {
    debug!("Reading certificates from {:?}", path);
    let data = std::fs::read(path)?;
    parse_certificates(&data)
}

fn looks_like_pem(data: &[u8]) -> bool {
    const MARKER: &[u8] = b"-----BEGIN ";
    data.windows(MARKER.len()).any(|window| window == MARKER)
}

/// Label of a `-----BEGIN <label>-----` / `-----END <label>-----` line whose
/// label names a certificate
fn certificate_label<'a>(line: &'a str, kind: &str) -> Option<&'a str> {
    let label = line
        .strip_prefix("-----")?
        .strip_prefix(kind)?
        .strip_prefix(' ')?
        .strip_suffix("-----")?;
    label.ends_with("CERTIFICATE").then_some(label)
}

/// The X.509 certificate at the start of an OpenSSL trusted certificate,
/// without the trust settings appended to it
fn leading_der_element(der: &[u8]) -> Result<&[u8], SourceError> {
    let invalid = || SourceError::InvalidCertificate("malformed TRUSTED CERTIFICATE".into());

    let (&first, rest) = der
        .get(1..)
        .and_then(|rest| rest.split_first())
        .ok_or_else(invalid)?;
    let (header, content) = if first < 0x80 {
        (2, usize::from(first))
    } else {
        let count = usize::from(first & 0x7f);
        if count == 0 || count > 4 {
            return Err(invalid());
        }
        let bytes = rest.get(..count).ok_or_else(invalid)?;
        let content = bytes
            .iter()
            .fold(0usize, |len, b| (len << 8) | usize::from(*b));
        (2 + count, content)
    };

    der.get(..header + content).ok_or_else(invalid)
}
