use base64::prelude::*;

const PEM_LINE_LEN: usize = 64;

pub(crate) fn base64url<T: ?Sized + AsRef<[u8]>>(input: &T) -> String {
    BASE64_URL_SAFE_NO_PAD.encode(input)
}

/// Wraps DER bytes in `CERTIFICATE` armour, 64 columns per line, `\n` line endings.
pub(crate) fn pem_encode_certificate(der: &[u8]) -> String {
    let body = BASE64_STANDARD.encode(der);

    let mut pem = String::with_capacity(body.len() + body.len() / PEM_LINE_LEN + 64);
    pem.push_str("-----BEGIN CERTIFICATE-----\n");

    let mut rest = body.as_str();
    while !rest.is_empty() {
        let (line, tail) = rest.split_at(rest.len().min(PEM_LINE_LEN));
        pem.push_str(line);
        pem.push('\n');
        rest = tail;
    }

    pem.push_str("-----END CERTIFICATE-----\n");
    pem
}

/// Strips the armour lines and whitespace off a PEM document and decodes the base64 body.
pub(crate) fn pem_decode_body(pem: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let body = pem
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with("-----"))
        .flat_map(|line| line.split_whitespace())
        .collect::<String>();

    BASE64_STANDARD.decode(body)
}
