use std::{
    io::{BufReader, Cursor},
    iter,
};

use der::{asn1::Ia5String, Decode as _, EncodePem as _};
use eyre::{eyre, WrapErr as _};
use pkcs8::{DecodePrivateKey as _, EncodePrivateKey as _};
use time::{OffsetDateTime, PrimitiveDateTime};
use x509_cert::{
    builder::{Builder, RequestBuilder as CsrBuilder},
    ext::pkix::{name::GeneralName, SubjectAltName},
    name::Name,
};
use zeroize::Zeroizing;

use crate::util::pem_decode_body;

/// Make a P-256 private key (from which we can derive a public key).
pub fn create_p256_key() -> p256::ecdsa::SigningKey {
    let csprng = &mut rand::thread_rng();
    ecdsa::SigningKey::from(p256::SecretKey::random(csprng))
}

/// Subject of a certificate request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistinguishedName {
    /// The primary domain, used as `CN` and as the first SAN entry.
    pub common_name: String,
    pub organization: Option<String>,
    /// Two letter country code.
    pub country: Option<String>,
    /// Further domains added to the Subject Alternative Name extension.
    pub alt_names: Vec<String>,
}

impl DistinguishedName {
    pub fn new(common_name: impl Into<String>) -> Self {
        DistinguishedName {
            common_name: common_name.into(),
            organization: None,
            country: None,
            alt_names: Vec::new(),
        }
    }

    /// All domains, primary first, without duplicates.
    pub fn domains(&self) -> Vec<&str> {
        let mut domains = Vec::new();
        for domain in iter::once(&self.common_name).chain(&self.alt_names) {
            if !domains.contains(&domain.as_str()) {
                domains.push(domain.as_str());
            }
        }
        domains
    }

    /// RFC 4514 form, e.g. `CN=example.org,O=Example,C=SE`.
    fn to_rfc4514(&self) -> String {
        let mut dn = format!("CN={}", escape_rdn_value(&self.common_name));
        if let Some(organization) = &self.organization {
            dn.push_str(&format!(",O={}", escape_rdn_value(organization)));
        }
        if let Some(country) = &self.country {
            dn.push_str(&format!(",C={}", escape_rdn_value(country)));
        }
        dn
    }
}

fn escape_rdn_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// The subject and key pair a certificate is requested for.
#[derive(Debug, Clone)]
pub struct CertificateRequest {
    dn: DistinguishedName,
    signing_key: p256::ecdsa::SigningKey,
}

impl CertificateRequest {
    pub fn new(dn: DistinguishedName, signing_key: p256::ecdsa::SigningKey) -> Self {
        CertificateRequest { dn, signing_key }
    }

    /// Request with a freshly generated P-256 key.
    pub fn generate(dn: DistinguishedName) -> Self {
        Self::new(dn, create_p256_key())
    }

    pub fn from_private_key_pem(dn: DistinguishedName, private_key_pem: &str) -> eyre::Result<Self> {
        let signing_key = ecdsa::SigningKey::<p256::NistP256>::from_pkcs8_pem(private_key_pem)
            .wrap_err("Error reading private key PEM")?;
        Ok(Self::new(dn, signing_key))
    }

    pub fn distinguished_name(&self) -> &DistinguishedName {
        &self.dn
    }

    /// The certificate's private key in PEM format.
    pub fn private_key_pem(&self) -> eyre::Result<Zeroizing<String>> {
        self.signing_key
            .to_pkcs8_pem(pem::LineEnding::LF)
            .wrap_err("private_key_to_pem")
    }

    /// Creates the CSR and signs it with the request's key.
    ///
    /// The common name is the CSR's `CN`; every domain goes into a Subject Alternative Name
    /// extension.
    pub fn to_csr_pem(&self) -> eyre::Result<String> {
        let subject = self
            .dn
            .to_rfc4514()
            .parse::<Name>()
            .wrap_err("invalid distinguished name")?;

        let mut csr = CsrBuilder::new(subject, &self.signing_key).wrap_err("csr builder")?;

        let san = self
            .dn
            .domains()
            .into_iter()
            .map(|domain| Ok(GeneralName::DnsName(Ia5String::new(domain)?)))
            .collect::<der::Result<Vec<_>>>()
            .wrap_err("domain is not IA5")?;
        csr.add_extension(&SubjectAltName(san))
            .wrap_err("add SAN extension")?;

        let csr = csr
            .build::<p256::ecdsa::DerSignature>()
            .wrap_err("build csr")?;

        csr.to_pem(pem::LineEnding::LF).wrap_err("csr to pem")
    }
}

/// A PEM certificate and, unless it is the last one known, the certificate of its issuer.
///
/// The leaf returned by [`Client::request_certificate()`] owns the whole chain up to the last
/// issuer the CA linked.
///
/// [`Client::request_certificate()`]: crate::Client::request_certificate()
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    pem: String,
    issuer: Option<Box<Certificate>>,
}

impl Certificate {
    pub fn new(pem: String, issuer: Option<Certificate>) -> Self {
        Certificate {
            pem,
            issuer: issuer.map(Box::new),
        }
    }

    /// Builds a chain from PEMs ordered leaf first.
    pub(crate) fn from_chain(leaf: String, issuers: Vec<String>) -> Self {
        let issuer = issuers
            .into_iter()
            .rev()
            .fold(None, |issuer, pem| Some(Certificate::new(pem, issuer)));

        Certificate::new(leaf, issuer)
    }

    /// This certificate in PEM format.
    pub fn pem(&self) -> &str {
        &self.pem
    }

    pub fn issuer(&self) -> Option<&Certificate> {
        self.issuer.as_deref()
    }

    /// This certificate followed by its issuers, leaf to root.
    pub fn chain(&self) -> impl Iterator<Item = &Certificate> {
        iter::successors(Some(self), |cert| cert.issuer())
    }

    /// Number of certificates in the chain, this one included.
    pub fn depth(&self) -> usize {
        self.chain().count()
    }

    /// The chain concatenated into one PEM document, as most servers want it.
    pub fn full_chain_pem(&self) -> String {
        self.chain().map(Certificate::pem).collect()
    }

    /// This certificate in DER encoding.
    pub fn der(&self) -> eyre::Result<Vec<u8>> {
        pem_decode_body(&self.pem).wrap_err("certificate PEM")
    }

    /// The chain in DER format, leaf first.
    pub fn certificate_chain(&self) -> eyre::Result<Vec<Vec<u8>>> {
        let full_chain = self.full_chain_pem();
        let mut rdr = BufReader::new(Cursor::new(full_chain.as_bytes()));

        rustls_pemfile::certs(&mut rdr)
            .map(|res| res.map(|cert| cert.to_vec()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    /// Inspect the certificate to count the number of (whole) valid days left.
    ///
    /// It's up to the ACME API provider to decide how long an issued certificate is valid.
    /// Let's Encrypt sets the validity to 90 days. This function reports 89 days for newly
    /// issued cert, since it counts _whole_ days.
    ///
    /// It is possible to get negative days for an expired certificate.
    pub fn valid_days_left(&self) -> eyre::Result<i64> {
        let cert = x509_cert::Certificate::from_der(&self.der()?)?;

        let not_after = cert.tbs_certificate.validity.not_after.to_date_time();
        // X.509 validity times are always UTC
        let not_after = PrimitiveDateTime::try_from(not_after)
            .map_err(|err| eyre!("not_after out of range: {err}"))?
            .assume_utc();

        let diff = not_after - OffsetDateTime::now_utc();

        Ok(diff.whole_days())
    }
}

/// An issued certificate together with the request it answers.
#[derive(Debug, Clone)]
pub struct CertificateResponse {
    pub request: CertificateRequest,
    pub certificate: Certificate,
}

impl CertificateResponse {
    /// The certificate's private key in PEM format.
    pub fn private_key_pem(&self) -> eyre::Result<Zeroizing<String>> {
        self.request.private_key_pem()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    pub(crate) const LEAF_DER: &[u8] = include_bytes!("../tests/fixtures/leaf.der");
    pub(crate) const INTERMEDIATE_DER: &[u8] = include_bytes!("../tests/fixtures/intermediate.der");
    pub(crate) const ROOT_DER: &[u8] = include_bytes!("../tests/fixtures/root.der");
}

#[cfg(test)]
mod tests {
    use x509_cert::request::CertReq;

    use super::{fixtures::*, *};
    use crate::util::pem_encode_certificate;

    fn test_chain() -> Certificate {
        Certificate::from_chain(
            pem_encode_certificate(LEAF_DER),
            vec![
                pem_encode_certificate(INTERMEDIATE_DER),
                pem_encode_certificate(ROOT_DER),
            ],
        )
    }

    #[test]
    fn test_chain_order() {
        let leaf = test_chain();
        assert_eq!(leaf.depth(), 3);

        let ders = leaf
            .chain()
            .map(|cert| cert.der().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(ders, [LEAF_DER, INTERMEDIATE_DER, ROOT_DER]);

        let root = leaf.issuer().unwrap().issuer().unwrap();
        assert!(root.issuer().is_none());
    }

    #[test]
    fn test_certificate_chain_der() {
        let chain = test_chain().certificate_chain().unwrap();
        assert_eq!(chain, [LEAF_DER, INTERMEDIATE_DER, ROOT_DER]);
    }

    #[test]
    fn test_leaf_only() {
        let leaf = Certificate::from_chain(pem_encode_certificate(LEAF_DER), Vec::new());
        assert_eq!(leaf.depth(), 1);
        assert_eq!(leaf.full_chain_pem(), leaf.pem());
    }

    #[test]
    fn test_valid_days_left() {
        // fixture leaf expires in 2122
        let days = test_chain().valid_days_left().unwrap();
        assert!(days > 0);
        assert!(days < 35_000);
    }

    #[test]
    fn test_domains_dedup() {
        let mut dn = DistinguishedName::new("example.org");
        dn.alt_names = vec!["www.example.org".to_owned(), "example.org".to_owned()];
        assert_eq!(dn.domains(), ["example.org", "www.example.org"]);
    }

    #[test]
    fn test_rfc4514_escaping() {
        let mut dn = DistinguishedName::new("example.org");
        dn.organization = Some("Example, Inc.".to_owned());
        dn.country = Some("SE".to_owned());
        assert_eq!(dn.to_rfc4514(), r"CN=example.org,O=Example\, Inc.,C=SE");
    }

    #[test]
    fn test_csr_pem() {
        let mut dn = DistinguishedName::new("acme-test.example.com");
        dn.alt_names.push("www.acme-test.example.com".to_owned());
        let req = CertificateRequest::generate(dn);

        let pem = req.to_csr_pem().unwrap();
        assert!(pem.starts_with("-----BEGIN CERTIFICATE REQUEST-----\n"));

        let der = pem_decode_body(&pem).unwrap();
        let csr = CertReq::from_der(&der).unwrap();
        assert_eq!(csr.info.subject.to_string(), "CN=acme-test.example.com");
        assert_eq!(csr.info.attributes.len(), 1);
    }

    #[test]
    fn test_private_key_round_trip() {
        let req = CertificateRequest::generate(DistinguishedName::new("example.org"));
        let pem = req.private_key_pem().unwrap();

        let again =
            CertificateRequest::from_private_key_pem(DistinguishedName::new("example.org"), &pem)
                .unwrap();
        assert_eq!(*again.private_key_pem().unwrap(), *pem);
    }
}
