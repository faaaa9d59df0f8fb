use serde::{Deserialize, Serialize};

use crate::dir::Resource;

/// A `new-cert` request containing the signed CSR.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCertificate {
    pub resource: Resource,

    /// Certificate Signing Request (CSR) in base64url-encoded DER.
    ///
    /// Note: not PEM, since headers are omitted.
    pub csr: String,
}

impl NewCertificate {
    pub(crate) fn new(csr: String) -> Self {
        NewCertificate {
            resource: Resource::NewCertificate,
            csr,
        }
    }
}
