//! What a mechanism may ask of an inbound request, whatever front-end
//! received it.

use salvo::http::header::HeaderMap;

/// Subject of a verified client certificate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerCertificate {
    subject: Vec<(String, String)>,
}

impl PeerCertificate {
    #[must_use]
    pub const fn new(subject: Vec<(String, String)>) -> Self {
        Self { subject }
    }

    /// ## Summary
    /// Parses an OpenSSL style `/CN=host/O=org` or RFC 4514 style
    /// `CN=host,O=org` subject. Components without `=` are skipped.
    #[must_use]
    pub fn from_subject(subject: &str) -> Self {
        let separator = if subject.starts_with('/') { '/' } else { ',' };
        let subject = subject
            .split(separator)
            .filter_map(|part| part.split_once('='))
            .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
            .collect();
        Self { subject }
    }

    #[must_use]
    pub fn subject(&self) -> &[(String, String)] {
        &self.subject
    }

    #[must_use]
    pub fn common_name(&self) -> Option<&str> {
        self.subject
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case("CN"))
            .map(|(_, value)| value.as_str())
            .filter(|value| !value.is_empty())
    }
}

/// Capabilities a server strategy needs from a raw request.
pub trait PeerRequest: Sync {
    fn header(&self, name: &str) -> Option<&str>;

    /// The verified client certificate, when the front-end terminated TLS.
    fn peer_certificate(&self) -> Option<&PeerCertificate>;
}

/// A salvo request seen through [`PeerRequest`].
///
/// A front-end that terminates TLS itself must place the verified
/// [`PeerCertificate`] into the request extensions before authentication
/// runs. The proxy front-end only forwards headers.
pub struct SalvoPeerRequest<'a> {
    headers: &'a HeaderMap,
    certificate: Option<&'a PeerCertificate>,
}

impl<'a> SalvoPeerRequest<'a> {
    #[must_use]
    pub fn new(req: &'a salvo::Request) -> Self {
        Self {
            headers: req.headers(),
            certificate: req.extensions().get::<PeerCertificate>(),
        }
    }
}

impl PeerRequest for SalvoPeerRequest<'_> {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    fn peer_certificate(&self) -> Option<&PeerCertificate> {
        self.certificate
    }
}

/// An in-memory request, for adapters that are not salvo based.
#[derive(Debug, Clone, Default)]
pub struct StaticPeerRequest {
    pub headers: Vec<(String, String)>,
    pub certificate: Option<PeerCertificate>,
}

impl StaticPeerRequest {
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    #[must_use]
    pub fn with_certificate(mut self, certificate: PeerCertificate) -> Self {
        self.certificate = Some(certificate);
        self
    }
}

impl PeerRequest for StaticPeerRequest {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    fn peer_certificate(&self) -> Option<&PeerCertificate> {
        self.certificate.as_ref()
    }
}
