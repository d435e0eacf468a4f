/// Default locations of the TLS material managed by the certificate subsystem
pub const DEFAULT_SSL_DIR: &str = "ssl";
pub const DEFAULT_HOST_CERT: &str = const_str::concat!(DEFAULT_SSL_DIR, "/certs/host.pem");
pub const DEFAULT_HOST_PRIVATE_KEY: &str =
    const_str::concat!(DEFAULT_SSL_DIR, "/private_keys/host.pem");
pub const DEFAULT_LOCAL_CA_CERT: &str = const_str::concat!(DEFAULT_SSL_DIR, "/certs/ca.pem");

/// Default authorization rule file
pub const DEFAULT_REST_AUTHCONFIG: &str = "auth.conf";

/// Headers a reverse TLS proxy uses to forward the client certificate outcome
pub const DEFAULT_SSL_CLIENT_HEADER: &str = "X-Client-DN";
pub const DEFAULT_SSL_CLIENT_VERIFY_HEADER: &str = "X-Client-Verify";
pub const SSL_CLIENT_VERIFY_SUCCESS: &str = "SUCCESS";

/// Route component constants shared across crates
pub const HEALTHCHECK_ROUTE_COMPONENT: &str = "healthcheck";
pub const WHOAMI_ROUTE_COMPONENT: &str = "whoami";
