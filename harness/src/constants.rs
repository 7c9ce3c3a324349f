pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Bounded retry count for the incident-transition transaction on a
/// unique-violation of the open-incident index (§4.3: "bounded to a small
/// constant (e.g. 3)").
pub const INCIDENT_CONTENTION_RETRIES: u32 = 3;

/// Normalized error kinds (§4.1). Stable, user-facing strings.
pub const ERROR_TIMEOUT: &str = "timeout";
pub const ERROR_CONNECT: &str = "connect_error";
pub const ERROR_DNS: &str = "dns_error";
pub const ERROR_TLS: &str = "tls_error";
pub const ERROR_TRANSPORT: &str = "transport_error";
pub const ERROR_OTHER: &str = "other";
