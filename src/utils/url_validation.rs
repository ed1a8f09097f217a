//! Validation for provider base-URL overrides.
//!
//! Synthesis clients attach API keys to every request, so a misdirected base
//! URL leaks credentials. Overrides from config must therefore:
//! - Use HTTP(S) only
//! - Use HTTPS unless pointing at loopback (local mocks and relays)
//! - Never point at private/internal addresses other than loopback
//!
//! Hostnames are not resolved here; a domain override is checked
//! structurally and DNS is left to the HTTP client at request time.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use thiserror::Error;
use tracing::warn;
use url::Url;

/// Errors that can occur during base-URL validation
#[derive(Debug, Error)]
pub enum UrlValidationError {
    #[error("Invalid URL format: {0}")]
    InvalidFormat(#[from] url::ParseError),

    #[error("URL scheme must be http or https, got: {0}")]
    UnsupportedScheme(String),

    #[error("URL scheme must be HTTPS for non-loopback hosts, got: {0}")]
    HttpsRequired(String),

    #[error("URL must have a host")]
    MissingHost,

    #[error("URL points at a private/internal IP address: {0}")]
    PrivateIpDetected(IpAddr),
}

/// Checks if an IPv4 address is private/internal.
///
/// Covers loopback, RFC1918 ranges, link-local, broadcast, unspecified,
/// documentation nets, CGNAT (100.64.0.0/10) and the benchmarking range
/// (198.18.0.0/15).
pub fn is_private_ipv4(ip: &Ipv4Addr) -> bool {
    let octets = ip.octets();
    ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_broadcast()
        || ip.is_unspecified()
        || ip.is_documentation()
        || (octets[0] == 100 && (octets[1] & 0xC0) == 64)
        || (octets[0] == 198 && (octets[1] == 18 || octets[1] == 19))
}

/// Checks if an IPv6 address is private/internal.
///
/// Covers loopback, unspecified, link-local (fe80::/10), unique local
/// (fc00::/7), documentation (2001:db8::/32) and private IPv4-mapped
/// addresses.
pub fn is_private_ipv6(ip: &Ipv6Addr) -> bool {
    if ip.is_loopback() || ip.is_unspecified() {
        return true;
    }
    let segments = ip.segments();
    if segments[0] & 0xFFC0 == 0xFE80 {
        return true;
    }
    if segments[0] & 0xFE00 == 0xFC00 {
        return true;
    }
    if segments[0] == 0x2001 && segments[1] == 0x0DB8 {
        return true;
    }
    if let Some(ipv4) = ip.to_ipv4_mapped() {
        return is_private_ipv4(&ipv4);
    }
    false
}

/// Checks if an IP address is private/internal
pub fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => is_private_ipv4(ipv4),
        IpAddr::V6(ipv6) => is_private_ipv6(ipv6),
    }
}

/// Validates a synthesis provider base-URL override.
///
/// Accepted:
/// - `https://` + domain (production relays)
/// - `http://` or `https://` + `localhost` / loopback IP (mocks, local relays)
/// - `https://` + public raw IP (self-hosted endpoints)
///
/// Rejected:
/// - Non-HTTP schemes
/// - Plain `http://` to anything that is not loopback
/// - Raw IPs in private/internal ranges
///
/// # Example
/// ```rust,ignore
/// use narrata_audio::utils::url_validation::validate_base_url;
///
/// assert!(validate_base_url("https://relay.example.com").is_ok());
/// assert!(validate_base_url("http://127.0.0.1:9090").is_ok());
/// assert!(validate_base_url("http://relay.example.com").is_err());
/// assert!(validate_base_url("https://169.254.169.254").is_err());
/// ```
pub fn validate_base_url(url: &str) -> Result<(), UrlValidationError> {
    let parsed = Url::parse(url)?;

    let scheme = parsed.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(UrlValidationError::UnsupportedScheme(scheme.to_string()));
    }

    match parsed.host() {
        Some(url::Host::Domain(domain)) => {
            if domain.eq_ignore_ascii_case("localhost") {
                return Ok(());
            }
            if scheme != "https" {
                return Err(UrlValidationError::HttpsRequired(scheme.to_string()));
            }
            Ok(())
        }
        Some(url::Host::Ipv4(ip)) => {
            if ip.is_loopback() {
                return Ok(());
            }
            if is_private_ipv4(&ip) {
                warn!(host = %ip, "Base URL override points at a private address");
                return Err(UrlValidationError::PrivateIpDetected(IpAddr::V4(ip)));
            }
            if scheme != "https" {
                return Err(UrlValidationError::HttpsRequired(scheme.to_string()));
            }
            Ok(())
        }
        Some(url::Host::Ipv6(ip)) => {
            if ip.is_loopback() {
                return Ok(());
            }
            if is_private_ipv6(&ip) {
                warn!(host = %ip, "Base URL override points at a private address");
                return Err(UrlValidationError::PrivateIpDetected(IpAddr::V6(ip)));
            }
            if scheme != "https" {
                return Err(UrlValidationError::HttpsRequired(scheme.to_string()));
            }
            Ok(())
        }
        None => Err(UrlValidationError::MissingHost),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_private_ipv4_ranges() {
        assert!(is_private_ipv4(&Ipv4Addr::new(127, 0, 0, 1)));
        assert!(is_private_ipv4(&Ipv4Addr::new(10, 0, 0, 1)));
        assert!(is_private_ipv4(&Ipv4Addr::new(172, 16, 0, 1)));
        assert!(!is_private_ipv4(&Ipv4Addr::new(172, 32, 0, 1)));
        assert!(is_private_ipv4(&Ipv4Addr::new(192, 168, 1, 1)));
        assert!(is_private_ipv4(&Ipv4Addr::new(169, 254, 169, 254)));
        assert!(is_private_ipv4(&Ipv4Addr::new(0, 0, 0, 0)));
        assert!(is_private_ipv4(&Ipv4Addr::new(255, 255, 255, 255)));
    }

    #[test]
    fn test_is_private_ipv4_cgnat_and_benchmarking() {
        assert!(is_private_ipv4(&Ipv4Addr::new(100, 64, 0, 1)));
        assert!(is_private_ipv4(&Ipv4Addr::new(100, 127, 255, 255)));
        assert!(!is_private_ipv4(&Ipv4Addr::new(100, 128, 0, 1)));
        assert!(is_private_ipv4(&Ipv4Addr::new(198, 18, 0, 1)));
        assert!(!is_private_ipv4(&Ipv4Addr::new(198, 20, 0, 1)));
    }

    #[test]
    fn test_is_private_ipv4_public() {
        assert!(!is_private_ipv4(&Ipv4Addr::new(8, 8, 8, 8)));
        assert!(!is_private_ipv4(&Ipv4Addr::new(1, 1, 1, 1)));
    }

    #[test]
    fn test_is_private_ipv6_ranges() {
        assert!(is_private_ipv6(&Ipv6Addr::LOCALHOST));
        assert!(is_private_ipv6(&Ipv6Addr::UNSPECIFIED));
        assert!(is_private_ipv6(&Ipv6Addr::new(0xFE80, 0, 0, 0, 0, 0, 0, 1)));
        assert!(is_private_ipv6(&Ipv6Addr::new(0xFC00, 0, 0, 0, 0, 0, 0, 1)));
        assert!(is_private_ipv6(&Ipv6Addr::new(
            0x2001, 0x0DB8, 0, 0, 0, 0, 0, 1
        )));
        assert!(!is_private_ipv6(&Ipv6Addr::new(
            0x2001, 0x4860, 0x4860, 0, 0, 0, 0, 0x8888
        )));
    }

    #[test]
    fn test_validate_rejects_bad_inputs() {
        assert!(matches!(
            validate_base_url("not-a-url"),
            Err(UrlValidationError::InvalidFormat(_))
        ));
        assert!(matches!(
            validate_base_url("ftp://files.example.com"),
            Err(UrlValidationError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            validate_base_url("http://relay.example.com"),
            Err(UrlValidationError::HttpsRequired(_))
        ));
    }

    #[test]
    fn test_validate_accepts_https_domains() {
        assert!(validate_base_url("https://relay.example.com").is_ok());
        assert!(validate_base_url("https://api.eu.example.com:8443/v1").is_ok());
    }

    #[test]
    fn test_validate_accepts_loopback_any_scheme() {
        assert!(validate_base_url("http://localhost:9090").is_ok());
        assert!(validate_base_url("http://127.0.0.1:9090").is_ok());
        assert!(validate_base_url("https://127.0.0.1").is_ok());
        assert!(validate_base_url("http://[::1]:9090").is_ok());
    }

    #[test]
    fn test_validate_rejects_private_addresses() {
        assert!(matches!(
            validate_base_url("https://192.168.1.5"),
            Err(UrlValidationError::PrivateIpDetected(_))
        ));
        // Cloud metadata endpoint shape
        assert!(matches!(
            validate_base_url("http://169.254.169.254/latest"),
            Err(UrlValidationError::PrivateIpDetected(_))
        ));
        assert!(matches!(
            validate_base_url("https://[fd00::1]"),
            Err(UrlValidationError::PrivateIpDetected(_))
        ));
    }

    #[test]
    fn test_validate_public_raw_ip_requires_https() {
        assert!(validate_base_url("https://8.8.8.8").is_ok());
        assert!(matches!(
            validate_base_url("http://8.8.8.8"),
            Err(UrlValidationError::HttpsRequired(_))
        ));
    }
}
