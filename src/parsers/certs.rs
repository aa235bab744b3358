//! X.509 parsing for TLS Secrets: base64-decode `tls.crt`, parse the
//! DER-encoded certificate via `x509-parser`, read `notAfter`.

use base64::Engine;
use chrono::{DateTime, Utc};
use x509_parser::pem::Pem;

#[derive(Debug, Clone)]
pub struct ParsedCertificate {
    pub subject: String,
    pub not_after: DateTime<Utc>,
}

/// Decodes `tls.crt` (base64, as Kubernetes Secret `data` values arrive) and
/// parses the DER-encoded X.509 certificate (via the PEM block it's usually
/// wrapped in), returning its subject and `notAfter`. Always parses the real
/// certificate; never approximates its expiry.
pub fn parse_tls_crt(tls_crt_base64: &str) -> Option<ParsedCertificate> {
    let pem_bytes = base64::engine::general_purpose::STANDARD.decode(tls_crt_base64.trim()).ok()?;
    if pem_bytes.is_empty() {
        return None;
    }
    let pem = Pem::iter_from_buffer(&pem_bytes).flatten().next()?;
    let cert = pem.parse_x509().ok()?;
    let subject = cert.subject().to_string();
    let not_after = cert.validity().not_after;
    let unix = not_after.timestamp();
    let not_after_utc = DateTime::<Utc>::from_timestamp(unix, 0)?;
    Some(ParsedCertificate {
        subject,
        not_after: not_after_utc,
    })
}

/// `days_left = floor((notAfter - now) / 1 day)`, matching spec testable
/// property 7 exactly (including negative values for already-expired certs).
pub fn days_until_expiry(not_after: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (not_after - now).num_seconds().div_euclid(86_400)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn days_left_floors_towards_negative_infinity() {
        let now = Utc::now();
        let in_8_days = now + Duration::days(8) + Duration::hours(1);
        assert_eq!(days_until_expiry(in_8_days, now), 8);

        let expired_2_days_ago = now - Duration::days(2) - Duration::hours(1);
        assert_eq!(days_until_expiry(expired_2_days_ago, now), -3);
    }

    #[test]
    fn scenario_d_expiring_tls_secret_thresholds() {
        let now = Utc::now();
        // notAfter = now + 8 days -> Warning (<=14, not <=3)
        let days = days_until_expiry(now + Duration::days(8), now);
        assert_eq!(days, 8);
        assert!(days <= 14 && days > 3);

        // notAfter = now + 2 days -> Critical (<=3)
        let days_critical = days_until_expiry(now + Duration::days(2), now);
        assert!(days_critical <= 3);
    }
}
