use chrono::{DateTime, Utc};
use totp_rs::{Algorithm, Secret, TOTP};

use crate::error::AppError;

/// RFC 6238 parameters shared with every authenticator app we provision:
/// 6-digit codes over HMAC-SHA1 with a 30-second step.
const DIGITS: usize = 6;
const STEP_SECONDS: u64 = 30;
/// Codes from the previous and next step are accepted to absorb clock drift
/// between the server and the user's device.
const SKEW_STEPS: u8 = 1;

fn totp_for_secret(secret: &str) -> Option<TOTP> {
    let bytes = Secret::Encoded(secret.to_string()).to_bytes().ok()?;
    TOTP::new(Algorithm::SHA1, DIGITS, SKEW_STEPS, STEP_SECONDS, bytes).ok()
}

/// Checks a one-time code against a base32 secret at the given instant.
///
/// Stateless: nothing is recorded about the attempt. A secret that cannot be
/// decoded, or is too short for the underlying library, fails the check
/// rather than erroring; a corrupt stored secret must read as a bad code,
/// not a server fault.
pub fn verify_code(secret: &str, code: &str, at: DateTime<Utc>) -> bool {
    match totp_for_secret(secret) {
        Some(totp) => totp.check(code, at.timestamp() as u64),
        None => {
            log::warn!("two-factor secret failed to decode; rejecting code");
            false
        }
    }
}

/// The valid code for the current step. Used where the service itself must
/// present a code rather than check one.
pub fn current_code(secret: &str) -> Result<String, AppError> {
    let totp = totp_for_secret(secret).ok_or_else(|| {
        AppError::InternalServerError("two-factor secret is not usable".to_string())
    })?;
    Ok(totp.generate(Utc::now().timestamp() as u64))
}

/// Fresh base32 secret for provisioning a new user.
pub fn generate_secret() -> String {
    Secret::generate_secret().to_encoded().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SECRET: &str = "JBSWY3DPEHPK3PXPJBSWY3DPEHPK3PXP";

    fn code_at(at: DateTime<Utc>) -> String {
        totp_for_secret(SECRET)
            .expect("test secret must decode")
            .generate(at.timestamp() as u64)
    }

    #[test]
    fn test_current_step_code_validates() {
        let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        assert!(verify_code(SECRET, &code_at(at), at));
    }

    #[test]
    fn test_adjacent_step_codes_validate() {
        let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let previous = at - chrono::Duration::seconds(STEP_SECONDS as i64);
        let next = at + chrono::Duration::seconds(STEP_SECONDS as i64);

        assert!(verify_code(SECRET, &code_at(previous), at));
        assert!(verify_code(SECRET, &code_at(next), at));
    }

    #[test]
    fn test_code_outside_skew_window_rejected() {
        let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let stale = at - chrono::Duration::seconds(2 * STEP_SECONDS as i64);

        assert!(!verify_code(SECRET, &code_at(stale), at));
    }

    #[test]
    fn test_wrong_code_rejected() {
        let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let valid = code_at(at);
        let wrong = if valid == "123456" { "654321" } else { "123456" };

        assert!(!verify_code(SECRET, wrong, at));
    }

    #[test]
    fn test_malformed_secret_rejects_without_panicking() {
        let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();

        // Not base32 at all.
        assert!(!verify_code("this is not base32!!", "123456", at));
        // Decodes, but far too short for the library.
        assert!(!verify_code("JBSWY3DP", "123456", at));
        // Empty.
        assert!(!verify_code("", "123456", at));
    }

    #[test]
    fn test_generated_secret_round_trips() {
        let secret = generate_secret();
        let code = current_code(&secret).unwrap();

        assert_eq!(code.len(), DIGITS);
        assert!(verify_code(&secret, &code, Utc::now()));
    }

    #[test]
    fn test_current_code_on_malformed_secret_is_an_error() {
        assert!(current_code("not base32 either!").is_err());
    }
}
