//! Device-flow code generation and redemption checks
//!
//! Two independent secrets per pairing: a long base64url `device_code`
//! held by the display and a short base32 `user_code` typed by an operator.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use ring::rand::{SecureRandom, SystemRandom};
use uuid::Uuid;

use crate::errors::{MarqueeError, Result};
use crate::model::DeviceCode;

/// Random bytes behind a device code (43 base64url characters)
pub const DEVICE_CODE_BYTES: usize = 32;

/// Random bytes behind a user code (8 base32 characters)
pub const USER_CODE_BYTES: usize = 5;

const USER_CODE_ALPHABET: base32::Alphabet = base32::Alphabet::Rfc4648 { padding: false };

/// Source of randomness for codes
pub trait CodeEntropy: Send + Sync {
    /// # Errors
    /// `Internal` if the source cannot produce bytes.
    fn fill(&self, dest: &mut [u8]) -> Result<()>;
}

/// Operating-system CSPRNG
#[derive(Debug)]
pub struct SystemEntropy {
    rng: SystemRandom,
}

impl SystemEntropy {
    pub fn new() -> Self {
        Self {
            rng: SystemRandom::new(),
        }
    }
}

impl Default for SystemEntropy {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeEntropy for SystemEntropy {
    fn fill(&self, dest: &mut [u8]) -> Result<()> {
        self.rng.fill(dest).map_err(|_| MarqueeError::Internal {
            message: "system random source unavailable".to_string(),
        })
    }
}

/// # Errors
/// Entropy failures.
pub fn generate_device_code(entropy: &dyn CodeEntropy) -> Result<String> {
    let mut bytes = [0u8; DEVICE_CODE_BYTES];
    entropy.fill(&mut bytes)?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// # Errors
/// Entropy failures.
pub fn generate_user_code(entropy: &dyn CodeEntropy) -> Result<String> {
    let mut bytes = [0u8; USER_CODE_BYTES];
    entropy.fill(&mut bytes)?;
    Ok(format_user_code(&base32::encode(USER_CODE_ALPHABET, &bytes)))
}

/// Split eight characters into `XXXX-XXXX`
pub fn format_user_code(raw: &str) -> String {
    let upper = raw.to_ascii_uppercase();
    if upper.len() == 8 && upper.is_ascii() {
        format!("{}-{}", &upper[..4], &upper[4..])
    } else {
        upper
    }
}

/// Canonicalize operator input: trim, uppercase, drop inner spaces, and
/// insert the hyphen when eight bare characters were typed
///
/// # Errors
/// `InvalidInput` when the result is not `XXXX-XXXX` over the base32
/// alphabet.
pub fn normalize_user_code(input: &str) -> Result<String> {
    let compact: String = input
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_uppercase();
    let bare = compact.replacen('-', "", 1);

    let well_formed = bare.len() == 8
        && bare.chars().all(|c| matches!(c, 'A'..='Z' | '2'..='7'))
        && (compact.len() == 8 || compact.find('-') == Some(4));
    if !well_formed {
        return Err(MarqueeError::invalid_input(format!(
            "'{}' is not a valid user code",
            input.trim()
        )));
    }
    Ok(format_user_code(&bare))
}

/// Mint a fresh, unactivated pairing
///
/// # Errors
/// Entropy failures.
pub fn new_device_code(
    entropy: &dyn CodeEntropy,
    now: DateTime<Utc>,
    ttl: Duration,
    poll_interval_secs: u32,
) -> Result<DeviceCode> {
    Ok(DeviceCode {
        id: Uuid::now_v7().to_string(),
        device_code: generate_device_code(entropy)?,
        user_code: generate_user_code(entropy)?,
        created_at: now,
        expires_at: now + ttl,
        poll_interval_secs,
        activated: false,
        activated_at: None,
        display_id: None,
    })
}

/// Whether a display may still poll this code
///
/// # Errors
/// * `CodeExpired` - `now >= expires_at`
pub fn check_pollable(code: &DeviceCode, now: DateTime<Utc>) -> Result<()> {
    if code.is_expired(now) {
        return Err(MarqueeError::CodeExpired {
            code_id: code.id.clone(),
            expired_at: code.expires_at,
        });
    }
    Ok(())
}

/// Whether an operator may redeem this code
///
/// # Errors
/// * `CodeExpired` - `now >= expires_at`
/// * `CodeAlreadyActive` - the code was redeemed before
pub fn check_redeemable(code: &DeviceCode, now: DateTime<Utc>) -> Result<()> {
    check_pollable(code, now)?;
    if code.activated {
        return Err(MarqueeError::CodeAlreadyActive {
            code_id: code.id.clone(),
            display_id: code.display_id.clone(),
        });
    }
    Ok(())
}
