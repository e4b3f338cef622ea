// Secret values handled during setup: the operator's personal access token
// and the short-lived registration token issued in exchange for it.

use runner_common::secret_masker::{SecretMasker, MASK};
use std::fmt;

/// Overwrite a string's buffer with zeros and release it.
pub fn wipe(value: &mut String) {
    let mut bytes = std::mem::take(value).into_bytes();
    bytes.iter_mut().for_each(|b| *b = 0);
    std::hint::black_box(&bytes);
}

/// The operator's long-lived personal access token.
///
/// Renders as `***` through `Debug` and `Display`. Moved by value into the
/// registration client; the buffer is zeroed when it is dropped.
pub struct Credential {
    value: String,
}

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// Build from raw operator input: trims surrounding whitespace and wipes `raw`.
    pub fn from_raw(mut raw: String) -> Self {
        let value = raw.trim().to_string();
        wipe(&mut raw);
        Self { value }
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn expose_secret(&self) -> &str {
        &self.value
    }

    /// Add the value to `masker` so no trace line can contain it.
    pub fn register(&self, masker: &SecretMasker) {
        masker.add_value(&self.value);
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(MASK)
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(MASK)
    }
}

impl Drop for Credential {
    fn drop(&mut self) {
        wipe(&mut self.value);
    }
}

/// A single-use registration token. Consumed by value when the runner is
/// configured; deliberately not `Clone`.
pub struct RegistrationToken {
    value: String,
}

impl RegistrationToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn expose_secret(&self) -> &str {
        &self.value
    }
}

impl fmt::Debug for RegistrationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(MASK)
    }
}

impl fmt::Display for RegistrationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(MASK)
    }
}

impl Drop for RegistrationToken {
    fn drop(&mut self) {
        wipe(&mut self.value);
    }
}
