//! Serialization versioning helpers.

use serde::de::Error as DeError;

use crate::error::ForeError;

pub const STORED_BUFFER_VERSION: u16 = 1;
pub const BUFFER_SIGNATURE_VERSION: u16 = 1;

pub fn expect_version<E: DeError>(found: u16, expected: u16, label: &'static str) -> Result<(), E> {
    if found != expected {
        return Err(E::custom(format!(
            "{} version mismatch: expected {}, found {}",
            label, expected, found
        )));
    }
    Ok(())
}

pub(crate) fn check_version(
    found: u16,
    expected: u16,
    context: &'static str,
) -> Result<(), ForeError> {
    if found != expected {
        return Err(ForeError::VersionMismatch {
            context,
            expected,
            found,
        });
    }
    Ok(())
}
