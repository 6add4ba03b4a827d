//! Versioned wire codec for ledger account payloads.
//!
//! Account payloads carry a one-byte schema version followed by a
//! bincode body. Version 1 of the profile schema is the legacy layout
//! without a last-check-in timestamp; version 2 is current. Decoding is
//! explicit about versions: an unknown version is a typed error, never a
//! field-by-field guess.

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;
use crate::models::{DailyRecord, Identity, Profile, SystemRegistry};

/// Current profile schema version.
pub const PROFILE_VERSION: u8 = 2;
/// Legacy profile schema: no `last_check_in` field.
pub const PROFILE_VERSION_LEGACY: u8 = 1;
/// Current daily record schema version.
pub const RECORD_VERSION: u8 = 1;
/// Current registry schema version.
pub const REGISTRY_VERSION: u8 = 1;

#[derive(Serialize, Deserialize)]
struct ProfileV1 {
    owner: Identity,
    display_name: String,
    check_in_count: u64,
}

fn encode<T: Serialize>(version: u8, body: &T) -> Vec<u8> {
    let mut buf = vec![version];
    buf.extend(bincode::serialize(body).expect("serialize"));
    buf
}

fn split_version(payload: &[u8]) -> Result<(u8, &[u8]), DecodeError> {
    match payload.split_first() {
        Some((version, body)) => Ok((*version, body)),
        None => Err(DecodeError::Truncated),
    }
}

fn decode_body<T: for<'de> Deserialize<'de>>(body: &[u8]) -> Result<T, DecodeError> {
    bincode::deserialize(body).map_err(|e| DecodeError::Malformed(e.to_string()))
}

/// Encode a profile at the current schema version.
pub fn encode_profile(profile: &Profile) -> Vec<u8> {
    encode(PROFILE_VERSION, profile)
}

/// Decode a profile payload, accepting the legacy layout.
pub fn decode_profile(payload: &[u8]) -> Result<Profile, DecodeError> {
    let (version, body) = split_version(payload)?;
    match version {
        PROFILE_VERSION => decode_body(body),
        PROFILE_VERSION_LEGACY => {
            let legacy: ProfileV1 = decode_body(body)?;
            Ok(Profile {
                owner: legacy.owner,
                display_name: legacy.display_name,
                check_in_count: legacy.check_in_count,
                last_check_in: 0,
            })
        }
        other => Err(DecodeError::UnsupportedVersion(other)),
    }
}

/// Encode a daily record.
pub fn encode_record(record: &DailyRecord) -> Vec<u8> {
    encode(RECORD_VERSION, record)
}

/// Decode a daily record payload.
pub fn decode_record(payload: &[u8]) -> Result<DailyRecord, DecodeError> {
    let (version, body) = split_version(payload)?;
    match version {
        RECORD_VERSION => decode_body(body),
        other => Err(DecodeError::UnsupportedVersion(other)),
    }
}

/// Encode the system registry.
pub fn encode_registry(registry: &SystemRegistry) -> Vec<u8> {
    encode(REGISTRY_VERSION, registry)
}

/// Decode a system registry payload.
pub fn decode_registry(payload: &[u8]) -> Result<SystemRegistry, DecodeError> {
    let (version, body) = split_version(payload)?;
    match version {
        REGISTRY_VERSION => decode_body(body),
        other => Err(DecodeError::UnsupportedVersion(other)),
    }
}
