//! Serialization codec for save snapshots
//!
//! Snapshots are stored as pretty-printed JSON:
//!
//! ```text
//! { "header": { name, guid, created_at, schema_version, total_play_time_seconds },
//!   "domains": { "player": {...}, "world": {...}, ... } }
//! ```
//!
//! With obfuscation on, the buffer is prefixed with `GSX1` and the JSON bytes
//! are XORed with a repeating key. This only discourages casual editing; it
//! is not encryption. Decoding recognizes both forms regardless of the flag.

use serde::Deserialize;
use serde_json::Value;
use std::borrow::Cow;

use super::error::SaveError;
use super::types::*;
use crate::config::SaveConfig;

/// Prefix marking an obfuscated buffer
pub const OBFUSCATION_MAGIC: &[u8; 4] = b"GSX1";

const HEADER_FIELDS: [&str; 5] = [
    "name",
    "guid",
    "created_at",
    "schema_version",
    "total_play_time_seconds",
];

#[derive(Debug, Clone)]
pub struct SaveCodec {
    obfuscate: bool,
    key: Vec<u8>,
}

impl SaveCodec {
    /// Obfuscation needs a non-empty key; plaintext codecs may have none
    pub fn new(obfuscate: bool, key: impl AsRef<[u8]>) -> Result<Self, SaveError> {
        let key = key.as_ref().to_vec();
        if obfuscate && key.is_empty() {
            return Err(SaveError::Config(
                "obfuscation requires a non-empty key".to_string(),
            ));
        }
        Ok(SaveCodec { obfuscate, key })
    }

    pub fn from_config(config: &SaveConfig) -> Result<Self, SaveError> {
        Self::new(config.encrypt_saves, config.obfuscation_key.as_bytes())
    }

    pub fn is_version_supported(version: u32) -> bool {
        SUPPORTED_SAVE_VERSIONS.contains(&version)
    }

    pub fn encode(&self, snapshot: &SaveSnapshot) -> Result<Vec<u8>, SaveError> {
        let json = serde_json::to_vec_pretty(snapshot).map_err(SaveError::Serialization)?;

        if !self.obfuscate {
            return Ok(json);
        }

        let mut out = Vec::with_capacity(OBFUSCATION_MAGIC.len() + json.len());
        out.extend_from_slice(OBFUSCATION_MAGIC);
        out.extend_from_slice(&json);
        xor_with_key(&mut out[OBFUSCATION_MAGIC.len()..], &self.key);
        Ok(out)
    }

    /// Full decode with structural validation
    ///
    /// Any structural problem is reported as `CorruptData` (or
    /// `UnsupportedVersion`), never as a bare parse error.
    pub fn decode(&self, bytes: &[u8]) -> Result<SaveSnapshot, SaveError> {
        let plain = self.reveal(bytes)?;
        let document: Value = serde_json::from_slice(&plain)
            .map_err(|e| SaveError::corrupt(format!("malformed document: {}", e)))?;

        let root = document
            .as_object()
            .ok_or_else(|| SaveError::corrupt("document is not an object"))?;
        let header = root
            .get("header")
            .and_then(Value::as_object)
            .ok_or_else(|| SaveError::corrupt("missing header"))?;

        for field in HEADER_FIELDS {
            if !header.contains_key(field) {
                return Err(SaveError::corrupt(format!("header is missing '{}'", field)));
            }
        }

        let version = header
            .get("schema_version")
            .and_then(Value::as_u64)
            .ok_or_else(|| SaveError::corrupt("schema_version is not a number"))?;
        check_version(version)?;

        let domains = root
            .get("domains")
            .and_then(Value::as_object)
            .ok_or_else(|| SaveError::corrupt("missing domains"))?;

        for domain in Domain::ALL {
            match domains.get(domain.key()) {
                Some(payload) => validate_payload(domain, payload)?,
                None if domain.is_required() => {
                    return Err(SaveError::corrupt(format!(
                        "missing '{}' domain payload",
                        domain
                    )));
                }
                None => {}
            }
        }

        serde_json::from_value(document)
            .map_err(|e| SaveError::corrupt(format!("invalid snapshot: {}", e)))
    }

    /// Header-only parse used by slot listings
    ///
    /// Skips payload validation and only pulls the whitelisted summary fields
    /// (player level, current scene) out of the domains.
    pub fn decode_header(&self, bytes: &[u8], slot: usize) -> Result<SaveMetadata, SaveError> {
        let plain = self.reveal(bytes)?;
        let probe: HeaderProbe = serde_json::from_slice(&plain)
            .map_err(|e| SaveError::corrupt(format!("unreadable header: {}", e)))?;
        check_version(u64::from(probe.header.schema_version))?;

        Ok(SaveMetadata {
            slot,
            name: probe.header.name,
            guid: probe.header.guid,
            created_at: probe.header.created_at,
            schema_version: probe.header.schema_version,
            total_play_time_seconds: probe.header.total_play_time_seconds,
            player_level: probe.domains.player.and_then(|p| p.level),
            scene_id: probe.domains.world.and_then(|w| w.current_scene_id),
        })
    }

    fn reveal<'a>(&self, bytes: &'a [u8]) -> Result<Cow<'a, [u8]>, SaveError> {
        match bytes.strip_prefix(OBFUSCATION_MAGIC.as_slice()) {
            Some(body) => {
                if self.key.is_empty() {
                    return Err(SaveError::corrupt(
                        "save is obfuscated but no key is configured",
                    ));
                }
                let mut plain = body.to_vec();
                xor_with_key(&mut plain, &self.key);
                Ok(Cow::Owned(plain))
            }
            None => Ok(Cow::Borrowed(bytes)),
        }
    }
}

/// Symmetric transform: applying it twice with the same key is the identity
pub fn xor_with_key(bytes: &mut [u8], key: &[u8]) {
    if key.is_empty() {
        return;
    }
    for (i, byte) in bytes.iter_mut().enumerate() {
        *byte ^= key[i % key.len()];
    }
}

fn check_version(version: u64) -> Result<(), SaveError> {
    match u32::try_from(version) {
        Ok(v) if SaveCodec::is_version_supported(v) => Ok(()),
        _ => Err(SaveError::UnsupportedVersion {
            found: u32::try_from(version).unwrap_or(u32::MAX),
            supported: SUPPORTED_SAVE_VERSIONS.to_vec(),
        }),
    }
}

fn validate_payload(domain: Domain, payload: &Value) -> Result<(), SaveError> {
    let result = match domain {
        Domain::Player => PlayerSaveData::deserialize(payload).map(drop),
        Domain::Quests => Vec::<QuestSaveData>::deserialize(payload).map(drop),
        Domain::Riddles => Vec::<RiddleSaveData>::deserialize(payload).map(drop),
        Domain::World => WorldSaveData::deserialize(payload).map(drop),
        Domain::Plants => Vec::<PlantSaveData>::deserialize(payload).map(drop),
    };
    result.map_err(|e| SaveError::corrupt(format!("invalid '{}' payload: {}", domain, e)))
}

#[derive(Deserialize)]
struct HeaderProbe {
    header: SaveHeader,
    #[serde(default)]
    domains: DomainProbe,
}

#[derive(Deserialize, Default)]
struct DomainProbe {
    #[serde(default)]
    player: Option<PlayerProbe>,
    #[serde(default)]
    world: Option<WorldProbe>,
}

#[derive(Deserialize)]
struct PlayerProbe {
    #[serde(default)]
    level: Option<u32>,
}

#[derive(Deserialize)]
struct WorldProbe {
    #[serde(default)]
    current_scene_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::save::error::ErrorCategory;
    use chrono::Utc;
    use proptest::prelude::*;
    use serde_json::json;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn sample_snapshot(name: &str) -> SaveSnapshot {
        let mut domains = BTreeMap::new();
        domains.insert(
            "player".to_string(),
            serde_json::to_value(PlayerSaveData {
                position: [1.0, 2.0, 3.0],
                orientation: [0.0, 0.0, 0.0, 1.0],
                health: 80.5,
                max_health: 100.0,
                mana: Some(12.25),
                stamina: 50.0,
                level: 5,
                experience: 1234,
                unlocked_ability_ids: vec!["dash".to_string()],
                discovered_entry_ids: vec!["moss".to_string(), "fern".to_string()],
            })
            .unwrap(),
        );
        domains.insert(
            "world".to_string(),
            serde_json::to_value(WorldSaveData {
                game_time_seconds: 5400.75,
                time_of_day_hours: 13.5,
                days_elapsed: 2,
                weather_id: "rain".to_string(),
                current_scene_id: "forest".to_string(),
            })
            .unwrap(),
        );
        domains.insert(
            "quests".to_string(),
            serde_json::to_value(vec![QuestSaveData {
                quest_id: "herbs".to_string(),
                state: QuestState::Completed,
                last_completed_at: Some(Utc::now()),
                times_completed: 2,
            }])
            .unwrap(),
        );

        SaveSnapshot {
            header: SaveHeader {
                name: name.to_string(),
                guid: Uuid::new_v4(),
                created_at: Utc::now(),
                schema_version: CURRENT_SAVE_VERSION,
                total_play_time_seconds: 321.5,
            },
            domains,
        }
    }

    #[test]
    fn test_round_trip_plain() {
        let codec = SaveCodec::new(false, "key").unwrap();
        let snapshot = sample_snapshot("Plain");
        let bytes = codec.encode(&snapshot).unwrap();
        assert!(bytes.starts_with(b"{"));
        assert_eq!(codec.decode(&bytes).unwrap(), snapshot);
    }

    #[test]
    fn test_round_trip_obfuscated() {
        let codec = SaveCodec::new(true, "hollow-key").unwrap();
        let snapshot = sample_snapshot("Secret Grove");
        let bytes = codec.encode(&snapshot).unwrap();

        assert!(bytes.starts_with(OBFUSCATION_MAGIC));
        let needle = b"Secret Grove";
        assert!(!bytes.windows(needle.len()).any(|w| w == needle));
        assert_eq!(codec.decode(&bytes).unwrap(), snapshot);
    }

    #[test]
    fn test_reads_plain_file_with_obfuscation_enabled() {
        let plain = SaveCodec::new(false, "k")
            .unwrap()
            .encode(&sample_snapshot("Old"))
            .unwrap();
        let codec = SaveCodec::new(true, "k").unwrap();
        assert_eq!(codec.decode(&plain).unwrap().header.name, "Old");
    }

    #[test]
    fn test_truncated_bytes_are_corrupt() {
        let codec = SaveCodec::new(false, "k").unwrap();
        let bytes = codec.encode(&sample_snapshot("Cut")).unwrap();
        let err = codec.decode(&bytes[..bytes.len() / 2]).unwrap_err();
        assert!(matches!(err, SaveError::CorruptData { .. }));
    }

    #[test]
    fn test_wrong_key_is_corrupt() {
        let right = SaveCodec::new(true, "right").unwrap();
        let wrong = SaveCodec::new(true, "wrong").unwrap();
        let bytes = right.encode(&sample_snapshot("K")).unwrap();
        let err = wrong.decode(&bytes).unwrap_err();
        assert!(err.is_corrupt());
    }

    #[test]
    fn test_unsupported_version_rejected() {
        let codec = SaveCodec::new(false, "k").unwrap();
        let mut snapshot = sample_snapshot("Future");
        snapshot.header.schema_version = 99;
        let bytes = codec.encode(&snapshot).unwrap();

        let err = codec.decode(&bytes).unwrap_err();
        assert!(matches!(err, SaveError::UnsupportedVersion { found: 99, .. }));
        assert!(codec.decode_header(&bytes, 0).unwrap_err().is_corrupt());
    }

    #[test]
    fn test_missing_required_domain() {
        let codec = SaveCodec::new(false, "k").unwrap();
        let mut snapshot = sample_snapshot("NoWorld");
        snapshot.domains.remove("world");
        let bytes = codec.encode(&snapshot).unwrap();
        let err = codec.decode(&bytes).unwrap_err();
        assert!(err.to_string().contains("world"));
    }

    #[test]
    fn test_optional_domain_may_be_absent() {
        let codec = SaveCodec::new(false, "k").unwrap();
        let mut snapshot = sample_snapshot("NoQuests");
        snapshot.domains.remove("quests");
        let bytes = codec.encode(&snapshot).unwrap();
        assert_eq!(codec.decode(&bytes).unwrap(), snapshot);
    }

    #[test]
    fn test_missing_header_field() {
        let codec = SaveCodec::new(false, "k").unwrap();
        let doc = json!({
            "header": { "name": "x", "schema_version": 1 },
            "domains": {}
        });
        let err = codec.decode(doc.to_string().as_bytes()).unwrap_err();
        assert!(err.to_string().contains("guid"));
    }

    #[test]
    fn test_bad_payload_shape() {
        let codec = SaveCodec::new(false, "k").unwrap();
        let mut snapshot = sample_snapshot("BadPlayer");
        snapshot
            .domains
            .insert("player".to_string(), json!({ "level": "five" }));
        let bytes = codec.encode(&snapshot).unwrap();
        let err = codec.decode(&bytes).unwrap_err();
        assert!(matches!(err, SaveError::CorruptData { .. }));
    }

    #[test]
    fn test_header_probe() {
        let codec = SaveCodec::new(true, "probe").unwrap();
        let snapshot = sample_snapshot("Listing");
        let bytes = codec.encode(&snapshot).unwrap();

        let meta = codec.decode_header(&bytes, 4).unwrap();
        assert_eq!(meta, SaveMetadata::from_snapshot(4, &snapshot));
        assert_eq!(meta.player_level, Some(5));
    }

    #[test]
    fn test_obfuscation_without_key_is_rejected() {
        let err = SaveCodec::new(true, "").unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Config);
        assert!(SaveCodec::new(false, "").is_ok());
    }

    proptest! {
        #[test]
        fn prop_xor_is_involution(
            data in proptest::collection::vec(any::<u8>(), 0..256),
            key in proptest::collection::vec(1u8.., 1..16),
        ) {
            let mut buf = data.clone();
            xor_with_key(&mut buf, &key);
            xor_with_key(&mut buf, &key);
            prop_assert_eq!(buf, data);
        }

        #[test]
        fn prop_round_trip_any_name(name in ".{0,40}", play in 0.0f64..1.0e7, obfuscate in any::<bool>()) {
            let codec = SaveCodec::new(obfuscate, "prop-key").unwrap();
            let mut snapshot = sample_snapshot(&name);
            snapshot.header.total_play_time_seconds = play;
            let bytes = codec.encode(&snapshot).unwrap();
            prop_assert_eq!(codec.decode(&bytes).unwrap(), snapshot);
        }
    }
}
