use super::Address;
use chrono::{DateTime, Utc};
use primitive_types::H256;
use serde::{Deserialize, Serialize};

/// An out-of-band ask to be added to the allowlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRequest {
    pub id: String,
    pub address: Address,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub reason: String,
}

/// A stored copy of the allowlist, kept under `whitelist_backup_<millis>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backup {
    pub timestamp: DateTime<Utc>,
    pub addresses: Vec<Address>,
}

/// The export format for backup/restore through external tooling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub addresses: Vec<Address>,
    pub export_date: DateTime<Utc>,
}

/// Everything a verifier needs to check one address against a root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipProof {
    pub address: Address,
    #[serde(with = "h256_hex")]
    pub leaf: H256,
    #[serde(with = "h256_hex")]
    pub root: H256,
    #[serde(with = "h256_hex_vec")]
    pub siblings: Vec<H256>,
}

pub fn h256_to_hex(h: &H256) -> String {
    format!("0x{}", hex::encode(h.as_bytes()))
}

pub fn h256_from_hex(s: &str) -> Result<H256, String> {
    let s = s.trim();
    let s = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(s).map_err(|_| "invalid hex".to_string())?;
    if bytes.len() != 32 {
        return Err("expected 32-byte hex string".to_string());
    }
    Ok(H256::from_slice(&bytes))
}

pub mod h256_hex {
    use primitive_types::H256;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(h: &H256, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::h256_to_hex(h))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<H256, D::Error> {
        let s = String::deserialize(d)?;
        super::h256_from_hex(&s).map_err(serde::de::Error::custom)
    }
}

pub mod h256_hex_vec {
    use primitive_types::H256;
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &[H256], s: S) -> Result<S::Ok, S::Error> {
        let mut seq = s.serialize_seq(Some(v.len()))?;
        for h in v {
            seq.serialize_element(&super::h256_to_hex(h))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<H256>, D::Error> {
        let raw = Vec::<String>::deserialize(d)?;
        raw.iter()
            .map(|s| super::h256_from_hex(s).map_err(serde::de::Error::custom))
            .collect()
    }
}

pub mod h256_hex_opt {
    use primitive_types::H256;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(h: &Option<H256>, s: S) -> Result<S::Ok, S::Error> {
        match h {
            Some(h) => s.serialize_some(&super::h256_to_hex(h)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<H256>, D::Error> {
        Option::<String>::deserialize(d)?
            .map(|s| super::h256_from_hex(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn h256_hex_accepts_prefixed_and_bare() {
        let h = H256::repeat_byte(0xab);
        let prefixed = h256_to_hex(&h);
        assert!(prefixed.starts_with("0x"));
        assert_eq!(h256_from_hex(&prefixed).unwrap(), h);
        assert_eq!(h256_from_hex(&prefixed[2..]).unwrap(), h);
        assert!(h256_from_hex("0x1234").is_err());
    }

    #[test]
    fn pending_request_reason_defaults_to_empty() {
        let json = format!(
            r#"{{"id":"1","address":"0x{}","timestamp":"2024-01-01T00:00:00Z"}}"#,
            "22".repeat(20)
        );
        let req: PendingRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(req.reason, "");
        assert_eq!(req.id, "1");
    }
}
