use derive_more::{AsRef, Display, From, Into};
use serde::{Deserialize, Serialize};

/// 远端资产主键（由服务端分配的数字 ID）
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, From, Into, Serialize, Deserialize, Default,
)]
pub struct AssetId(i64);

/// 稳定自然键：序列号，全局唯一
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Display, From, Into, AsRef, Serialize, Deserialize, Default,
)]
pub struct SerialNumber(String);

impl AssetId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl SerialNumber {
    pub fn new(serial: impl Into<String>) -> Self {
        Self(serial.into())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_id_roundtrip() {
        let id = AssetId::new(42);
        assert_eq!(id.value(), 42);
        assert_eq!(format!("{}", id), "42");
    }

    #[test]
    fn test_serial_number_from_str() {
        let sn = SerialNumber::new("PC-0042-XYZ");
        assert_eq!(sn.as_str(), "PC-0042-XYZ");
        assert!(!sn.is_empty());
    }

    #[test]
    fn test_serial_number_whitespace_is_empty() {
        assert!(SerialNumber::new("   ").is_empty());
        assert!(SerialNumber::new("").is_empty());
    }

    #[test]
    fn test_serial_number_serialization() {
        let sn = SerialNumber::new("SN-1");
        let json = serde_json::to_string(&sn).unwrap();
        assert_eq!(json, "\"SN-1\"");
        let back: SerialNumber = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sn);
    }
}
