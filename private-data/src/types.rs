//! Types shared between the tree, the proofs and the host-side writer.

use crate::error::DataError;
use ethers_core::abi::{ParamType, Token};
use ethers_core::types::{Address, U256};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// ABI type tag of a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Uint256,
    Bool,
    Address,
    Bytes32,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Uint256 => "uint256",
            FieldType::Bool => "bool",
            FieldType::Address => "address",
            FieldType::Bytes32 => "bytes32",
        }
    }

    pub fn param_type(&self) -> ParamType {
        match self {
            FieldType::String => ParamType::String,
            FieldType::Uint256 => ParamType::Uint(256),
            FieldType::Bool => ParamType::Bool,
            FieldType::Address => ParamType::Address,
            FieldType::Bytes32 => ParamType::FixedBytes(32),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(FieldType::String),
            "uint256" => Ok(FieldType::Uint256),
            "bool" => Ok(FieldType::Bool),
            "address" => Ok(FieldType::Address),
            "bytes32" => Ok(FieldType::Bytes32),
            other => Err(DataError::UnsupportedType(other.to_string())),
        }
    }
}

/// Text form used for integers that a JSON number cannot carry exactly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntEncoding {
    #[default]
    Decimal,
    Hex,
}

impl FromStr for IntEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "decimal" | "dec" => Ok(IntEncoding::Decimal),
            "hex" => Ok(IntEncoding::Hex),
            other => Err(format!("unknown integer encoding `{other}` (expected decimal or hex)")),
        }
    }
}

/// An unsigned integer up to 2^256-1.
///
/// Always written as a JSON string so no digit is lost to floating point. Reads accept a JSON
/// number (when it fits in u64), a decimal string or a `0x` hex string.
#[derive(Clone, Copy, Debug)]
pub struct LargeInt {
    value: U256,
    encoding: IntEncoding,
}

impl LargeInt {
    pub fn new(value: U256) -> Self {
        Self {
            value,
            encoding: IntEncoding::Decimal,
        }
    }

    pub fn with_encoding(mut self, encoding: IntEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn value(&self) -> U256 {
        self.value
    }

    pub fn encoding(&self) -> IntEncoding {
        self.encoding
    }

    pub fn to_text(&self) -> String {
        match self.encoding {
            IntEncoding::Decimal => self.value.to_string(),
            IntEncoding::Hex => format!("0x{:x}", self.value),
        }
    }

    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();
        if let Some(digits) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            let value = U256::from_str_radix(digits, 16).map_err(|e| format!("invalid hex integer: {e}"))?;
            Ok(Self::new(value).with_encoding(IntEncoding::Hex))
        } else {
            let value = U256::from_dec_str(s).map_err(|e| format!("invalid decimal integer: {e}"))?;
            Ok(Self::new(value))
        }
    }
}

impl PartialEq for LargeInt {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for LargeInt {}

impl From<u64> for LargeInt {
    fn from(v: u64) -> Self {
        Self::new(U256::from(v))
    }
}

impl From<U256> for LargeInt {
    fn from(v: U256) -> Self {
        Self::new(v)
    }
}

impl fmt::Display for LargeInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl Serialize for LargeInt {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_text())
    }
}

impl<'de> Deserialize<'de> for LargeInt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct LargeIntVisitor;

        impl Visitor<'_> for LargeIntVisitor {
            type Value = LargeInt;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an unsigned integer, a decimal string or a 0x hex string")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<LargeInt, E> {
                Ok(LargeInt::from(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<LargeInt, E> {
                u64::try_from(v)
                    .map(LargeInt::from)
                    .map_err(|_| E::custom("negative integer"))
            }

            fn visit_f64<E: de::Error>(self, _v: f64) -> Result<LargeInt, E> {
                Err(E::custom("floating point value cannot hold a large integer exactly; write it as a string"))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<LargeInt, E> {
                LargeInt::parse(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(LargeIntVisitor)
    }
}

/// A typed primitive value held by a field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldValue {
    String(String),
    Uint(LargeInt),
    Bool(bool),
    Address(Address),
    Bytes32([u8; 32]),
}

impl FieldValue {
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::String(_) => FieldType::String,
            FieldValue::Uint(_) => FieldType::Uint256,
            FieldValue::Bool(_) => FieldType::Bool,
            FieldValue::Address(_) => FieldType::Address,
            FieldValue::Bytes32(_) => FieldType::Bytes32,
        }
    }

    pub fn to_token(&self) -> Token {
        match self {
            FieldValue::String(s) => Token::String(s.clone()),
            FieldValue::Uint(n) => Token::Uint(n.value()),
            FieldValue::Bool(b) => Token::Bool(*b),
            FieldValue::Address(a) => Token::Address(*a),
            FieldValue::Bytes32(b) => Token::FixedBytes(b.to_vec()),
        }
    }

    /// Parse a JSON value according to a declared type tag.
    pub fn from_json(ty: FieldType, value: &serde_json::Value) -> Result<Self, DataError> {
        let mismatch = || DataError::SchemaMismatch(format!("expected a {ty} value, got {value}"));
        match ty {
            FieldType::String => value
                .as_str()
                .map(|s| FieldValue::String(s.to_string()))
                .ok_or_else(mismatch),
            FieldType::Uint256 => serde_json::from_value::<LargeInt>(value.clone())
                .map(FieldValue::Uint)
                .map_err(|e| DataError::SchemaMismatch(e.to_string())),
            FieldType::Bool => value.as_bool().map(FieldValue::Bool).ok_or_else(mismatch),
            FieldType::Address => {
                let s = value.as_str().ok_or_else(mismatch)?;
                s.parse::<Address>()
                    .map(FieldValue::Address)
                    .map_err(|e| DataError::Hex(format!("{s}: {e}")))
            }
            FieldType::Bytes32 => {
                let s = value.as_str().ok_or_else(mismatch)?;
                hex32::parse(s).map(FieldValue::Bytes32)
            }
        }
    }

    /// Re-tag every large integer with the given text encoding.
    pub fn with_int_encoding(self, encoding: IntEncoding) -> Self {
        match self {
            FieldValue::Uint(n) => FieldValue::Uint(n.with_encoding(encoding)),
            other => other,
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::String(s) => serializer.serialize_str(s),
            FieldValue::Uint(n) => n.serialize(serializer),
            FieldValue::Bool(b) => serializer.serialize_bool(*b),
            FieldValue::Address(a) => serializer.serialize_str(&ethers_core::utils::to_checksum(a, None)),
            FieldValue::Bytes32(b) => serializer.serialize_str(&hex32::encode(b)),
        }
    }
}

/// One named, typed value of a document. Order within a document is the leaf order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawField")]
pub struct Field {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub name: String,
    pub value: FieldValue,
}

impl Field {
    /// Build a field from an explicit type tag, checking the tag against the value.
    pub fn new(field_type: FieldType, name: impl Into<String>, value: FieldValue) -> Result<Self, DataError> {
        let name = name.into();
        if name.is_empty() {
            return Err(DataError::EmptyName);
        }
        if value.field_type() != field_type {
            return Err(DataError::TypeMismatch {
                name,
                expected: field_type.to_string(),
                got: value.field_type().to_string(),
            });
        }
        Ok(Self { field_type, name, value })
    }

    pub fn string(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::typed(name, FieldValue::String(value.into()))
    }

    pub fn uint256(name: impl Into<String>, value: impl Into<U256>) -> Self {
        Self::typed(name, FieldValue::Uint(LargeInt::new(value.into())))
    }

    pub fn bool(name: impl Into<String>, value: bool) -> Self {
        Self::typed(name, FieldValue::Bool(value))
    }

    pub fn address(name: impl Into<String>, value: Address) -> Self {
        Self::typed(name, FieldValue::Address(value))
    }

    pub fn bytes32(name: impl Into<String>, value: [u8; 32]) -> Self {
        Self::typed(name, FieldValue::Bytes32(value))
    }

    fn typed(name: impl Into<String>, value: FieldValue) -> Self {
        Self {
            field_type: value.field_type(),
            name: name.into(),
            value,
        }
    }
}

#[derive(Deserialize)]
struct RawField {
    #[serde(rename = "type")]
    field_type: FieldType,
    name: String,
    value: serde_json::Value,
}

impl TryFrom<RawField> for Field {
    type Error = DataError;

    fn try_from(raw: RawField) -> Result<Self, Self::Error> {
        let value = FieldValue::from_json(raw.field_type, &raw.value)?;
        Field::new(raw.field_type, raw.name, value)
    }
}

/// A field bound to the salt mixed into its leaf.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSaltedField")]
pub struct SaltedField {
    #[serde(flatten)]
    pub field: Field,
    #[serde(with = "hex32")]
    pub salt: [u8; 32],
}

#[derive(Deserialize)]
struct RawSaltedField {
    #[serde(rename = "type")]
    field_type: FieldType,
    name: String,
    value: serde_json::Value,
    salt: String,
}

impl TryFrom<RawSaltedField> for SaltedField {
    type Error = DataError;

    fn try_from(raw: RawSaltedField) -> Result<Self, Self::Error> {
        let field = Field::try_from(RawField {
            field_type: raw.field_type,
            name: raw.name,
            value: raw.value,
        })?;
        Ok(Self {
            field,
            salt: hex32::parse(&raw.salt)?,
        })
    }
}

/// `0x`-prefixed hex for 32-byte values.
pub mod hex32 {
    use crate::error::DataError;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn encode(bytes: &[u8; 32]) -> String {
        format!("0x{}", hex::encode(bytes))
    }

    pub fn parse(s: &str) -> Result<[u8; 32], DataError> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(digits).map_err(|e| DataError::Hex(format!("{s}: {e}")))?;
        bytes
            .try_into()
            .map_err(|b: Vec<u8>| DataError::Hex(format!("expected 32 bytes, got {}", b.len())))
    }

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 32], D::Error> {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(serde::de::Error::custom)
    }

    pub mod vec {
        use serde::{Deserialize, Deserializer, Serializer, ser::SerializeSeq};

        pub fn serialize<S: Serializer>(items: &[[u8; 32]], serializer: S) -> Result<S::Ok, S::Error> {
            let mut seq = serializer.serialize_seq(Some(items.len()))?;
            for item in items {
                seq.serialize_element(&super::encode(item))?;
            }
            seq.end()
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<[u8; 32]>, D::Error> {
            Vec::<String>::deserialize(deserializer)?
                .iter()
                .map(|s| super::parse(s).map_err(serde::de::Error::custom))
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn field_type_tags_match_abi_names() {
        assert_eq!(serde_json::to_string(&FieldType::Uint256).unwrap(), "\"uint256\"");
        assert_eq!("bytes32".parse::<FieldType>().unwrap(), FieldType::Bytes32);
        assert!("uint8".parse::<FieldType>().is_err());
    }

    #[test]
    fn new_rejects_mismatched_tag() {
        let err = Field::new(FieldType::Bool, "isInsured", FieldValue::String("yes".into())).unwrap_err();
        assert!(matches!(err, DataError::TypeMismatch { .. }));
        assert!(matches!(
            Field::new(FieldType::Bool, "", FieldValue::Bool(true)),
            Err(DataError::EmptyName)
        ));
    }

    #[test]
    fn field_json_shape() {
        let f = Field::uint256("age", 28u64);
        let v = serde_json::to_value(&f).unwrap();
        assert_eq!(v, serde_json::json!({ "type": "uint256", "name": "age", "value": "28" }));

        // Plain numbers from other producers are accepted too.
        let back: Field = serde_json::from_str(r#"{"type":"uint256","name":"age","value":28}"#).unwrap();
        assert_eq!(back, f);
    }

    #[test]
    fn salted_field_round_trips() {
        let sf = SaltedField {
            field: Field::string("diagnosis", "Hypertension"),
            salt: [0xab; 32],
        };
        let json = serde_json::to_string(&sf).unwrap();
        assert!(json.contains(&format!("\"salt\":\"0x{}\"", "ab".repeat(32))));
        let back: SaltedField = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sf);
    }

    #[test]
    fn large_int_hex_encoding() {
        let n = LargeInt::from(255u64).with_encoding(IntEncoding::Hex);
        assert_eq!(serde_json::to_string(&n).unwrap(), "\"0xff\"");
        let back: LargeInt = serde_json::from_str("\"0xff\"").unwrap();
        assert_eq!(back.value(), U256::from(255u64));
        assert_eq!(back.encoding(), IntEncoding::Hex);
    }

    #[test]
    fn large_int_rejects_floats() {
        assert!(serde_json::from_str::<LargeInt>("1.5").is_err());
        assert!(serde_json::from_str::<LargeInt>("-3").is_err());
    }

    #[test]
    fn max_u256_survives_text() {
        let n = LargeInt::new(U256::MAX);
        let json = serde_json::to_string(&n).unwrap();
        assert_eq!(
            json,
            "\"115792089237316195423570985008687907853269984665640564039457584007913129639935\""
        );
        let back: LargeInt = serde_json::from_str(&json).unwrap();
        assert_eq!(back.value(), U256::MAX);
    }

    proptest! {
        #[test]
        fn decimal_text_keeps_every_digit(limbs in proptest::array::uniform4(any::<u64>())) {
            let value = U256(limbs);
            let json = serde_json::to_string(&LargeInt::new(value)).unwrap();
            prop_assert_eq!(json.trim_matches('"'), value.to_string());
            let back: LargeInt = serde_json::from_str(&json).unwrap();
            prop_assert_eq!(back.value(), value);
        }
    }
}
