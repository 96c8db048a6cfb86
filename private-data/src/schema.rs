//! Encoder for attestation schemas such as `bytes32 privateData`.
//!
//! A schema is a comma separated list of `<abi-type> <name>` pairs. Attestation payloads are the
//! plain ABI encoding of one value per pair, in schema order.

use crate::constants::{PRIVATE_DATA_FIELD, PRIVATE_DATA_SCHEMA};
use crate::error::DataError;
use ethers_core::abi::ethabi::param_type::Reader;
use ethers_core::abi::{self, ParamType, Token};

#[derive(Clone, Debug, PartialEq)]
pub struct SchemaParam {
    pub name: String,
    pub type_name: String,
    pub kind: ParamType,
}

/// One named value to encode.
#[derive(Clone, Debug, PartialEq)]
pub struct SchemaItem {
    pub name: String,
    pub type_name: String,
    pub value: Token,
}

impl SchemaItem {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>, value: Token) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            value,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SchemaEncoder {
    schema: String,
    params: Vec<SchemaParam>,
}

impl SchemaEncoder {
    pub fn new(schema: &str) -> Result<Self, DataError> {
        let mut params = Vec::new();

        for part in schema.split(',') {
            let mut words = part.split_whitespace();
            let (Some(type_name), Some(name), None) = (words.next(), words.next(), words.next()) else {
                return Err(DataError::InvalidSchema(format!(
                    "expected `<type> <name>`, got `{}`",
                    part.trim()
                )));
            };

            let kind = Reader::read(type_name)
                .map_err(|e| DataError::InvalidSchema(format!("`{type_name}`: {e}")))?;
            // The reader maps unknown words to an enum `uint8` and accepts any width.
            if kind.to_string() != type_name || !is_valid_kind(&kind) {
                return Err(DataError::InvalidSchema(format!("unknown abi type `{type_name}`")));
            }

            if params.iter().any(|p: &SchemaParam| p.name == name) {
                return Err(DataError::InvalidSchema(format!("duplicate field `{name}`")));
            }

            params.push(SchemaParam {
                name: name.to_string(),
                type_name: type_name.to_string(),
                kind,
            });
        }

        Ok(Self {
            schema: schema.to_string(),
            params,
        })
    }

    pub fn is_schema_valid(schema: &str) -> bool {
        Self::new(schema).is_ok()
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn params(&self) -> &[SchemaParam] {
        &self.params
    }

    /// ABI-encode `items`, which must follow the schema's names and types in order.
    pub fn encode_data(&self, items: &[SchemaItem]) -> Result<Vec<u8>, DataError> {
        if items.len() != self.params.len() {
            return Err(DataError::SchemaMismatch(format!(
                "schema has {} fields, got {} values",
                self.params.len(),
                items.len()
            )));
        }

        let mut tokens = Vec::with_capacity(items.len());
        for (param, item) in self.params.iter().zip(items) {
            if param.name != item.name {
                return Err(DataError::SchemaMismatch(format!(
                    "expected field `{}`, got `{}`",
                    param.name, item.name
                )));
            }
            if param.type_name != item.type_name || !item.value.type_check(&param.kind) {
                return Err(DataError::SchemaMismatch(format!(
                    "field `{}` must be a {}",
                    param.name, param.type_name
                )));
            }
            tokens.push(item.value.clone());
        }

        Ok(abi::encode(&tokens))
    }

    pub fn decode_data(&self, data: &[u8]) -> Result<Vec<SchemaItem>, DataError> {
        let kinds: Vec<ParamType> = self.params.iter().map(|p| p.kind.clone()).collect();
        let tokens = abi::decode(&kinds, data).map_err(|e| DataError::Abi(e.to_string()))?;

        Ok(self
            .params
            .iter()
            .zip(tokens)
            .map(|(p, value)| SchemaItem::new(p.name.clone(), p.type_name.clone(), value))
            .collect())
    }
}

fn is_valid_kind(kind: &ParamType) -> bool {
    match kind {
        ParamType::Uint(bits) | ParamType::Int(bits) => *bits % 8 == 0 && (8..=256).contains(bits),
        ParamType::FixedBytes(len) => (1..=32).contains(len),
        ParamType::Array(inner) => is_valid_kind(inner),
        ParamType::FixedArray(inner, len) => *len > 0 && is_valid_kind(inner),
        ParamType::Tuple(items) => !items.is_empty() && items.iter().all(is_valid_kind),
        ParamType::Address | ParamType::Bytes | ParamType::Bool | ParamType::String => true,
    }
}

/// Payload for the `bytes32 privateData` schema.
pub fn encode_private_data(root: &[u8; 32]) -> Result<Vec<u8>, DataError> {
    SchemaEncoder::new(PRIVATE_DATA_SCHEMA)?.encode_data(&[SchemaItem::new(
        PRIVATE_DATA_FIELD,
        "bytes32",
        Token::FixedBytes(root.to_vec()),
    )])
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers_core::types::U256;

    #[test]
    fn parses_private_data_schema() {
        let enc = SchemaEncoder::new(PRIVATE_DATA_SCHEMA).unwrap();
        assert_eq!(enc.params().len(), 1);
        assert_eq!(enc.params()[0].name, "privateData");
        assert_eq!(enc.params()[0].kind, ParamType::FixedBytes(32));
    }

    #[test]
    fn rejects_bad_schemas() {
        assert!(!SchemaEncoder::is_schema_valid("bytes32"));
        assert!(!SchemaEncoder::is_schema_valid("notatype foo"));
        assert!(!SchemaEncoder::is_schema_valid("uint256 a, bool a"));
        assert!(SchemaEncoder::is_schema_valid("uint256 age, string name, bool ok"));
    }

    #[test]
    fn unknown_words_and_widths_are_invalid_schemas() {
        for schema in [
            "notatype foo",
            "strin name",
            "uint7 foo",
            "int264 foo",
            "bytes33 foo",
            "bytes0 foo",
            "uint7[] foo",
        ] {
            assert!(
                matches!(SchemaEncoder::new(schema), Err(DataError::InvalidSchema(_))),
                "{schema}"
            );
        }
    }

    #[test]
    fn canonical_types_are_accepted() {
        let enc = SchemaEncoder::new("uint8 a, int256 b, bytes1 c, bytes d, address e, uint256[] f, bytes32[2] g").unwrap();
        assert_eq!(enc.params()[0].kind, ParamType::Uint(8));
        assert_eq!(enc.params()[5].kind, ParamType::Array(Box::new(ParamType::Uint(256))));
        assert_eq!(enc.params()[6].kind, ParamType::FixedArray(Box::new(ParamType::FixedBytes(32)), 2));
    }

    #[test]
    fn private_data_payload_is_the_root_word() {
        let root = [0x42u8; 32];
        let payload = encode_private_data(&root).unwrap();
        assert_eq!(payload, root.to_vec());
    }

    #[test]
    fn encode_checks_names_and_types() {
        let enc = SchemaEncoder::new("uint256 age, string name").unwrap();
        let wrong_order = [
            SchemaItem::new("name", "string", Token::String("x".into())),
            SchemaItem::new("age", "uint256", Token::Uint(U256::from(1))),
        ];
        assert!(matches!(enc.encode_data(&wrong_order), Err(DataError::SchemaMismatch(_))));

        let wrong_type = [
            SchemaItem::new("age", "uint256", Token::Bool(true)),
            SchemaItem::new("name", "string", Token::String("x".into())),
        ];
        assert!(matches!(enc.encode_data(&wrong_type), Err(DataError::SchemaMismatch(_))));
    }

    #[test]
    fn decode_inverts_encode() {
        let enc = SchemaEncoder::new("uint256 age, string name").unwrap();
        let items = vec![
            SchemaItem::new("age", "uint256", Token::Uint(U256::from(28))),
            SchemaItem::new("name", "string", Token::String("Alice Johnson".into())),
        ];
        let bytes = enc.encode_data(&items).unwrap();
        assert_eq!(enc.decode_data(&bytes).unwrap(), items);
    }
}
