//! Ethereum Attestation Service ledger.

use super::Ledger;
use crate::errors::AppError;
use crate::models::{Attestation, AttestationId, AttestationRequest};
use async_trait::async_trait;
use ethers::{
    abi::{self, ParamType, Token},
    prelude::*,
    types::{Address, Bytes, H256, Log, TransactionReceipt, U256, U64, transaction::eip2718::TypedTransaction},
    utils::{id, keccak256},
};
use private_data::constants::ZERO_UID;
use std::sync::Arc;
use tracing::{debug, info};

const ATTEST_SIGNATURE: &str = "attest((bytes32,(address,uint64,bool,bytes32,bytes,uint256)))";
const GET_ATTESTATION_SIGNATURE: &str = "getAttestation(bytes32)";
const ATTESTED_EVENT: &str = "Attested(address,address,bytes32,bytes32)";

type Client = SignerMiddleware<Provider<Http>, LocalWallet>;

pub struct EasLedger {
    client: Arc<Client>,
    contract: Address,
    confirmations: usize,
}

impl EasLedger {
    pub async fn connect(
        rpc_url: &str,
        private_key: &str,
        contract: Address,
        confirmations: usize,
    ) -> Result<Self, AppError> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| AppError::Config(format!("invalid RPC_URL: {e}")))?;

        let wallet = private_key
            .parse::<LocalWallet>()
            .map_err(|e| AppError::Config(format!("invalid PRIVATE_KEY: {e}")))?;

        let chain_id = provider.get_chainid().await.map_err(AppError::rpc)?;
        let wallet = wallet.with_chain_id(chain_id.as_u64());

        info!(chain_id = %chain_id, signer = ?wallet.address(), eas = ?contract, "connected to EAS");

        Ok(Self {
            client: Arc::new(SignerMiddleware::new(provider, wallet)),
            contract,
            confirmations,
        })
    }
}

/// Calldata for `EAS.attest(AttestationRequest)`.
pub(crate) fn attest_calldata(request: &AttestationRequest) -> Vec<u8> {
    let ref_uid = request.ref_uid.map_or(ZERO_UID, |r| r.as_bytes());
    let data = Token::Tuple(vec![
        Token::Address(request.recipient),
        Token::Uint(U256::from(request.expiration_time)),
        Token::Bool(request.revocable),
        Token::FixedBytes(ref_uid.to_vec()),
        Token::Bytes(request.data.clone()),
        Token::Uint(request.value),
    ]);
    let req = Token::Tuple(vec![Token::FixedBytes(request.schema.to_vec()), data]);

    let mut calldata = id(ATTEST_SIGNATURE).to_vec();
    calldata.extend_from_slice(&abi::encode(&[req]));
    calldata
}

pub(crate) fn get_attestation_calldata(uid: AttestationId) -> Vec<u8> {
    let mut calldata = id(GET_ATTESTATION_SIGNATURE).to_vec();
    calldata.extend_from_slice(&abi::encode(&[Token::FixedBytes(uid.as_bytes().to_vec())]));
    calldata
}

/// Pull the new uid out of the `Attested` event emitted by `contract`.
pub(crate) fn uid_from_logs(logs: &[Log], contract: Address) -> Option<AttestationId> {
    let topic = H256::from(keccak256(ATTESTED_EVENT));
    logs.iter()
        .filter(|log| log.address == contract && log.topics.first() == Some(&topic))
        .find_map(|log| {
            let word: [u8; 32] = log.data.get(..32)?.try_into().ok()?;
            Some(AttestationId::from_bytes(word))
        })
}

/// Interpret the outcome of an `attest` transaction. `None` means the transaction was dropped.
pub(crate) fn uid_from_receipt(
    receipt: Option<TransactionReceipt>,
    tx_hash: H256,
    contract: Address,
) -> Result<AttestationId, AppError> {
    let receipt = receipt.ok_or_else(|| AppError::Ledger(format!("transaction {tx_hash:?} was dropped")))?;

    if receipt.status == Some(U64::zero()) {
        return Err(AppError::Rejected(format!("transaction {tx_hash:?} reverted")));
    }

    debug!(?tx_hash, block = ?receipt.block_number, logs = receipt.logs.len(), "attestation confirmed");

    uid_from_logs(&receipt.logs, contract)
        .ok_or_else(|| AppError::Ledger(format!("no Attested event in transaction {tx_hash:?}")))
}

fn attestation_param() -> ParamType {
    ParamType::Tuple(vec![
        ParamType::FixedBytes(32), // uid
        ParamType::FixedBytes(32), // schema
        ParamType::Uint(64),       // time
        ParamType::Uint(64),       // expirationTime
        ParamType::Uint(64),       // revocationTime
        ParamType::FixedBytes(32), // refUID
        ParamType::Address,        // recipient
        ParamType::Address,        // attester
        ParamType::Bool,           // revocable
        ParamType::Bytes,          // data
    ])
}

/// Decode the return data of `getAttestation`. A zero uid means "not found".
pub(crate) fn decode_attestation(output: &[u8]) -> Result<Option<Attestation>, AppError> {
    let malformed = || AppError::Ledger("malformed getAttestation result".to_string());

    let mut tokens = abi::decode(&[attestation_param()], output).map_err(|e| AppError::Ledger(e.to_string()))?;
    let Some(Token::Tuple(fields)) = tokens.pop() else {
        return Err(malformed());
    };

    let word = |t: &Token| -> Result<[u8; 32], AppError> {
        t.clone()
            .into_fixed_bytes()
            .and_then(|b| b.try_into().ok())
            .ok_or_else(malformed)
    };
    let uint = |t: &Token| -> Result<u64, AppError> {
        t.clone()
            .into_uint()
            .filter(|v| *v <= U256::from(u64::MAX))
            .map(|v| v.as_u64())
            .ok_or_else(malformed)
    };
    let address = |t: &Token| t.clone().into_address().ok_or_else(malformed);

    let [uid, schema, time, expiration, revocation, ref_uid, recipient, attester, revocable, data] =
        fields.as_slice()
    else {
        return Err(malformed());
    };

    let uid = AttestationId::from_bytes(word(uid)?);
    if uid.is_zero() {
        return Ok(None);
    }
    let ref_uid = AttestationId::from_bytes(word(ref_uid)?);

    Ok(Some(Attestation {
        uid,
        schema: word(schema)?,
        time: uint(time)?,
        expiration_time: uint(expiration)?,
        revocation_time: uint(revocation)?,
        ref_uid: (!ref_uid.is_zero()).then_some(ref_uid),
        recipient: address(recipient)?,
        attester: address(attester)?,
        revocable: revocable.clone().into_bool().ok_or_else(malformed)?,
        data: data.clone().into_bytes().ok_or_else(malformed)?,
    }))
}

#[async_trait]
impl Ledger for EasLedger {
    fn name(&self) -> &str {
        "eas"
    }

    async fn attest(&self, request: &AttestationRequest) -> Result<AttestationId, AppError> {
        let tx = TransactionRequest::new()
            .to(self.contract)
            .data(Bytes::from(attest_calldata(request)))
            .value(request.value);

        let pending = self.client.send_transaction(tx, None).await.map_err(AppError::rpc)?;
        let tx_hash = pending.tx_hash();
        info!(?tx_hash, "attestation transaction submitted");

        let receipt = pending
            .confirmations(self.confirmations)
            .await
            .map_err(AppError::rpc)?;

        uid_from_receipt(receipt, tx_hash, self.contract)
    }

    async fn get_attestation(&self, uid: AttestationId) -> Result<Option<Attestation>, AppError> {
        let tx: TypedTransaction = TransactionRequest::new()
            .to(self.contract)
            .data(Bytes::from(get_attestation_calldata(uid)))
            .into();

        let output = self.client.call(&tx, None).await.map_err(AppError::rpc)?;
        decode_attestation(&output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(b: u8) -> AttestationId {
        AttestationId::from_bytes([b; 32])
    }

    fn request() -> AttestationRequest {
        AttestationRequest {
            schema: [0x20; 32],
            recipient: Address::repeat_byte(0xaa),
            expiration_time: 0,
            revocable: true,
            ref_uid: Some(uid(7)),
            data: vec![0x42; 32],
            value: U256::zero(),
        }
    }

    #[test]
    fn attest_selector_matches_eas() {
        // cast sig "attest((bytes32,(address,uint64,bool,bytes32,bytes,uint256)))"
        assert_eq!(hex::encode(id(ATTEST_SIGNATURE)), "f17325e7");
    }

    fn decode_request(calldata: &[u8]) -> (Vec<Token>, Vec<Token>) {
        let param = ParamType::Tuple(vec![
            ParamType::FixedBytes(32),
            ParamType::Tuple(vec![
                ParamType::Address,
                ParamType::Uint(64),
                ParamType::Bool,
                ParamType::FixedBytes(32),
                ParamType::Bytes,
                ParamType::Uint(256),
            ]),
        ]);
        let mut decoded = abi::decode(&[param], &calldata[4..]).unwrap();
        let Some(Token::Tuple(mut outer)) = decoded.pop() else { panic!("expected tuple") };
        let Some(Token::Tuple(inner)) = outer.pop() else { panic!("expected tuple") };
        (outer, inner)
    }

    #[test]
    fn attest_calldata_round_trips() {
        let calldata = attest_calldata(&request());
        assert_eq!(calldata[..4], id(ATTEST_SIGNATURE));
        let (outer, inner) = decode_request(&calldata);
        assert_eq!(outer[0], Token::FixedBytes(vec![0x20; 32]));
        assert_eq!(inner[0], Token::Address(Address::repeat_byte(0xaa)));
        assert_eq!(inner[2], Token::Bool(true));
        assert_eq!(inner[3], Token::FixedBytes(vec![7; 32]));
        assert_eq!(inner[4], Token::Bytes(vec![0x42; 32]));
    }

    #[test]
    fn missing_reference_encodes_zero_uid() {
        let mut req = request();
        req.ref_uid = None;
        let (_, inner) = decode_request(&attest_calldata(&req));
        assert_eq!(inner[3], Token::FixedBytes(vec![0; 32]));
    }

    #[test]
    fn uid_comes_from_attested_log_of_the_contract() {
        let contract = Address::repeat_byte(0xee);
        let topic = H256::from(keccak256(ATTESTED_EVENT));
        let attested = Log {
            address: contract,
            topics: vec![topic, H256::zero(), H256::zero(), H256::zero()],
            data: Bytes::from(vec![5u8; 32]),
            ..Default::default()
        };
        let foreign = Log {
            address: Address::repeat_byte(0x01),
            data: Bytes::from(vec![6u8; 32]),
            ..attested.clone()
        };

        assert_eq!(uid_from_logs(&[foreign.clone(), attested], contract), Some(uid(5)));
        assert_eq!(uid_from_logs(&[foreign], contract), None);
    }

    fn attested_log(contract: Address, uid_byte: u8) -> Log {
        Log {
            address: contract,
            topics: vec![H256::from(keccak256(ATTESTED_EVENT)), H256::zero(), H256::zero(), H256::zero()],
            data: Bytes::from(vec![uid_byte; 32]),
            ..Default::default()
        }
    }

    #[test]
    fn successful_receipt_yields_uid() {
        let contract = Address::repeat_byte(0xee);
        let receipt = TransactionReceipt {
            status: Some(U64::one()),
            logs: vec![attested_log(contract, 4)],
            ..Default::default()
        };
        assert_eq!(uid_from_receipt(Some(receipt), H256::zero(), contract).unwrap(), uid(4));
    }

    #[test]
    fn dropped_transaction_is_a_ledger_error() {
        let err = uid_from_receipt(None, H256::repeat_byte(1), Address::zero()).unwrap_err();
        assert!(matches!(err, AppError::Ledger(m) if m.contains("dropped")));
    }

    #[test]
    fn reverted_transaction_is_rejected() {
        let contract = Address::repeat_byte(0xee);
        let receipt = TransactionReceipt {
            status: Some(U64::zero()),
            logs: vec![attested_log(contract, 4)],
            ..Default::default()
        };
        let err = uid_from_receipt(Some(receipt), H256::zero(), contract).unwrap_err();
        assert!(matches!(err, AppError::Rejected(m) if m.contains("reverted")));
    }

    #[test]
    fn receipt_without_attested_event_is_a_ledger_error() {
        let contract = Address::repeat_byte(0xee);
        let receipt = TransactionReceipt {
            status: Some(U64::one()),
            logs: vec![attested_log(Address::repeat_byte(0x01), 4)],
            ..Default::default()
        };
        let err = uid_from_receipt(Some(receipt), H256::zero(), contract).unwrap_err();
        assert!(matches!(err, AppError::Ledger(m) if m.contains("no Attested event")));
    }

    fn encoded_attestation(uid_byte: u8, ref_byte: u8) -> Vec<u8> {
        abi::encode(&[Token::Tuple(vec![
            Token::FixedBytes(vec![uid_byte; 32]),
            Token::FixedBytes(vec![0x20; 32]),
            Token::Uint(U256::from(1_700_000_000u64)),
            Token::Uint(U256::zero()),
            Token::Uint(U256::zero()),
            Token::FixedBytes(vec![ref_byte; 32]),
            Token::Address(Address::repeat_byte(0xaa)),
            Token::Address(Address::repeat_byte(0xbb)),
            Token::Bool(true),
            Token::Bytes(vec![0x42; 32]),
        ])])
    }

    #[test]
    fn decodes_get_attestation_output() {
        let att = decode_attestation(&encoded_attestation(3, 7)).unwrap().unwrap();
        assert_eq!(att.uid, uid(3));
        assert_eq!(att.ref_uid, Some(uid(7)));
        assert_eq!(att.time, 1_700_000_000);
        assert_eq!(att.attester, Address::repeat_byte(0xbb));
        assert!(att.revocable);
        assert_eq!(att.data, vec![0x42; 32]);
    }

    #[test]
    fn zero_uid_decodes_to_none() {
        assert!(decode_attestation(&encoded_attestation(0, 0)).unwrap().is_none());
        let att = decode_attestation(&encoded_attestation(1, 0)).unwrap().unwrap();
        assert_eq!(att.ref_uid, None);
    }

    #[test]
    fn garbage_output_is_a_ledger_error() {
        assert!(matches!(decode_attestation(&[1, 2, 3]), Err(AppError::Ledger(_))));
    }
}
