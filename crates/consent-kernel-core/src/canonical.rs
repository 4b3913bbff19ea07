//! Canonical CBOR encoding for receipts and their parts.
//!
//! Encoding goes through serde with fixed struct field order and sorted
//! (`BTreeMap`) property maps, so equal values always produce equal bytes.
//! The bytes feed receipt id derivation and the blob columns of the SQLite
//! store.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{CoreError, Result};
use crate::receipt::ReceiptInput;

/// Encode any serializable value to CBOR.
pub fn to_cbor<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| CoreError::Encoding(e.to_string()))?;
    Ok(buf)
}

/// Decode a value from CBOR.
pub fn from_cbor<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    ciborium::from_reader(bytes).map_err(|e| CoreError::Decoding(e.to_string()))
}

/// Canonical bytes of a receipt submission.
pub fn canonical_bytes(input: &ReceiptInput) -> Result<Vec<u8>> {
    to_cbor(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::receipt::{PiiCategoryValidity, ReceiptPurposeInput, ReceiptServiceInput, TerminationPolicy};
    use crate::types::ConsentType;
    use std::collections::BTreeMap;

    fn input(properties: BTreeMap<String, String>) -> ReceiptInput {
        ReceiptInput {
            pii_principal_id: "PRIMARY/alice".into(),
            collection_method: "Web Form - Sign-in".into(),
            jurisdiction: "LK".into(),
            language: "us_EN".into(),
            policy_url: "http://nolink".into(),
            properties,
            services: vec![ReceiptServiceInput {
                service: "travelocity".into(),
                tenant_domain: "carbon.super".into(),
                sp_display_name: "travelocity".into(),
                sp_description: "travelocity".into(),
                purposes: vec![ReceiptPurposeInput {
                    purpose_id: 1,
                    purpose_category_ids: vec![1],
                    consent_type: ConsentType::Explicit,
                    primary_purpose: true,
                    third_party_disclosure: false,
                    third_party_name: None,
                    termination: TerminationPolicy::Indefinite.to_string(),
                    pii_categories: vec![PiiCategoryValidity::new(3, TerminationPolicy::Indefinite)],
                }],
            }],
        }
    }

    #[test]
    fn test_canonical_bytes_ignore_property_insertion_order() {
        let mut a = BTreeMap::new();
        a.insert("b".to_string(), "2".to_string());
        a.insert("a".to_string(), "1".to_string());

        let mut b = BTreeMap::new();
        b.insert("a".to_string(), "1".to_string());
        b.insert("b".to_string(), "2".to_string());

        assert_eq!(canonical_bytes(&input(a)).unwrap(), canonical_bytes(&input(b)).unwrap());
    }

    #[test]
    fn test_decode_encoded_input() {
        let original = input(BTreeMap::new());
        let bytes = canonical_bytes(&original).unwrap();
        let decoded: ReceiptInput = from_cbor(&bytes).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_decode_garbage_fails() {
        let err = from_cbor::<ReceiptInput>(&[0xff, 0x00]).unwrap_err();
        assert!(matches!(err, CoreError::Decoding(_)));
    }
}
