//! Canonical hashes over work order payloads.
//!
//! Every hash is SHA-256 over the UTF-8 bytes of a fixed sequence of fields
//! joined with no separator. Absent optional fields contribute an empty
//! string but keep their position.
//!
//! ```text
//! header      = B64(SHA256(nonce || workOrderId || workerId || workloadId || requesterId))
//! item_i      = B64(SHA256(dataHash || data || encryptedDataEncryptionKey || iv))
//! data_hash   = item_0 || item_1 || ...            (items sorted by index)
//! final       = SHA256(header || data_hash(inData) || data_hash(outData))
//! ```
//!
//! Note that `data_hash` is a concatenation of base64 digests, not a single
//! digest over all items.

use sha2::{Digest, Sha256};

use crate::codec::{byte_array_to_base64, byte_array_to_hex, concat_utf8};
use crate::types::{DataItem, ReceiptCreateRequest, ReceiptUpdate, WorkOrderRequest, WorkOrderResponse};

pub type Hash256 = [u8; 32];

pub fn compute_message_hash(data: &[u8]) -> Hash256 {
    Sha256::digest(data).into()
}

/// Base64 SHA-256 of the header fields of a request or response.
pub fn calculate_hash_on_concatenated_string(
    nonce: &str,
    work_order_id: &str,
    worker_id: &str,
    workload_id: Option<&str>,
    requester_id: &str,
) -> String {
    let concat = concat_utf8([
        nonce,
        work_order_id,
        worker_id,
        workload_id.unwrap_or(""),
        requester_id,
    ]);
    byte_array_to_base64(&compute_message_hash(&concat))
}

/// Chain of per-item base64 digests over `items`, taken in ascending
/// `index` order. Items with equal indices keep their relative order.
pub fn calculate_datahash(items: &[DataItem]) -> String {
    let mut sorted: Vec<&DataItem> = items.iter().collect();
    sorted.sort_by_key(|item| item.index);

    let mut hash_str = String::new();
    for item in sorted {
        let concat = concat_utf8([
            item.data_hash.as_deref().unwrap_or(""),
            item.data.as_str(),
            item.encrypted_data_encryption_key.as_deref().unwrap_or(""),
            item.iv.as_deref().unwrap_or(""),
        ]);
        hash_str.push_str(&byte_array_to_base64(&compute_message_hash(&concat)));
    }
    hash_str
}

/// Outer hash over the concatenated base64 strings.
pub fn combine_hashes(header: &str, in_data: &str, out_data: &str) -> Hash256 {
    compute_message_hash(&concat_utf8([header, in_data, out_data]))
}

/// Final request digest. `request.in_data` must already hold the encrypted
/// (or base64 pass-through) representation.
pub fn request_digest(request: &WorkOrderRequest) -> Hash256 {
    let header = calculate_hash_on_concatenated_string(
        &request.requester_nonce,
        &request.work_order_id,
        &request.worker_id,
        request.workload_id.as_deref(),
        &request.requester_id,
    );
    let in_hash = calculate_datahash(&request.in_data);
    let out_hash = match request.out_data.as_deref() {
        Some(items) if !items.is_empty() => calculate_datahash(items),
        _ => String::new(),
    };
    combine_hashes(&header, &in_hash, &out_hash)
}

/// Hex form of [`request_digest`], as carried in `workOrderRequestHash`.
pub fn calculate_request_hash(request: &WorkOrderRequest) -> String {
    byte_array_to_hex(&request_digest(request))
}

pub fn response_digest(response: &WorkOrderResponse) -> Hash256 {
    let header = calculate_hash_on_concatenated_string(
        &response.worker_nonce,
        &response.work_order_id,
        &response.worker_id,
        response.workload_id.as_deref(),
        &response.requester_id,
    );
    let out_hash = calculate_datahash(&response.out_data);
    combine_hashes(&header, &out_hash, "")
}

/// Digest the worker signs to certify a session verification key.
pub fn verification_key_digest(ext_verification_key: &str, requester_nonce: &str) -> Hash256 {
    compute_message_hash(&concat_utf8([ext_verification_key, requester_nonce]))
}

pub fn receipt_create_digest(receipt: &ReceiptCreateRequest) -> Hash256 {
    let status = receipt.receipt_create_status.to_string();
    compute_message_hash(&concat_utf8([
        receipt.work_order_id.as_str(),
        receipt.worker_service_id.as_str(),
        receipt.worker_id.as_str(),
        receipt.requester_id.as_str(),
        status.as_str(),
        receipt.work_order_request_hash.as_str(),
        receipt.requester_generated_nonce.as_str(),
    ]))
}

pub fn receipt_update_digest(update: &ReceiptUpdate) -> Hash256 {
    let update_type = update.update_type.to_string();
    compute_message_hash(&concat_utf8([
        update.work_order_id.as_str(),
        update_type.as_str(),
        update.update_data.as_str(),
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_request() -> WorkOrderRequest {
        WorkOrderRequest::new("00112233", "wo1", "w1", "r1", vec![DataItem::new(0, "YWJj")])
    }

    #[test]
    fn header_hash_skips_absent_workload() {
        let h = calculate_hash_on_concatenated_string("00112233", "wo1", "w1", None, "r1");
        assert_eq!(h, "k1Clk9pCoWnHL15NgZujfcAL/UicxGnEfEcLtlvkCLg=");
        let same = calculate_hash_on_concatenated_string("00112233", "wo1", "w1", Some(""), "r1");
        assert_eq!(h, same);
    }

    #[test]
    fn datahash_is_chain_of_base64_digests() {
        let items = vec![
            DataItem::new(1, "second"),
            DataItem::new(0, "data")
                .with_data_hash("hA")
                .with_encrypted_data_encryption_key("K")
                .with_iv("iv"),
        ];
        assert_eq!(
            calculate_datahash(&items),
            "XwbnWuIenDek+jKsI4dUHeS0adTz+OZc72YJoIYMfTI=\
             FjZ6rLZ6SgF8jairlWgsyzkIY3gPcRTdoKDgxVZEx8Q="
        );
        // input slice is left untouched
        assert_eq!(items[0].index, 1);
    }

    #[test]
    fn datahash_of_nothing_is_empty() {
        assert_eq!(calculate_datahash(&[]), "");
    }

    #[test]
    fn request_hash_matches_reference() {
        let req = sample_request();
        assert_eq!(
            calculate_request_hash(&req),
            "6f205054975e76059322fadddff2f746d14b5d7716e2ba62dc3415d7d2dbfd5d"
        );
    }

    #[test]
    fn empty_out_data_hashes_like_absent() {
        let mut req = sample_request();
        let absent = request_digest(&req);
        req.out_data = Some(Vec::new());
        assert_eq!(request_digest(&req), absent);
        req.out_data = Some(vec![DataItem::new(0, "out")]);
        assert_ne!(request_digest(&req), absent);
    }

    #[test]
    fn receipt_digests_match_reference() {
        let create = ReceiptCreateRequest {
            work_order_id: "wo1".into(),
            worker_service_id: "svc1".into(),
            worker_id: "w1".into(),
            requester_id: "r1".into(),
            receipt_create_status: 1,
            work_order_request_hash: "abcdef".into(),
            requester_generated_nonce: "nonce".into(),
            requester_signature: String::new(),
            receipt_verification_key: String::new(),
        };
        assert_eq!(
            hex::encode(receipt_create_digest(&create)),
            "857422872839fc710b4ee402bf6caf6c8ee4ab5d5d584c1167f91222eaf49f7b"
        );

        let update = ReceiptUpdate {
            work_order_id: "wo1".into(),
            update_type: 2,
            update_data: "update-data".into(),
            update_signature: String::new(),
            receipt_verification_key: String::new(),
        };
        assert_eq!(
            hex::encode(receipt_update_digest(&update)),
            "b90a2db91b848208a5afcc2edad2cd06e044a31c9e330782afe491f123732d39"
        );
    }

    #[test]
    fn verification_key_digest_matches_reference() {
        assert_eq!(
            hex::encode(verification_key_digest("KEY", "nonce")),
            "feb7f1f11af760a7da40cda319b7e729d4a198f31c01cfd62204bafbf5a857b8"
        );
    }

    fn arb_items() -> impl Strategy<Value = Vec<DataItem>> {
        prop::collection::btree_map(any::<i64>(), ("[a-zA-Z0-9+/=]{1,24}", "[a-f0-9]{0,8}"), 1..8)
            .prop_map(|m| {
                m.into_iter()
                    .map(|(index, (data, iv))| DataItem::new(index, data).with_iv(iv))
                    .collect()
            })
    }

    proptest! {
        #[test]
        fn prop_datahash_order_independent(items in arb_items(), seed in any::<u64>()) {
            let mut shuffled = items.clone();
            let n = shuffled.len();
            shuffled.rotate_left((seed as usize) % n);
            shuffled.reverse();
            prop_assert_eq!(calculate_datahash(&items), calculate_datahash(&shuffled));
        }

        #[test]
        fn prop_datahash_sensitive_to_every_field(items in arb_items(), pick in any::<usize>()) {
            let base = calculate_datahash(&items);
            let i = pick % items.len();

            let mut changed = items.clone();
            changed[i].data.push('x');
            prop_assert_ne!(&base, &calculate_datahash(&changed));

            let mut changed = items.clone();
            changed[i].iv = Some(format!("{}0", changed[i].iv.clone().unwrap_or_default()));
            prop_assert_ne!(&base, &calculate_datahash(&changed));

            let mut changed = items.clone();
            changed[i].encrypted_data_encryption_key = Some("k".into());
            prop_assert_ne!(&base, &calculate_datahash(&changed));
        }
    }

    #[test]
    fn datahash_sensitive_to_index() {
        let items = vec![DataItem::new(0, "a"), DataItem::new(1, "b")];
        let swapped = vec![DataItem::new(1, "a"), DataItem::new(0, "b")];
        assert_ne!(calculate_datahash(&items), calculate_datahash(&swapped));
    }
}
