//! Packed n-gram keys.
//!
//! A key stores the n-gram order in the top [`ORDER_TAG_BITS`] bits as
//! `order - 1`, followed by one fixed-width field per term id, first term in
//! the most significant field. The field width depends on the order only,
//! so a key decodes without any outside context and keys of different orders
//! can never collide.
//!
//! | order | operand bits | id limit |
//! |-------|--------------|----------|
//! | 1     | 32           | 2^32     |
//! | 2     | 31           | 2^31     |
//! | 3     | 20           | 2^20     |

use crate::config::{KEY_PAYLOAD_BITS, MAX_OPERAND_BITS, MAX_SUPPORTED_ORDER, ORDER_TAG_BITS};
use crate::error::{Error, Result};
use crate::vectorizer::term::TermId;

pub type NgramKey = u64;

/// Width in bits of one operand field for `order`.
/// Returns 0 for order 0.
#[inline]
pub const fn operand_bits(order: usize) -> u32 {
    if order == 0 {
        return 0;
    }
    let bits = KEY_PAYLOAD_BITS / order as u32;
    if bits > MAX_OPERAND_BITS {
        MAX_OPERAND_BITS
    } else {
        bits
    }
}

/// Exclusive upper bound for a term id inside an order-`order` key.
#[inline]
pub const fn id_limit(order: usize) -> u64 {
    1u64 << operand_bits(order)
}

static_assertions::const_assert!(operand_bits(1) == 32);
static_assertions::const_assert!(operand_bits(2) == 31);
static_assertions::const_assert!(operand_bits(3) == 20);
static_assertions::const_assert!(
    operand_bits(MAX_SUPPORTED_ORDER) as usize * MAX_SUPPORTED_ORDER <= KEY_PAYLOAD_BITS as usize
);

/// Fails with `UnsupportedOrder` unless `1 <= order <= max`.
#[inline]
pub(crate) fn check_order(order: usize, max: usize) -> Result<()> {
    if order == 0 || order > max {
        return Err(Error::UnsupportedOrder { order, max });
    }
    Ok(())
}

/// Order stored in the tag of `key`.
#[inline]
pub fn order_of(key: NgramKey) -> usize {
    (key >> KEY_PAYLOAD_BITS) as usize + 1
}

/// Pack `ids` into an order-`order` key.
///
/// `ids.len()` must equal `order`; a mismatch is reported as an unsupported
/// order of `ids.len()`. Any id at or above [`id_limit`] fails with
/// `EncodingOverflow`.
pub fn encode(order: usize, ids: &[TermId]) -> Result<NgramKey> {
    check_order(order, MAX_SUPPORTED_ORDER)?;
    if ids.len() != order {
        return Err(Error::UnsupportedOrder {
            order: ids.len(),
            max: MAX_SUPPORTED_ORDER,
        });
    }
    let bits = operand_bits(order);
    let limit = id_limit(order);
    let mut key: NgramKey = 0;
    for &id in ids {
        let id = u64::from(id);
        if id >= limit {
            return Err(Error::EncodingOverflow { order, id, limit });
        }
        key = (key << bits) | id;
    }
    Ok(key | ((order as u64 - 1) << KEY_PAYLOAD_BITS))
}

/// Unpack a key produced by [`encode`] into `(order, ids)`.
pub fn decode(key: NgramKey) -> Result<(usize, Vec<TermId>)> {
    let order = order_of(key);
    check_order(order, MAX_SUPPORTED_ORDER)?;
    let bits = operand_bits(order);
    let mask = id_limit(order) - 1;
    let payload = key & (NgramKey::MAX >> ORDER_TAG_BITS);
    let used = bits * order as u32;
    if used < KEY_PAYLOAD_BITS && payload >> used != 0 {
        return Err(Error::MalformedKey(key));
    }
    let ids = (0..order)
        .rev()
        .map(|field| ((payload >> (field as u32 * bits)) & mask) as TermId)
        .collect();
    Ok((order, ids))
}
