use crate::error::ChordError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

/// Number of bits in an identifier, and therefore the number of finger slots.
pub const BITS: usize = 256;

const LIMBS: usize = 4;
// Largest power of ten that fits in a u64, used to render decimal chunks.
const DECIMAL_CHUNK: u64 = 10_000_000_000_000_000_000;
const DECIMAL_CHUNK_DIGITS: usize = 19;
const SHORT_HEX_DIGITS: usize = 12;

/// NodeId represents a position on the Chord ring: an unsigned integer modulo 2^256.
///
/// Limbs are stored most significant first, so the derived ordering is the
/// numeric one. Ring positions must be compared with [`NodeId::between`] or
/// [`NodeId::between_right_incl`], never with `<`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct NodeId([u64; LIMBS]);

impl NodeId {
    pub const ZERO: NodeId = NodeId([0; LIMBS]);
    pub const MAX: NodeId = NodeId([u64::MAX; LIMBS]);

    /// Creates a uniformly distributed identifier, used to place new nodes.
    pub fn random() -> Self {
        NodeId(rand::random::<[u64; LIMBS]>())
    }

    /// Hashes arbitrary key bytes into the identifier space.
    pub fn from_key(key: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(key);
        let digest = hasher.finalize();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Self::from_bytes(bytes)
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        let mut limbs = [0u64; LIMBS];
        for (limb, chunk) in limbs.iter_mut().zip(bytes.chunks_exact(8)) {
            let mut word = [0u8; 8];
            word.copy_from_slice(chunk);
            *limb = u64::from_be_bytes(word);
        }
        NodeId(limbs)
    }

    /// Builds an identifier from up to 32 big-endian bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ChordError> {
        if bytes.len() > 32 {
            return Err(ChordError::InvalidNodeId(format!(
                "{} bytes do not fit in {} bits",
                bytes.len(),
                BITS
            )));
        }
        let mut padded = [0u8; 32];
        padded[32 - bytes.len()..].copy_from_slice(bytes);
        Ok(Self::from_bytes(padded))
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        for (chunk, limb) in bytes.chunks_exact_mut(8).zip(self.0.iter()) {
            chunk.copy_from_slice(&limb.to_be_bytes());
        }
        bytes
    }

    /// Returns 2^k. `k` must be below [`BITS`].
    pub fn pow2(k: usize) -> Self {
        assert!(k < BITS, "2^{} overflows the identifier space", k);
        let mut limbs = [0u64; LIMBS];
        limbs[LIMBS - 1 - k / 64] = 1u64 << (k % 64);
        NodeId(limbs)
    }

    pub fn wrapping_add(&self, rhs: &NodeId) -> NodeId {
        let mut out = [0u64; LIMBS];
        let mut carry = false;
        for i in (0..LIMBS).rev() {
            let (sum, c1) = self.0[i].overflowing_add(rhs.0[i]);
            let (sum, c2) = sum.overflowing_add(carry as u64);
            out[i] = sum;
            carry = c1 || c2;
        }
        NodeId(out)
    }

    pub fn wrapping_sub(&self, rhs: &NodeId) -> NodeId {
        let mut out = [0u64; LIMBS];
        let mut borrow = false;
        for i in (0..LIMBS).rev() {
            let (diff, b1) = self.0[i].overflowing_sub(rhs.0[i]);
            let (diff, b2) = diff.overflowing_sub(borrow as u64);
            out[i] = diff;
            borrow = b1 || b2;
        }
        NodeId(out)
    }

    /// Whether `self` lies strictly inside the clockwise arc `(lo, hi)`.
    ///
    /// When `lo == hi` the arc covers the whole ring except `lo` itself.
    pub fn between(&self, lo: &NodeId, hi: &NodeId) -> bool {
        match lo.cmp(hi) {
            Ordering::Less => lo < self && self < hi,
            Ordering::Greater => self > lo || self < hi,
            Ordering::Equal => self != lo,
        }
    }

    /// Whether `self` lies on the clockwise arc `(lo, hi]`.
    ///
    /// When `lo == hi` the arc covers the whole ring.
    pub fn between_right_incl(&self, lo: &NodeId, hi: &NodeId) -> bool {
        self == hi || self.between(lo, hi)
    }

    /// Renders the identifier as a decimal string, the form used on the wire.
    pub fn to_decimal(&self) -> String {
        if *self == NodeId::ZERO {
            return "0".to_string();
        }
        let mut chunks = Vec::new();
        let mut rest = *self;
        while rest != NodeId::ZERO {
            let (quotient, remainder) = rest.div_rem_small(DECIMAL_CHUNK);
            chunks.push(remainder);
            rest = quotient;
        }
        let mut out = String::with_capacity(chunks.len() * DECIMAL_CHUNK_DIGITS);
        for (i, chunk) in chunks.iter().rev().enumerate() {
            if i == 0 {
                out.push_str(&chunk.to_string());
            } else {
                out.push_str(&format!("{:0width$}", chunk, width = DECIMAL_CHUNK_DIGITS));
            }
        }
        out
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    fn div_rem_small(&self, divisor: u64) -> (NodeId, u64) {
        let mut out = [0u64; LIMBS];
        let mut remainder: u128 = 0;
        for (i, limb) in self.0.iter().enumerate() {
            let acc = (remainder << 64) | *limb as u128;
            out[i] = (acc / divisor as u128) as u64;
            remainder = acc % divisor as u128;
        }
        (NodeId(out), remainder as u64)
    }

    fn checked_mul_add_small(&self, mul: u64, add: u64) -> Option<NodeId> {
        let mut out = [0u64; LIMBS];
        let mut carry = add as u128;
        for i in (0..LIMBS).rev() {
            let acc = self.0[i] as u128 * mul as u128 + carry;
            out[i] = acc as u64;
            carry = acc >> 64;
        }
        (carry == 0).then_some(NodeId(out))
    }
}

impl FromStr for NodeId {
    type Err = ChordError;

    /// Parses a decimal string in `[0, 2^256)`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ChordError::InvalidNodeId("empty identifier".into()));
        }
        let mut id = NodeId::ZERO;
        for c in s.chars() {
            let digit = c
                .to_digit(10)
                .ok_or_else(|| ChordError::InvalidNodeId(format!("'{}' is not decimal", s)))?;
            id = id
                .checked_mul_add_small(10, digit as u64)
                .ok_or_else(|| ChordError::InvalidNodeId(format!("'{}' exceeds 2^256", s)))?;
        }
        Ok(id)
    }
}

impl From<u64> for NodeId {
    fn from(value: u64) -> Self {
        NodeId([0, 0, 0, value])
    }
}

impl From<u128> for NodeId {
    fn from(value: u128) -> Self {
        NodeId([0, 0, (value >> 64) as u64, value as u64])
    }
}

impl Add for NodeId {
    type Output = NodeId;

    fn add(self, rhs: NodeId) -> NodeId {
        self.wrapping_add(&rhs)
    }
}

impl Sub for NodeId {
    type Output = NodeId;

    fn sub(self, rhs: NodeId) -> NodeId {
        self.wrapping_sub(&rhs)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.to_decimal())
    }
}

/// Short form for logs: `0x` and at most 12 significant hex digits, with a
/// trailing `..` when cut. The alternate form (`{:#}`) prints the full decimal.
impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            return f.write_str(&self.to_decimal());
        }
        let hex = self.to_hex();
        let digits = hex.trim_start_matches('0');
        if digits.is_empty() {
            f.write_str("0x0")
        } else if digits.len() <= SHORT_HEX_DIGITS {
            write!(f, "0x{}", digits)
        } else {
            write!(f, "0x{}..", &digits[..SHORT_HEX_DIGITS])
        }
    }
}

impl fmt::LowerHex for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_decimal())
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A peer on the ring: its identifier and the endpoint it serves RPCs on.
///
/// Nodes are values; a changed peer is a new `Node`. Nodes order by
/// identifier. Two nodes with the same identifier but different endpoints
/// are unequal, so the endpoint breaks ties to keep `Ord` in line with `Eq`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub endpoint: String,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, endpoint: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            endpoint: endpoint.into(),
        }
    }
}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id
            .cmp(&other.id)
            .then_with(|| self.endpoint.cmp(&other.endpoint))
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.endpoint)
    }
}
