//! Distinguished names and serial numbers.
//!
//! Names are compared in a normalized RFC 4514 form: attribute types upper-cased,
//! values case-folded, insignificant whitespace collapsed and RDN order preserved.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};

/// An X.500 distinguished name, kept in its string form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistinguishedName {
    raw: String,
    #[serde(skip)]
    normalized: String,
}

impl DistinguishedName {
    /// Create a name from its RFC 4514 string representation.
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let normalized = normalize(&raw);
        Self { raw, normalized }
    }

    /// The name as originally supplied.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The comparison form of the name.
    pub fn normalized(&self) -> Cow<'_, str> {
        normalize_cached(self)
    }

    /// Value of the first attribute with the given type (e.g. `CN`).
    pub fn attribute(&self, attr_type: &str) -> Option<String> {
        split_rdns(&self.raw).into_iter().find_map(|rdn| {
            let (t, v) = rdn.split_once('=')?;
            if t.trim().eq_ignore_ascii_case(attr_type) {
                Some(v.trim().to_string())
            } else {
                None
            }
        })
    }

    /// Common name, if present.
    pub fn common_name(&self) -> Option<String> {
        self.attribute("CN")
    }
}

impl PartialEq for DistinguishedName {
    fn eq(&self, other: &Self) -> bool {
        normalize_cached(self) == normalize_cached(other)
    }
}

impl Eq for DistinguishedName {}

impl Hash for DistinguishedName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        normalize_cached(self).hash(state);
    }
}

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl From<&str> for DistinguishedName {
    fn from(s: &str) -> Self {
        DistinguishedName::new(s)
    }
}

// Deserialized names skip the cached form.
fn normalize_cached(name: &DistinguishedName) -> Cow<'_, str> {
    if name.normalized.is_empty() && !name.raw.is_empty() {
        Cow::Owned(normalize(&name.raw))
    } else {
        Cow::Borrowed(&name.normalized)
    }
}

/// Split a DN on unescaped commas.
fn split_rdns(raw: &str) -> Vec<String> {
    let mut rdns = Vec::new();
    let mut current = String::new();
    let mut escaped = false;
    for c in raw.chars() {
        if escaped {
            current.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' => {
                current.push(c);
                escaped = true;
            },
            ',' | ';' => rdns.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        rdns.push(current);
    }
    rdns
}

fn normalize(raw: &str) -> String {
    split_rdns(raw)
        .iter()
        .map(|rdn| match rdn.split_once('=') {
            Some((t, v)) => {
                let value = v.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
                format!("{}={}", t.trim().to_uppercase(), value)
            },
            None => rdn.trim().to_lowercase(),
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Certificate serial number as unsigned big-endian bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SerialNumber(Vec<u8>);

impl SerialNumber {
    /// Create a serial from big-endian bytes; leading zero bytes are dropped.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
        Self(bytes[start..].to_vec())
    }

    /// Create a serial from an unsigned integer.
    pub fn from_u64(value: u64) -> Self {
        Self::from_bytes(&value.to_be_bytes())
    }

    /// Parse a decimal serial as used in XAdES `IssuerSerial` elements.
    pub fn from_decimal(decimal: &str) -> Option<Self> {
        let digits = decimal.trim();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let mut bytes: Vec<u8> = Vec::new();
        for d in digits.bytes() {
            let mut carry = (d - b'0') as u32;
            for byte in bytes.iter_mut().rev() {
                let v = (*byte as u32) * 10 + carry;
                *byte = (v & 0xff) as u8;
                carry = v >> 8;
            }
            while carry > 0 {
                bytes.insert(0, (carry & 0xff) as u8);
                carry >>= 8;
            }
        }
        Some(Self::from_bytes(&bytes))
    }

    /// Big-endian bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Decimal representation.
    pub fn to_decimal(&self) -> String {
        if self.0.is_empty() {
            return "0".to_string();
        }
        let mut digits = Vec::new();
        let mut value = self.0.clone();
        while value.iter().any(|&b| b != 0) {
            let mut remainder = 0u32;
            for byte in value.iter_mut() {
                let acc = (remainder << 8) | *byte as u32;
                *byte = (acc / 10) as u8;
                remainder = acc % 10;
            }
            digits.push(b'0' + remainder as u8);
        }
        digits.reverse();
        String::from_utf8_lossy(&digits).into_owned()
    }

    /// Lower-case hex representation.
    pub fn to_hex(&self) -> String {
        if self.0.is_empty() {
            return "00".to_string();
        }
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Display for SerialNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
