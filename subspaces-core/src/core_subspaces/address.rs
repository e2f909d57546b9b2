//! Syntactic address validation
//!
//! The state machine never decodes addresses into keys or accounts; it only
//! needs to reject malformed strings before storing them. Hosts plug their
//! own rules through [`AddressValidator`]. [`Bech32Validator`] covers the
//! common case of bech32 account addresses with a fixed human-readable prefix.

/// Host-supplied syntactic address check
pub trait AddressValidator: Send + Sync {
    /// Return a description of the problem if `address` is malformed
    fn validate(&self, address: &str) -> Result<(), String>;

    /// Single spelling of `address` used for keys and comparisons.
    ///
    /// Two strings naming the same account must map to the same output.
    fn canonicalize(&self, address: &str) -> String {
        address.to_string()
    }
}

const CHARSET: &[u8; 32] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";
const GENERATORS: [u32; 5] = [
    0x3b6a_57b2,
    0x2650_8e6d,
    0x1ea1_19fa,
    0x3d42_33dd,
    0x2a14_62b3,
];
const MAX_LENGTH: usize = 90;
const CHECKSUM_LENGTH: usize = 6;

/// Validates bech32 addresses carrying a given human-readable prefix
#[derive(Debug, Clone)]
pub struct Bech32Validator {
    prefix: String,
}

impl Bech32Validator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into().to_lowercase(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Encode raw bytes as a bech32 string with this validator's prefix
    pub fn encode(&self, data: &[u8]) -> String {
        encode(&self.prefix, data)
    }
}

impl Default for Bech32Validator {
    fn default() -> Self {
        Self::new("desmos")
    }
}

impl AddressValidator for Bech32Validator {
    fn validate(&self, address: &str) -> Result<(), String> {
        if address.len() > MAX_LENGTH {
            return Err(format!("address longer than {} characters", MAX_LENGTH));
        }
        let has_lower = address.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = address.chars().any(|c| c.is_ascii_uppercase());
        if has_lower && has_upper {
            return Err("address mixes upper and lower case".to_string());
        }
        let address = address.to_lowercase();

        let separator = address
            .rfind('1')
            .ok_or_else(|| "missing bech32 separator".to_string())?;
        let (hrp, data) = (&address[..separator], &address[separator + 1..]);
        if hrp != self.prefix {
            return Err(format!("expected prefix {:?}, got {:?}", self.prefix, hrp));
        }
        if data.len() <= CHECKSUM_LENGTH {
            return Err("address data part too short".to_string());
        }

        let mut values = Vec::with_capacity(data.len());
        for c in data.bytes() {
            let value = CHARSET
                .iter()
                .position(|x| *x == c)
                .ok_or_else(|| format!("invalid bech32 character {:?}", c as char))?;
            values.push(value as u8);
        }

        let mut checked = expand_hrp(hrp);
        checked.extend_from_slice(&values);
        if polymod(&checked) != 1 {
            return Err("invalid bech32 checksum".to_string());
        }
        Ok(())
    }

    /// Bech32 is case-insensitive; the lowercase form is canonical
    fn canonicalize(&self, address: &str) -> String {
        address.to_ascii_lowercase()
    }
}

fn polymod(values: &[u8]) -> u32 {
    let mut chk: u32 = 1;
    for value in values {
        let top = chk >> 25;
        chk = ((chk & 0x01ff_ffff) << 5) ^ u32::from(*value);
        for (i, generator) in GENERATORS.iter().enumerate() {
            if (top >> i) & 1 == 1 {
                chk ^= generator;
            }
        }
    }
    chk
}

fn expand_hrp(hrp: &str) -> Vec<u8> {
    let mut expanded: Vec<u8> = hrp.bytes().map(|b| b >> 5).collect();
    expanded.push(0);
    expanded.extend(hrp.bytes().map(|b| b & 0x1f));
    expanded
}

fn to_five_bits(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() * 8 / 5 + 1);
    let mut acc: u32 = 0;
    let mut bits = 0;
    for byte in data {
        acc = ((acc << 8) | u32::from(*byte)) & 0x0fff;
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(((acc >> bits) & 0x1f) as u8);
        }
    }
    if bits > 0 {
        out.push(((acc << (5 - bits)) & 0x1f) as u8);
    }
    out
}

/// Encode `data` as a bech32 string with the given prefix
pub fn encode(prefix: &str, data: &[u8]) -> String {
    let values = to_five_bits(data);
    let mut checked = expand_hrp(prefix);
    checked.extend_from_slice(&values);
    checked.extend_from_slice(&[0; CHECKSUM_LENGTH]);
    let checksum = polymod(&checked) ^ 1;

    let mut encoded = String::with_capacity(prefix.len() + 1 + values.len() + CHECKSUM_LENGTH);
    encoded.push_str(prefix);
    encoded.push('1');
    for value in &values {
        encoded.push(CHARSET[*value as usize] as char);
    }
    for i in 0..CHECKSUM_LENGTH {
        let value = (checksum >> (5 * (5 - i))) & 0x1f;
        encoded.push(CHARSET[value as usize] as char);
    }
    encoded
}
