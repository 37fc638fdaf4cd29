//! payload encodings: text, 4 byte and 8 byte binary words

use num_traits::Float;

/// Encoding of the data block that follows a header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataStyle {
    Text,
    Binary4,
    Binary8,
}

impl Default for DataStyle {
    fn default() -> Self {
        DataStyle::Binary8
    }
}

impl DataStyle {
    /// spelling used after `Begin: Data` and `End: Data`
    pub fn label(&self) -> &'static str {
        match self {
            Self::Text => "Text",
            Self::Binary4 => "Binary 4",
            Self::Binary8 => "Binary 8",
        }
    }

    /// width in bytes of one binary word, `None` for text
    pub fn word_size(&self) -> Option<usize> {
        match self {
            Self::Text => None,
            Self::Binary4 => Some(4),
            Self::Binary8 => Some(8),
        }
    }

    /// collapsed form of the `begin`/`end` value naming this block
    pub(crate) fn marker(&self) -> &'static str {
        match self {
            Self::Text => "datatext",
            Self::Binary4 => "databinary4",
            Self::Binary8 => "databinary8",
        }
    }

    pub(crate) fn from_marker(marker: &str) -> Option<Self> {
        match marker {
            "datatext" => Some(Self::Text),
            "databinary4" => Some(Self::Binary4),
            "databinary8" => Some(Self::Binary8),
            _ => None,
        }
    }
}

/// How numbers are spelled in text data blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFormat {
    /// shortest representation that parses back to the same bits
    Shortest,
    /// scientific notation with this many significant digits
    Precision(usize),
}

impl Default for TextFormat {
    fn default() -> Self {
        TextFormat::Shortest
    }
}

impl TextFormat {
    pub(crate) fn push(&self, value: f64, out: &mut String) {
        match self {
            Self::Shortest => {
                let mut buffer = ryu::Buffer::new();
                out.push_str(buffer.format(value));
            }
            Self::Precision(digits) => {
                let digits = (*digits).max(1);
                out.push_str(&format!("{:.*e}", digits - 1, value));
            }
        }
    }
}

/// Order of the bytes inside a binary word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Big,
    Little,
}

impl ByteOrder {
    pub fn native() -> Self {
        if cfg!(target_endian = "big") {
            ByteOrder::Big
        } else {
            ByteOrder::Little
        }
    }
}

/// A floating point word of a binary data block.
pub(crate) trait BinaryWord: Float + std::fmt::Debug {
    const SIZE: usize;

    /// value written ahead of the payload to detect byte order mistakes
    const CHECK_VALUE: Self;

    /// `bytes` must hold exactly `SIZE` bytes
    fn decode(bytes: &[u8], order: ByteOrder) -> Self;

    fn encode(self, order: ByteOrder, out: &mut Vec<u8>);

    fn widen(self) -> f64;

    fn narrow(value: f64) -> Self;
}

impl BinaryWord for f32 {
    const SIZE: usize = 4;
    const CHECK_VALUE: f32 = 1_234_567.0;

    fn decode(bytes: &[u8], order: ByteOrder) -> Self {
        let mut word = [0u8; 4];
        word.copy_from_slice(&bytes[..4]);
        match order {
            ByteOrder::Big => f32::from_be_bytes(word),
            ByteOrder::Little => f32::from_le_bytes(word),
        }
    }

    fn encode(self, order: ByteOrder, out: &mut Vec<u8>) {
        match order {
            ByteOrder::Big => out.extend(self.to_be_bytes()),
            ByteOrder::Little => out.extend(self.to_le_bytes()),
        }
    }

    fn widen(self) -> f64 {
        f64::from(self)
    }

    fn narrow(value: f64) -> Self {
        value as f32
    }
}

impl BinaryWord for f64 {
    const SIZE: usize = 8;
    const CHECK_VALUE: f64 = 123_456_789_012_345.0;

    fn decode(bytes: &[u8], order: ByteOrder) -> Self {
        let mut word = [0u8; 8];
        word.copy_from_slice(&bytes[..8]);
        match order {
            ByteOrder::Big => f64::from_be_bytes(word),
            ByteOrder::Little => f64::from_le_bytes(word),
        }
    }

    fn encode(self, order: ByteOrder, out: &mut Vec<u8>) {
        match order {
            ByteOrder::Big => out.extend(self.to_be_bytes()),
            ByteOrder::Little => out.extend(self.to_le_bytes()),
        }
    }

    fn widen(self) -> f64 {
        self
    }

    fn narrow(value: f64) -> Self {
        value
    }
}

/// bytes of the check value as it appears in a file of the given order
pub(crate) fn check_bytes<F: BinaryWord>(order: ByteOrder) -> Vec<u8> {
    let mut out = Vec::with_capacity(F::SIZE);
    F::CHECK_VALUE.encode(order, &mut out);
    out
}

/// compare raw bytes against the check value without interpreting anything
/// else; the comparison is exact, a value that merely rounds equal fails
pub(crate) fn is_check_value<F: BinaryWord>(bytes: &[u8], order: ByteOrder) -> bool {
    bytes.len() == F::SIZE && bytes == check_bytes::<F>(order).as_slice()
}
