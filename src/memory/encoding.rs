//! String encoding and decoding for the encodings consoles use

use crate::core::types::{StringComparison, StringEncoding};

/// Encodes `text`, or returns `None` when a character cannot be represented
pub fn encode(text: &str, encoding: StringEncoding) -> Option<Vec<u8>> {
    match encoding {
        StringEncoding::Ascii => text.is_ascii().then(|| text.as_bytes().to_vec()),
        StringEncoding::Utf8 => Some(text.as_bytes().to_vec()),
        StringEncoding::Utf16Le => Some(text.encode_utf16().flat_map(u16::to_le_bytes).collect()),
        StringEncoding::Utf16Be => Some(text.encode_utf16().flat_map(u16::to_be_bytes).collect()),
        StringEncoding::Utf32Le => Some(text.chars().flat_map(|c| (c as u32).to_le_bytes()).collect()),
        StringEncoding::Utf32Be => Some(text.chars().flat_map(|c| (c as u32).to_be_bytes()).collect()),
    }
}

/// Decodes `bytes`, returning `None` on any invalid code unit sequence
pub fn decode(bytes: &[u8], encoding: StringEncoding) -> Option<String> {
    if bytes.len() % encoding.unit_size() != 0 {
        return None;
    }

    match encoding {
        StringEncoding::Ascii => {
            if bytes.is_ascii() {
                std::str::from_utf8(bytes).ok().map(str::to_owned)
            } else {
                None
            }
        }
        StringEncoding::Utf8 => std::str::from_utf8(bytes).ok().map(str::to_owned),
        StringEncoding::Utf16Le | StringEncoding::Utf16Be => {
            let units = bytes.chunks_exact(2).map(|pair| {
                let raw = [pair[0], pair[1]];
                if encoding == StringEncoding::Utf16Le {
                    u16::from_le_bytes(raw)
                } else {
                    u16::from_be_bytes(raw)
                }
            });
            char::decode_utf16(units).collect::<Result<String, _>>().ok()
        }
        StringEncoding::Utf32Le | StringEncoding::Utf32Be => bytes
            .chunks_exact(4)
            .map(|quad| {
                let raw = [quad[0], quad[1], quad[2], quad[3]];
                let code = if encoding == StringEncoding::Utf32Le {
                    u32::from_le_bytes(raw)
                } else {
                    u32::from_be_bytes(raw)
                };
                char::from_u32(code)
            })
            .collect(),
    }
}

/// Compares two strings under the given case policy
pub fn equals(a: &str, b: &str, comparison: StringComparison) -> bool {
    match comparison {
        StringComparison::CaseSensitive => a == b,
        StringComparison::IgnoreCase => a.to_lowercase() == b.to_lowercase(),
    }
}
