//! Program image container and serialization.
//!
//! Binary layout of a `.vm` file:
//!
//! ```text
//! offset  bytes
//! 0       5    signature: 0x2E 'l' 'n' 'g' 0x00
//! 5       N    data section: NUL-terminated byte strings,
//!              then one extra 0x00 closing the section
//! 5+N     M    code section: opcode/operand stream until EOF
//! ```

use thiserror::Error;

/// The five-byte file signature: `.lng\0`.
pub const SIGNATURE: [u8; 5] = [0x2E, b'l', b'n', b'g', 0x00];

/// Errors while loading a program image.
#[derive(Debug, Error)]
pub enum ImageError {
    /// Missing or wrong signature bytes.
    #[error("invalid file format")]
    BadSignature,

    /// The data section ran past the end of the file.
    #[error("invalid file format")]
    TruncatedData,
}

/// A loaded (or about-to-be-written) program image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgramImage {
    /// Data pool entries, addressed by zero-based index.
    pub data: Vec<String>,
    /// The raw code section.
    pub code: Vec<u8>,
}

impl ProgramImage {
    /// Serialize to the on-disk layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(
            SIGNATURE.len() + self.data.iter().map(|d| d.len() + 1).sum::<usize>() + 1
                + self.code.len(),
        );

        bytes.extend_from_slice(&SIGNATURE);

        for entry in &self.data {
            bytes.extend_from_slice(entry.as_bytes());
            bytes.push(0);
        }
        bytes.push(0);

        bytes.extend_from_slice(&self.code);
        bytes
    }

    /// Parse the on-disk layout.
    ///
    /// Verifies the signature, reads NUL-terminated data entries up to
    /// the section-closing NUL, and keeps the remainder as code.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ImageError> {
        let Some(rest) = bytes.strip_prefix(&SIGNATURE[..]) else {
            return Err(ImageError::BadSignature);
        };

        let mut data = Vec::new();
        let mut offset = 0;

        loop {
            match rest.get(offset) {
                None => return Err(ImageError::TruncatedData),
                Some(0) => {
                    offset += 1;
                    break;
                },
                Some(_) => {
                    let start = offset;
                    while let Some(&byte) = rest.get(offset) {
                        if byte == 0 {
                            break;
                        }
                        offset += 1;
                    }
                    if rest.get(offset).is_none() {
                        return Err(ImageError::TruncatedData);
                    }
                    data.push(String::from_utf8_lossy(&rest[start..offset]).into_owned());
                    offset += 1; // entry NUL
                },
            }
        }

        Ok(Self {
            data,
            code: rest[offset..].to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let image = ProgramImage {
            data: vec!["hi".to_string(), "main".to_string()],
            code: vec![9, 0, 0, 0, 0, 38],
        };
        let bytes = image.to_bytes();
        assert_eq!(&bytes[..5], &SIGNATURE);
        let parsed = ProgramImage::from_bytes(&bytes).expect("parse failed");
        assert_eq!(parsed, image);
    }

    #[test]
    fn test_empty_data_section() {
        let image = ProgramImage {
            data: Vec::new(),
            code: vec![0],
        };
        let bytes = image.to_bytes();
        // signature + lone section terminator + code
        assert_eq!(bytes.len(), 7);
        let parsed = ProgramImage::from_bytes(&bytes).expect("parse failed");
        assert_eq!(parsed, image);
    }

    #[test]
    fn test_bad_signature() {
        let err = ProgramImage::from_bytes(b"not an image").unwrap_err();
        assert_eq!(err.to_string(), "invalid file format");
    }

    #[test]
    fn test_truncated_data_section() {
        let mut bytes = SIGNATURE.to_vec();
        bytes.extend_from_slice(b"unterminated");
        assert!(ProgramImage::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_empty_code_section() {
        let mut bytes = SIGNATURE.to_vec();
        bytes.push(0);
        let parsed = ProgramImage::from_bytes(&bytes).expect("parse failed");
        assert!(parsed.data.is_empty());
        assert!(parsed.code.is_empty());
    }
}
