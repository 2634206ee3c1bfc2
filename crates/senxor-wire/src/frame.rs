//! Decoded thermal frame payloads.

/// One thermal frame as delivered by a `GFRA` acknowledgement.
///
/// Pixel values are raw 16-bit words; interpreting them (temperature units,
/// scaling) is up to the consumer. `data.len() == rows * cols`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameData {
    /// Telemetry header words, when the device was configured to send them.
    pub header: Option<Vec<u16>>,
    /// Pixel words in row-major order.
    pub data: Vec<u16>,
    /// Number of pixel rows.
    pub rows: usize,
    /// Number of pixel columns.
    pub cols: usize,
}

impl FrameData {
    /// The `(rows, cols)` geometry of this frame.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }
}

/// Convert little-endian byte pairs into 16-bit words.
pub(crate) fn words(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_words_little_endian() {
        assert_eq!(words(&[0x34, 0x12, 0xFF, 0x00]), vec![0x1234, 0x00FF]);
    }

    #[test]
    fn test_words_empty() {
        assert!(words(&[]).is_empty());
    }

    #[test]
    fn test_shape() {
        let frame = FrameData {
            header: None,
            data: vec![0; 4960],
            rows: 62,
            cols: 80,
        };
        assert_eq!(frame.shape(), (62, 80));
    }
}
