//! Splitting firmware words into the fixed-size packets the programming FIFO accepts
use std::ops::Deref;

/// Depth of the programming FIFO in 32-bit words
pub const FIFO_WORD_SIZE: usize = 256;
/// Words per packet, half the FIFO so a packet always fits once the FIFO is half drained
pub const PACKET_WORDS: usize = FIFO_WORD_SIZE / 2;
/// Byte used to pad a trailing partial word
pub const FILLER: u8 = 0xEE;

/// A run of consecutive words from a firmware image, written to the bus in one block transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet(pub Vec<u32>);

impl Deref for Packet {
    type Target = [u32];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Pack bytes into big-endian words, padding the last word with [`FILLER`]
#[must_use]
pub fn words_from_bytes(bytes: &[u8]) -> Vec<u32> {
    bytes
        .chunks(4)
        .map(|chunk| {
            let mut word = [FILLER; 4];
            word[..chunk.len()].copy_from_slice(chunk);
            u32::from_be_bytes(word)
        })
        .collect()
}

/// Split `words` into packets of `packet_words`, the last one holding the remainder
///
/// # Panics
/// Panics if `packet_words` is zero
#[must_use]
pub fn packetize(words: &[u32], packet_words: usize) -> Vec<Packet> {
    assert!(packet_words > 0, "Packets must hold at least one word");
    words
        .chunks(packet_words)
        .map(|chunk| Packet(chunk.to_vec()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use paste::paste;

    macro_rules! test_packet_count {
        ($words:literal, $packets:literal, $last:literal) => {
            paste! {
                #[test]
                fn [<test_packetize_ $words _words>]() {
                    let words: Vec<u32> = (0..$words).collect();
                    let packets = packetize(&words, PACKET_WORDS);
                    assert_eq!(packets.len(), $packets);
                    if let Some(last) = packets.last() {
                        assert_eq!(last.len(), $last);
                    }
                    let flat: Vec<u32> = packets.iter().flat_map(|p| p.iter().copied()).collect();
                    assert_eq!(flat, words);
                }
            }
        };
    }

    test_packet_count!(0, 0, 0);
    test_packet_count!(1, 1, 1);
    test_packet_count!(128, 1, 128);
    test_packet_count!(300, 3, 44);

    #[test]
    fn test_words_big_endian() {
        assert_eq!(
            words_from_bytes(&[0xAA, 0x99, 0x55, 0x66, 0x01, 0x02, 0x03, 0x04]),
            vec![0xAA99_5566, 0x0102_0304]
        );
    }

    #[test]
    fn test_words_padding() {
        assert_eq!(
            words_from_bytes(&[0x12, 0x34, 0x56, 0x78, 0x9A]),
            vec![0x1234_5678, 0x9AEE_EEEE]
        );
        assert!(words_from_bytes(&[]).is_empty());
    }
}
