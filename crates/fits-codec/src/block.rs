/// FITS block size in bytes (each logical record is one block).
pub const BLOCK_SIZE: usize = 2880;

/// FITS card (keyword record) size in bytes.
pub const CARD_SIZE: usize = 80;

/// Number of cards that fit in a single block.
pub const CARDS_PER_BLOCK: usize = BLOCK_SIZE / CARD_SIZE;

/// Padding byte used for header blocks (ASCII space).
pub const HEADER_PAD_BYTE: u8 = 0x20;

/// Padding byte used for data blocks (zero).
pub const DATA_PAD_BYTE: u8 = 0x00;

/// Returns the number of FITS blocks required to hold `num_bytes` bytes.
///
/// 0 bytes requires 0 blocks, 1 byte requires 1 block, 2880 bytes requires
/// 1 block, 2881 bytes requires 2 blocks.
pub const fn blocks_needed(num_bytes: usize) -> usize {
    num_bytes.div_ceil(BLOCK_SIZE)
}

/// Returns the total byte length (in whole blocks) required to hold `num_bytes`.
pub const fn padded_byte_len(num_bytes: usize) -> usize {
    blocks_needed(num_bytes) * BLOCK_SIZE
}

/// Number of bytes between `position` and the next block boundary.
///
/// Zero when `position` already sits on a boundary.
pub const fn bytes_to_boundary(position: u64) -> usize {
    let rem = (position % BLOCK_SIZE as u64) as usize;
    if rem == 0 {
        0
    } else {
        BLOCK_SIZE - rem
    }
}

/// Appends `pad_byte` to `buf` until its length is a multiple of [`BLOCK_SIZE`].
pub fn pad_to_block(buf: &mut Vec<u8>, pad_byte: u8) {
    let target = padded_byte_len(buf.len());
    buf.resize(target, pad_byte);
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---- blocks_needed ----

    #[test]
    fn blocks_needed_boundaries() {
        assert_eq!(blocks_needed(0), 0);
        assert_eq!(blocks_needed(1), 1);
        assert_eq!(blocks_needed(BLOCK_SIZE), 1);
        assert_eq!(blocks_needed(BLOCK_SIZE + 1), 2);
        assert_eq!(blocks_needed(5761), 3);
    }

    #[test]
    fn padded_byte_len_unaligned() {
        assert_eq!(padded_byte_len(0), 0);
        assert_eq!(padded_byte_len(8), BLOCK_SIZE);
        assert_eq!(padded_byte_len(2 * BLOCK_SIZE), 2 * BLOCK_SIZE);
    }

    #[test]
    fn constant_relationships() {
        assert_eq!(CARDS_PER_BLOCK, 36);
        assert_eq!(CARDS_PER_BLOCK * CARD_SIZE, BLOCK_SIZE);
    }

    // ---- boundaries ----

    #[test]
    fn bytes_to_boundary_values() {
        assert_eq!(bytes_to_boundary(0), 0);
        assert_eq!(bytes_to_boundary(8), BLOCK_SIZE - 8);
        assert_eq!(bytes_to_boundary(BLOCK_SIZE as u64), 0);
        assert_eq!(bytes_to_boundary(BLOCK_SIZE as u64 + 1), BLOCK_SIZE - 1);
    }

    #[test]
    fn pad_to_block_with_spaces() {
        let mut buf = vec![b'A'; 80];
        pad_to_block(&mut buf, HEADER_PAD_BYTE);
        assert_eq!(buf.len(), BLOCK_SIZE);
        assert!(buf[80..].iter().all(|&b| b == HEADER_PAD_BYTE));
    }

    #[test]
    fn pad_to_block_aligned_is_noop() {
        let mut buf = vec![0xAB; BLOCK_SIZE];
        pad_to_block(&mut buf, DATA_PAD_BYTE);
        assert_eq!(buf.len(), BLOCK_SIZE);
    }
}
