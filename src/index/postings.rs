//! Blocked posting-list layout
//!
//! A term's list is a sequence of physical blocks of up to
//! `POSTINGS_PER_BLOCK` postings. A block payload is the varbyte-encoded
//! d-gaps of its docIDs followed by the varbyte-encoded raw term
//! frequencies, non-interleaved. The first gap of each block is taken
//! relative to the previous block's last docID (0 for the first block),
//! so every block decodes given only its predecessor's skip pointer.

use super::types::{BlockMeta, DocId, Posting, POSTINGS_PER_BLOCK};
use crate::codec::{decode_varbyte_sequence, dgap_decode_in_place, dgap_encode, encode_varbyte};
use crate::error::{CuttlefishError, Result};

/// Encode one term's coalesced posting list into consecutive blocks
///
/// Appends the block payloads to `out` and one `BlockMeta` per block to
/// `blocks`. `postings` must be strictly ascending by docID.
pub fn encode_posting_list(postings: &[Posting], out: &mut Vec<u8>, blocks: &mut Vec<BlockMeta>) {
    let mut prev_last: DocId = 0;

    for chunk in postings.chunks(POSTINGS_PER_BLOCK) {
        let start = out.len();

        let doc_ids: Vec<DocId> = chunk.iter().map(|p| p.doc_id).collect();
        for gap in dgap_encode(&doc_ids, prev_last) {
            encode_varbyte(gap, out);
        }
        for posting in chunk {
            encode_varbyte(posting.term_freq, out);
        }

        let last_doc_id = chunk.last().expect("chunks are nonempty").doc_id;
        blocks.push(BlockMeta {
            length: (out.len() - start) as u32,
            last_doc_id,
        });
        prev_last = last_doc_id;
    }
}

/// One decoded block, docIDs reconstructed to absolute values
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedBlock {
    pub doc_ids: Vec<DocId>,
    pub term_freqs: Vec<u32>,
}

impl DecodedBlock {
    pub fn len(&self) -> usize {
        self.doc_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc_ids.is_empty()
    }
}

/// Decode one block payload
///
/// `base_doc_id` is the previous block's last docID, 0 for the first
/// block of a list. The payload must decode to an even number of
/// codewords (n gaps then n frequencies); anything else is corruption.
pub fn decode_block(payload: &[u8], base_doc_id: DocId) -> Result<DecodedBlock> {
    let values = decode_varbyte_sequence(payload)?;
    if values.len() % 2 != 0 {
        return Err(CuttlefishError::CorruptIndex(format!(
            "block decodes to {} codewords, expected an even count",
            values.len()
        )));
    }

    let n = values.len() / 2;
    let mut doc_ids = values[..n].to_vec();
    dgap_decode_in_place(&mut doc_ids, base_doc_id);
    let term_freqs = values[n..].to_vec();

    Ok(DecodedBlock {
        doc_ids,
        term_freqs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn postings(pairs: &[(u32, u32)]) -> Vec<Posting> {
        pairs.iter().map(|&(d, f)| Posting::new(d, f)).collect()
    }

    fn decode_list(bytes: &[u8], blocks: &[BlockMeta]) -> Vec<Posting> {
        let mut result = Vec::new();
        let mut offset = 0usize;
        let mut base = 0;
        for meta in blocks {
            let payload = &bytes[offset..offset + meta.length as usize];
            let decoded = decode_block(payload, base).unwrap();
            for i in 0..decoded.len() {
                result.push(Posting::new(decoded.doc_ids[i], decoded.term_freqs[i]));
            }
            offset += meta.length as usize;
            base = meta.last_doc_id;
        }
        assert_eq!(offset, bytes.len());
        result
    }

    #[test]
    fn test_single_block_roundtrip() {
        let list = postings(&[(7, 1), (12, 3), (500, 2)]);
        let mut bytes = Vec::new();
        let mut blocks = Vec::new();
        encode_posting_list(&list, &mut bytes, &mut blocks);

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].last_doc_id, 500);
        assert_eq!(blocks[0].length as usize, bytes.len());
        assert_eq!(decode_list(&bytes, &blocks), list);
    }

    #[test]
    fn test_single_posting_block_size() {
        // docID 7 and tf 1 are one varbyte each
        let list = postings(&[(7, 1)]);
        let mut bytes = Vec::new();
        let mut blocks = Vec::new();
        encode_posting_list(&list, &mut bytes, &mut blocks);

        assert_eq!(bytes.len(), 2);
        assert_eq!(blocks[0].length, 2);
        assert_eq!(blocks[0].last_doc_id, 7);
    }

    #[test]
    fn test_block_boundaries() {
        // 130 postings split 64 / 64 / 2 with correct skip pointers
        let list: Vec<Posting> = (1..=130).map(|d| Posting::new(d, 1)).collect();
        let mut bytes = Vec::new();
        let mut blocks = Vec::new();
        encode_posting_list(&list, &mut bytes, &mut blocks);

        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0].last_doc_id, 64);
        assert_eq!(blocks[1].last_doc_id, 128);
        assert_eq!(blocks[2].last_doc_id, 130);
        assert_eq!(decode_list(&bytes, &blocks), list);
    }

    #[test]
    fn test_cross_block_gaps_are_relative() {
        // First gap of block 1 is relative to block 0's last docID, so
        // dense docIDs stay single-byte codewords in every block
        let list: Vec<Posting> = (1000..1000 + 65).map(|d| Posting::new(d, 1)).collect();
        let mut bytes = Vec::new();
        let mut blocks = Vec::new();
        encode_posting_list(&list, &mut bytes, &mut blocks);

        assert_eq!(blocks.len(), 2);
        // Block 1 holds one posting: gap 1 plus tf 1, two bytes total
        assert_eq!(blocks[1].length, 2);
        assert_eq!(decode_list(&bytes, &blocks), list);
    }

    #[test]
    fn test_decode_odd_codeword_count_is_corrupt() {
        let mut payload = Vec::new();
        encode_varbyte(1, &mut payload);
        encode_varbyte(2, &mut payload);
        encode_varbyte(3, &mut payload);

        let err = decode_block(&payload, 0).unwrap_err();
        assert!(matches!(err, CuttlefishError::CorruptIndex(_)));
    }

    #[test]
    fn test_decode_truncated_payload() {
        let list = postings(&[(300, 1)]);
        let mut bytes = Vec::new();
        let mut blocks = Vec::new();
        encode_posting_list(&list, &mut bytes, &mut blocks);

        // Cut inside the two-byte gap codeword, leaving a dangling
        // continuation byte
        let err = decode_block(&bytes[..1], 0).unwrap_err();
        assert!(matches!(err, CuttlefishError::TruncatedCodeword { .. }));
    }

    #[test]
    fn test_empty_list_writes_nothing() {
        let mut bytes = Vec::new();
        let mut blocks = Vec::new();
        encode_posting_list(&[], &mut bytes, &mut blocks);
        assert!(bytes.is_empty());
        assert!(blocks.is_empty());
    }
}
