use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::codec::{BwtCodec, CodecKind, Compression, HuffmanCodec, LzwCodec};
use crate::error::Error;

fn codecs() -> Vec<(&'static str, Box<dyn Compression>)> {
    vec![
        ("huffman", Box::new(HuffmanCodec)),
        ("lzw-16", Box::new(LzwCodec::default())),
        ("lzw-9", Box::new(LzwCodec::new(9).unwrap())),
        // 0xFF never appears in the generated inputs below.
        ("bwt", Box::new(BwtCodec::new(97, 0xFF).unwrap())),
    ]
}

fn random_bytes(rng: &mut ChaCha8Rng, len: usize, alphabet: &[u8]) -> Vec<u8> {
    (0..len)
        .map(|_| alphabet[rng.gen_range(0..alphabet.len())])
        .collect()
}

fn assert_round_trip(input: &[u8]) {
    for (name, codec) in codecs() {
        let packed = codec
            .compress(input)
            .unwrap_or_else(|e| panic!("{name}: compress failed: {e}"));
        let unpacked = codec
            .decompress(&packed)
            .unwrap_or_else(|e| panic!("{name}: decompress failed: {e}"));
        assert_eq!(unpacked, input, "{name}: round trip of {} bytes", input.len());
    }
}

#[test]
fn test_empty_input_round_trips() {
    assert_round_trip(b"");
}

#[test]
fn test_single_byte_round_trips() {
    assert_round_trip(b"G");
}

#[test]
fn test_single_distinct_byte_round_trips() {
    assert_round_trip(&[b'A'; 1000]);
}

#[test]
fn test_random_nucleotides_round_trip() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x5eed);
    for len in [2, 17, 256, 1000, 4096] {
        let input = random_bytes(&mut rng, len, b"ACGT");
        assert_round_trip(&input);
    }
}

#[test]
fn test_random_bytes_round_trip() {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let alphabet: Vec<u8> = (0..0xFF).collect();
    for len in [1, 100, 3000] {
        let input = random_bytes(&mut rng, len, &alphabet);
        assert_round_trip(&input);
    }
}

#[test]
fn test_quality_like_input_round_trips() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let mut input = Vec::new();
    for _ in 0..50 {
        let run = rng.gen_range(1..40);
        let score = rng.gen_range(b'!'..=b'J');
        input.extend(std::iter::repeat(score).take(run));
        input.push(b'\n');
    }
    assert_round_trip(&input);
}

#[test]
fn test_huffman_shrinks_skewed_input() {
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let input: Vec<u8> = (0..5000)
        .map(|_| if rng.gen_bool(0.9) { b'I' } else { b'#' })
        .collect();
    let packed = HuffmanCodec.compress(&input).unwrap();
    assert!(packed.len() < input.len() / 5);
}

#[test]
fn test_lzw_shrinks_repetitive_input() {
    let input = b"ACGTACGTACGTACGT".repeat(200);
    let packed = LzwCodec::default().compress(&input).unwrap();
    assert!(packed.len() < input.len() / 4);
}

#[test]
fn test_bwt_groups_repeats() {
    let input = b"ACGTACGTACGTACGT".repeat(4);
    let transformed = BwtCodec::default().compress(&input).unwrap();
    let runs = transformed.windows(2).filter(|w| w[0] != w[1]).count();
    assert!(runs < input.len() / 4, "{} runs", runs);
}

#[test]
fn test_corrupt_streams_fail_cleanly() {
    let mut rng = ChaCha8Rng::seed_from_u64(99);
    let input = random_bytes(&mut rng, 500, b"ACGTN");
    for (name, codec) in codecs() {
        let packed = codec.compress(&input).unwrap();
        for cut in [1, packed.len() / 2, packed.len() - 1] {
            // Either a clean error or some output; never a panic.
            if let Ok(out) = codec.decompress(&packed[..cut]) {
                assert_ne!(out, input, "{name}: truncated stream decoded in full");
            }
        }
    }
}

#[test]
fn test_codec_kind_names() {
    for kind in CodecKind::ALL {
        assert_eq!(kind.name().parse::<CodecKind>().unwrap(), kind);
        assert_eq!(CodecKind::from_extension(kind.extension()), Some(kind));
    }
    assert_eq!("mix".parse::<CodecKind>().unwrap(), CodecKind::Fastq);
    assert!(matches!("gzip".parse::<CodecKind>(), Err(Error::InvalidInput(_))));
}

#[test]
fn test_codecs_are_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<HuffmanCodec>();
    assert_send_sync::<LzwCodec>();
    assert_send_sync::<BwtCodec>();
}
