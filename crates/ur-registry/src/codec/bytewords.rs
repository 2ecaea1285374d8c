//! Bytewords encoding (BCR-2020-012).
//!
//! Each byte maps to one of 256 four-letter words. A CRC-32 of the payload
//! is appended big-endian before encoding and verified after decoding. The
//! minimal style keeps only the first and last letter of each word and is
//! what UR strings carry.

use lazy_static::lazy_static;
use rustc_hash::FxHashMap;

use crate::error::UrError;

/// Word separator style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    /// Full words separated by spaces.
    Standard,
    /// Full words separated by hyphens.
    Uri,
    /// First and last letter of each word, no separator.
    Minimal,
}

const WORDS: [&str; 256] = [
    "able", "acid", "also", "apex", "aqua", "arch", "atom", "aunt", "away", "axis", "back", "bald", "barn", "belt", "beta", "bias",
    "blue", "body", "brag", "brew", "bulb", "buzz", "calm", "cash", "cats", "chef", "city", "claw", "code", "cola", "cook", "cost",
    "crux", "curl", "cusp", "cyan", "dark", "data", "days", "deli", "dice", "diet", "door", "down", "draw", "drop", "drum", "dull",
    "duty", "each", "easy", "echo", "edge", "epic", "even", "exam", "exit", "eyes", "fact", "fair", "fern", "figs", "film", "fish",
    "fizz", "flap", "flew", "flux", "foxy", "free", "frog", "fuel", "fund", "gala", "game", "gear", "gems", "gift", "girl", "glow",
    "good", "gray", "grim", "guru", "gush", "gyro", "half", "hang", "hard", "hawk", "heat", "help", "high", "hill", "holy", "hope",
    "horn", "huts", "iced", "idea", "idle", "inch", "inky", "into", "iris", "iron", "item", "jade", "jazz", "join", "jolt", "jowl",
    "judo", "jugs", "jump", "junk", "jury", "keep", "keno", "kept", "keys", "kick", "kiln", "king", "kite", "kiwi", "knob", "lamb",
    "lava", "lazy", "leaf", "legs", "liar", "limp", "lion", "list", "logo", "loud", "love", "luau", "luck", "lung", "main", "many",
    "math", "maze", "memo", "menu", "meow", "mild", "mint", "miss", "monk", "nail", "navy", "need", "news", "next", "noon", "note",
    "numb", "obey", "oboe", "omit", "onyx", "open", "oval", "owls", "paid", "part", "peck", "play", "plus", "poem", "pool", "pose",
    "puff", "puma", "purr", "quad", "quiz", "race", "ramp", "real", "redo", "rich", "road", "rock", "roof", "ruby", "ruin", "runs",
    "rust", "safe", "saga", "scar", "sets", "silk", "skew", "slot", "soap", "solo", "song", "stub", "surf", "swan", "taco", "task",
    "taxi", "tent", "tied", "time", "tiny", "toil", "tomb", "toys", "trip", "tuna", "twin", "ugly", "undo", "unit", "urge", "user",
    "vast", "very", "veto", "vial", "vibe", "view", "visa", "void", "vows", "wall", "wand", "warm", "wasp", "wave", "waxy", "webs",
    "what", "when", "whiz", "wolf", "work", "yank", "yawn", "yell", "yoga", "yurt", "zaps", "zero", "zest", "zinc", "zone", "zoom",
];

lazy_static! {
    static ref WORD_INDEX: FxHashMap<&'static str, u8> = index(|w| w);
    static ref MINIMAL_INDEX: FxHashMap<String, u8> = index(minimal);
}

fn index<K: std::hash::Hash + Eq>(key: impl Fn(&'static str) -> K) -> FxHashMap<K, u8> {
    (0..=u8::MAX).map(|b| (key(WORDS[usize::from(b)]), b)).collect()
}

fn minimal(word: &str) -> String {
    let bytes = word.as_bytes();
    [bytes[0] as char, bytes[3] as char].iter().collect()
}

/// Encodes `data` with its checksum.
pub fn encode(data: &[u8], style: Style) -> String {
    let checksum = crc32fast::hash(data).to_be_bytes();
    let words = data.iter().chain(checksum.iter()).map(|&b| WORDS[usize::from(b)]);
    match style {
        Style::Standard => words.collect::<Vec<_>>().join(" "),
        Style::Uri => words.collect::<Vec<_>>().join("-"),
        Style::Minimal => words.map(minimal).collect(),
    }
}

/// Decodes bytewords and verifies the trailing checksum.
///
/// Input is accepted in any letter case.
pub fn decode(s: &str, style: Style) -> Result<Vec<u8>, UrError> {
    let s = s.to_ascii_lowercase();
    let bytes = match style {
        Style::Standard => lookup_words(s.split(' '))?,
        Style::Uri => lookup_words(s.split('-'))?,
        Style::Minimal => {
            if !s.is_ascii() || s.len() % 2 != 0 {
                return Err(UrError::InvalidByteword(s));
            }
            s.as_bytes()
                .chunks(2)
                .map(|pair| {
                    let key: String = pair.iter().map(|&b| b as char).collect();
                    MINIMAL_INDEX.get(&key).copied().ok_or(UrError::InvalidByteword(key))
                })
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    if bytes.len() < 5 {
        return Err(UrError::TooShort { len: bytes.len() });
    }
    let (payload, checksum) = bytes.split_at(bytes.len() - 4);
    let found = u32::from_be_bytes([checksum[0], checksum[1], checksum[2], checksum[3]]);
    let expected = crc32fast::hash(payload);
    if found != expected {
        return Err(UrError::ChecksumMismatch { expected, found });
    }
    Ok(payload.to_vec())
}

fn lookup_words<'a>(words: impl Iterator<Item = &'a str>) -> Result<Vec<u8>, UrError> {
    words
        .map(|w| WORD_INDEX.get(w).copied().ok_or_else(|| UrError::InvalidByteword(w.to_string())))
        .collect()
}
