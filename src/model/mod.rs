pub mod recording;
pub mod segment;
pub mod transcript;
pub mod usage;

pub use recording::{ProcessingStatus, Recording};
pub use segment::{RawSegment, Segment, MULTIPLE_SPEAKERS};
pub use transcript::Transcript;
pub use usage::{ServiceType, SubscriptionTier, UsageRecord, UserQuotaState};

/// Strip whitespace and punctuation, count the remaining characters.
///
/// Used for transcript and segment word counts. Counting characters rather
/// than whitespace-delimited words keeps CJK text and Latin text on the same
/// scale.
pub fn count_words(text: &str) -> u32 {
    text.chars()
        .filter(|c| !c.is_whitespace() && !c.is_ascii_punctuation() && !is_cjk_punctuation(*c))
        .count() as u32
}

fn is_cjk_punctuation(c: char) -> bool {
    matches!(c,
        '\u{3000}'..='\u{303F}'   // CJK symbols and punctuation
        | '\u{FF00}'..='\u{FF0F}' // Fullwidth forms: ！ to ／
        | '\u{FF1A}'..='\u{FF20}' // ： to ＠
        | '\u{FF3B}'..='\u{FF40}'
        | '\u{FF5B}'..='\u{FF65}'
    )
}
