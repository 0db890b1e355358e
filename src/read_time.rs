//! Reading-time estimate for a post body

use crate::models::ContentBlock;

/// Assumed reading speed.
pub const WORDS_PER_MINUTE: usize = 200;

/// Words in `text`, counted by splitting on single spaces.
///
/// Runs of spaces are not collapsed and an empty string counts as one word,
/// so published read times stay stable across re-renders of old posts.
pub fn count_words(text: &str) -> usize {
    text.split(' ').count()
}

/// Total words over every heading and every text-bearing fragment.
/// Fragments without text (images, embeds) add nothing.
pub fn total_words(content: &[ContentBlock]) -> usize {
    content
        .iter()
        .map(|block| {
            let body: usize = block
                .body
                .iter()
                .filter_map(|node| node.text.as_deref())
                .map(count_words)
                .sum();
            count_words(&block.heading) + body
        })
        .sum()
}

/// Minutes to read `content`, rounded up. No minimum: empty content is 0.
pub fn estimate_read_time(content: &[ContentBlock]) -> usize {
    total_words(content).div_ceil(WORDS_PER_MINUTE)
}
