/// Split text into word-bounded chunks of at most `chunk_size` characters.
///
/// Words are never split, so a single word longer than the budget becomes a chunk
/// of its own. Text that already fits is returned unchanged as the only chunk.
/// Whitespace-only text yields no chunks.
pub fn chunk_text(text: &str, chunk_size: usize) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    if text.chars().count() <= chunk_size {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_size = 0;

    for word in text.split_whitespace() {
        // +1 for the joining space
        let word_size = word.chars().count() + 1;
        if current_size + word_size > chunk_size && !current.is_empty() {
            chunks.push(current.join(" "));
            current.clear();
            current_size = 0;
        }
        current.push(word);
        current_size += word_size;
    }

    if !current.is_empty() {
        chunks.push(current.join(" "));
    }

    chunks
}
