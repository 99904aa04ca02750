//! 文本分割器
//!
//! 将任意长度文本切分为不超过最大字符数的有序片段。
//!
//! 分割层级：
//! 1. 句末标点（. ! ? ; :）后接空白，或段落分隔（两个及以上换行）
//! 2. 单句超长时按逗号切分
//! 3. 逗号片段仍超长时按单词（空白）切分
//! 4. 单个单词超长时原样输出为超长片段
//!
//! 每一层都使用相同的贪心打包规则：片段之间以单个空格连接，
//! 只要不超过上限就继续追加，否则输出当前片段并重新开始。

use serde::{Deserialize, Serialize};

/// 默认最大字符数
pub const DEFAULT_MAX_CHUNK_CHARS: usize = 400;

/// 文本分割配置
#[derive(Debug, Clone)]
pub struct SegmentConfig {
    /// 单个片段的最大字符数（按 Unicode 字符计）
    pub max_chunk_chars: usize,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: DEFAULT_MAX_CHUNK_CHARS,
        }
    }
}

/// 分割后的文本片段
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    pub index: usize,
    pub content: String,
}

/// 检查是否为句末标点（需要后接空白才分割）
#[inline]
fn is_sentence_delimiter(ch: char) -> bool {
    matches!(ch, '.' | '!' | '?' | ';' | ':')
}

/// 检查是否为全角句末标点（中文无空格，总是分割）
#[inline]
fn is_fullwidth_sentence_delimiter(ch: char) -> bool {
    matches!(ch, '。' | '！' | '？' | '；' | '：')
}

/// 检查是否为逗号类分隔符
#[inline]
fn is_clause_delimiter(ch: char) -> bool {
    matches!(ch, ',' | '，' | '、')
}

/// 句末标点之后可以跟随的闭合符号（引号、括号）
#[inline]
fn is_closing_mark(ch: char) -> bool {
    matches!(ch, '"' | '\'' | ')' | ']' | '\u{201D}' | '\u{2019}' | '」' | '』' | '）')
}

#[inline]
fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// 合并连续空白为单个空格后写入结果
fn push_piece(pieces: &mut Vec<String>, current: &mut String) {
    let normalized = current.split_whitespace().collect::<Vec<_>>().join(" ");
    if !normalized.is_empty() {
        pieces.push(normalized);
    }
    current.clear();
}

/// 按句末标点和段落分隔切分句子，标点保留在前一句末尾
fn split_sentences(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];

        if ch == '\n' {
            let mut j = i;
            let mut newlines = 0;
            while j < chars.len() && chars[j].is_whitespace() {
                if chars[j] == '\n' {
                    newlines += 1;
                }
                j += 1;
            }
            if newlines >= 2 {
                push_piece(&mut sentences, &mut current);
                i = j;
                continue;
            }
            current.push(ch);
            i += 1;
            continue;
        }

        current.push(ch);
        i += 1;

        if is_fullwidth_sentence_delimiter(ch) {
            while i < chars.len() && is_closing_mark(chars[i]) {
                current.push(chars[i]);
                i += 1;
            }
            push_piece(&mut sentences, &mut current);
        } else if is_sentence_delimiter(ch) {
            let mut j = i;
            while j < chars.len() && is_closing_mark(chars[j]) {
                j += 1;
            }
            if j == chars.len() || chars[j].is_whitespace() {
                current.extend(&chars[i..j]);
                i = j;
                push_piece(&mut sentences, &mut current);
            }
        }
    }

    push_piece(&mut sentences, &mut current);
    sentences
}

/// 按逗号切分，逗号保留在前一片段末尾
fn split_clauses(sentence: &str) -> Vec<String> {
    let chars: Vec<char> = sentence.chars().collect();
    let mut clauses = Vec::new();
    let mut current = String::new();

    for (i, &ch) in chars.iter().enumerate() {
        current.push(ch);
        if is_clause_delimiter(ch) {
            let ascii = ch == ',';
            let next_is_space = chars.get(i + 1).map_or(true, |c| c.is_whitespace());
            if !ascii || next_is_space {
                push_piece(&mut clauses, &mut current);
            }
        }
    }

    push_piece(&mut clauses, &mut current);
    clauses
}

/// 超长片段的下一级拆分策略
type Fallback = fn(&str, usize, &mut Vec<String>);

/// 贪心打包
///
/// 片段以单个空格连接，追加后不超过 `max` 就继续；
/// 单个片段本身超过 `max` 时先输出当前累积内容，再交给 `fallback`
fn pack(pieces: Vec<String>, max: usize, out: &mut Vec<String>, fallback: Fallback) {
    let mut current = String::new();
    let mut current_len = 0;

    for piece in pieces {
        let piece_len = char_len(&piece);

        if piece_len > max {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
                current_len = 0;
            }
            fallback(&piece, max, out);
            continue;
        }

        if current.is_empty() {
            current = piece;
            current_len = piece_len;
        } else if current_len + 1 + piece_len <= max {
            current.push(' ');
            current.push_str(&piece);
            current_len += 1 + piece_len;
        } else {
            out.push(std::mem::replace(&mut current, piece));
            current_len = piece_len;
        }
    }

    if !current.is_empty() {
        out.push(current);
    }
}

fn pack_clauses(sentence: &str, max: usize, out: &mut Vec<String>) {
    pack(split_clauses(sentence), max, out, pack_words);
}

fn pack_words(clause: &str, max: usize, out: &mut Vec<String>) {
    let words = clause.split_whitespace().map(str::to_string).collect();
    pack(words, max, out, emit_oversized);
}

/// 单个单词超过上限，无法继续拆分
fn emit_oversized(word: &str, max: usize, out: &mut Vec<String>) {
    tracing::debug!(
        word_chars = char_len(word),
        max_chunk_chars = max,
        "Emitting oversized single-word chunk"
    );
    out.push(word.to_string());
}

/// 对文本进行分段
///
/// 相同输入总是得到相同的片段序列；全空白片段会被过滤
pub fn segment_text(text: &str, config: &SegmentConfig) -> Vec<TextChunk> {
    let max = config.max_chunk_chars.max(1);
    let trimmed = text.trim();

    if trimmed.is_empty() {
        return Vec::new();
    }

    // 整体不超过上限，直接返回
    if char_len(trimmed) <= max {
        return vec![TextChunk {
            index: 0,
            content: trimmed.to_string(),
        }];
    }

    let mut pieces = Vec::new();
    pack(split_sentences(trimmed), max, &mut pieces, pack_clauses);

    pieces
        .into_iter()
        .filter(|p| !p.trim().is_empty())
        .enumerate()
        .map(|(index, content)| TextChunk { index, content })
        .collect()
}

/// 使用默认配置分段（便捷方法）
pub fn segment_text_default(text: &str) -> Vec<TextChunk> {
    segment_text(text, &SegmentConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents(chunks: &[TextChunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.content.as_str()).collect()
    }

    fn non_whitespace(s: &str) -> String {
        s.chars().filter(|c| !c.is_whitespace()).collect()
    }

    fn assert_coverage(text: &str, chunks: &[TextChunk]) {
        let joined = chunks
            .iter()
            .map(|c| c.content.trim())
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(non_whitespace(&joined), non_whitespace(text));
    }

    #[test]
    fn test_reference_scenario() {
        let config = SegmentConfig { max_chunk_chars: 20 };
        let text = "Hello world. This is a test sentence that is quite long indeed.";
        let chunks = segment_text(text, &config);

        assert_eq!(
            contents(&chunks),
            vec!["Hello world.", "This is a test", "sentence that is", "quite long indeed."]
        );
        for chunk in &chunks {
            assert!(chunk.content.chars().count() <= 20);
        }
        assert_coverage(text, &chunks);
    }

    #[test]
    fn test_short_text_single_chunk() {
        let config = SegmentConfig { max_chunk_chars: 100 };
        let chunks = segment_text("  Just one line.  \n", &config);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[0].content, "Just one line.");
    }

    #[test]
    fn test_empty_text() {
        assert!(segment_text("", &SegmentConfig::default()).is_empty());
        assert!(segment_text(" \n\t\n ", &SegmentConfig::default()).is_empty());
    }

    #[test]
    fn test_sentences_packed_greedily() {
        let config = SegmentConfig { max_chunk_chars: 10 };
        let chunks = segment_text("One. Two. Three.", &config);
        assert_eq!(contents(&chunks), vec!["One. Two.", "Three."]);
    }

    #[test]
    fn test_comma_fallback() {
        let config = SegmentConfig { max_chunk_chars: 30 };
        let text = "First part of it, second part of it, third part here. End.";
        let chunks = segment_text(text, &config);
        assert_eq!(
            contents(&chunks),
            vec!["First part of it,", "second part of it,", "third part here.", "End."]
        );
        assert_coverage(text, &chunks);
    }

    #[test]
    fn test_oversized_word_kept_whole() {
        let config = SegmentConfig { max_chunk_chars: 10 };
        let chunks = segment_text("Supercalifragilistic is long.", &config);
        assert_eq!(contents(&chunks), vec!["Supercalifragilistic", "is long."]);
    }

    #[test]
    fn test_paragraph_break_is_boundary() {
        let config = SegmentConfig { max_chunk_chars: 12 };
        let chunks = segment_text("Title line\n\nBody text here.", &config);
        assert_eq!(contents(&chunks), vec!["Title line", "Body text", "here."]);
    }

    #[test]
    fn test_single_newline_is_not_boundary() {
        let config = SegmentConfig { max_chunk_chars: 15 };
        let chunks = segment_text("wrapped\nline of text and more", &config);
        assert_eq!(contents(&chunks), vec!["wrapped line of", "text and more"]);
    }

    #[test]
    fn test_punctuation_without_space_is_not_boundary() {
        let sentences = split_sentences("Version 1.5 is out. Yes.");
        assert_eq!(sentences, vec!["Version 1.5 is out.", "Yes."]);
    }

    #[test]
    fn test_closing_quote_stays_with_sentence() {
        let sentences = split_sentences("He said \"stop.\" Then left.");
        assert_eq!(sentences, vec!["He said \"stop.\"", "Then left."]);
    }

    #[test]
    fn test_all_delimiters_split() {
        let sentences = split_sentences("a! b? c; d: e.");
        assert_eq!(sentences, vec!["a!", "b?", "c;", "d:", "e."]);
    }

    #[test]
    fn test_fullwidth_delimiters() {
        let config = SegmentConfig { max_chunk_chars: 3 };
        let chunks = segment_text("你好。世界！", &config);
        assert_eq!(contents(&chunks), vec!["你好。", "世界！"]);
    }

    #[test]
    fn test_indices_are_sequential() {
        let config = SegmentConfig { max_chunk_chars: 8 };
        let chunks = segment_text("Alpha one. Beta two. Gamma three. Delta four.", &config);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
        }
    }

    #[test]
    fn test_length_bound_and_coverage() {
        let text = "The quick brown fox jumps over the lazy dog. Pack my box with five dozen \
                    liquor jugs; how vexingly quick daft zebras jump!\n\nSphinx of black quartz, \
                    judge my vow, and then, perhaps, rest a little: antidisestablishmentarianism.";
        for max in [1usize, 5, 12, 20, 33, 64, 500] {
            let chunks = segment_text(text, &SegmentConfig { max_chunk_chars: max });
            assert_coverage(text, &chunks);
            for chunk in &chunks {
                let len = chunk.content.chars().count();
                if len > max {
                    assert!(
                        !chunk.content.contains(char::is_whitespace),
                        "only single words may exceed the limit: {:?}",
                        chunk.content
                    );
                }
                assert!(!chunk.content.trim().is_empty());
            }
        }
    }

    #[test]
    fn test_deterministic() {
        let config = SegmentConfig { max_chunk_chars: 16 };
        let text = "Same input, same output. Every single time, without exception.";
        assert_eq!(segment_text(text, &config), segment_text(text, &config));
    }

    #[test]
    fn test_zero_max_treated_as_one() {
        let chunks = segment_text("a b", &SegmentConfig { max_chunk_chars: 0 });
        assert_eq!(contents(&chunks), vec!["a", "b"]);
    }

    #[test]
    fn test_default_config() {
        let chunks = segment_text_default("测试内容。");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "测试内容。");
    }
}
