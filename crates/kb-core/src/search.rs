// kb-core/src/search.rs
//! 搜索模块 - 在索引快照上做加权子串匹配
//!
//! | 信号 | 条件 | 分数 |
//! |------|------|------|
//! | 标题 | 查询是标题的子串 | +10 |
//! | 标签 | 查询是某个标签的子串 | 每个 +8 |
//! | 内容 | 查询是内容的子串 | +5 |
//! | 路径 | 查询是路径的子串 | +3 |
//!
//! 匹配均不区分大小写。同分时按路径升序，结果完全确定。

use std::sync::Arc;

use crate::config::SearchDefaults;
use crate::error::{KbError, Result};
use crate::models::{Document, Match, MatchKind, SearchHit, SearchOptions, SearchResults, SortBy};

pub const TITLE_WEIGHT: u32 = 10;
pub const TAG_WEIGHT: u32 = 8;
pub const CONTENT_WEIGHT: u32 = 5;
pub const PATH_WEIGHT: u32 = 3;

/// 每个文档最多返回的内容命中行数
pub const MAX_CONTENT_MATCHES: usize = 3;

const ELLIPSIS: &str = "...";

/// 空查询在访问索引之前即被拒绝
pub fn validate_query(query: &str) -> Result<()> {
    if query.trim().is_empty() {
        return Err(KbError::Validation("搜索查询不能为空".to_string()));
    }
    Ok(())
}

/// 按字符逐个转小写，保证查询与文本的折叠规则一致
fn fold_case(text: &str) -> String {
    text.chars().flat_map(char::to_lowercase).collect()
}

/// 搜索快照
pub fn search(
    query: &str,
    options: &SearchOptions,
    docs: &[Arc<Document>],
    defaults: &SearchDefaults,
) -> Result<SearchResults> {
    validate_query(query)?;

    let needle = fold_case(query);
    let tag_filters: Vec<String> = options.tags.iter().map(|t| fold_case(t)).collect();

    tracing::debug!("[搜索] 查询: '{}', 选项: {:?}", query, options);

    let mut hits: Vec<SearchHit> = docs
        .iter()
        .filter(|doc| passes_filters(doc, options.category.as_deref(), &tag_filters))
        .filter_map(|doc| {
            let (score, matches) = score_document(doc, &needle);
            if score == 0 {
                return None;
            }
            Some(SearchHit {
                excerpt: excerpt(&doc.content, &needle, defaults.excerpt_length),
                document: Document::clone(doc),
                score,
                matches,
            })
        })
        .collect();

    sort_hits(&mut hits, options.sort_by);

    let total = hits.len();
    let limit = options.limit.unwrap_or(defaults.default_limit);
    let results = hits.into_iter().skip(options.offset).take(limit).collect();

    tracing::debug!("[搜索] 找到 {} 个文档", total);
    Ok(SearchResults { results, total })
}

fn passes_filters(doc: &Document, category: Option<&str>, tag_filters: &[String]) -> bool {
    if let Some(category) = category {
        if doc.category != category {
            return false;
        }
    }
    if !tag_filters.is_empty() {
        let has_matching_tag = doc.tags.iter().any(|tag| {
            let tag = fold_case(tag);
            tag_filters.iter().any(|wanted| tag.contains(wanted.as_str()))
        });
        if !has_matching_tag {
            return false;
        }
    }
    true
}

/// 计算单个文档的分数与命中记录，`needle` 须已经过 [`fold_case`]
pub fn score_document(doc: &Document, needle: &str) -> (u32, Vec<Match>) {
    let mut score = 0;
    let mut matches = Vec::new();

    if fold_case(&doc.title).contains(needle) {
        score += TITLE_WEIGHT;
        matches.push(Match::new(MatchKind::Title, doc.title.as_str()));
    }

    for tag in &doc.tags {
        if fold_case(tag).contains(needle) {
            score += TAG_WEIGHT;
            matches.push(Match::new(MatchKind::Tag, tag.as_str()));
        }
    }

    if fold_case(&doc.content).contains(needle) {
        score += CONTENT_WEIGHT;
        matches.extend(content_matches(&doc.content, needle));
    }

    if fold_case(&doc.path).contains(needle) {
        score += PATH_WEIGHT;
        matches.push(Match::new(MatchKind::Path, doc.path.as_str()));
    }

    (score, matches)
}

/// 包含查询的前几行，行号从 1 开始
fn content_matches(content: &str, needle: &str) -> Vec<Match> {
    content
        .split('\n')
        .enumerate()
        .filter(|(_, line)| fold_case(line).contains(needle))
        .take(MAX_CONTENT_MATCHES)
        .map(|(index, line)| Match::content(line.trim(), index + 1))
        .collect()
}

fn sort_hits(hits: &mut [SearchHit], sort_by: SortBy) {
    hits.sort_by(|a, b| {
        let primary = match sort_by {
            SortBy::Relevance => b.score.cmp(&a.score),
            SortBy::Date => b.document.last_modified.cmp(&a.document.last_modified),
            SortBy::Size => b.document.size.cmp(&a.document.size),
        };
        primary.then_with(|| a.document.path.cmp(&b.document.path))
    });
}

/// 查询在 `haystack` 中第一次出现的位置（字符下标，左闭右开）
fn find_case_insensitive(haystack: &str, needle: &str) -> Option<(usize, usize)> {
    if needle.is_empty() {
        return None;
    }

    // 折叠后的每个字符对应的原字符下标
    let mut folded = String::with_capacity(haystack.len());
    let mut origin = Vec::with_capacity(haystack.len());
    for (index, c) in haystack.chars().enumerate() {
        for lower in c.to_lowercase() {
            folded.push(lower);
            origin.push(index);
        }
    }

    let byte_start = folded.find(needle)?;
    let first = folded[..byte_start].chars().count();
    let last = first + needle.chars().count() - 1;
    Some((origin[first], origin[last] + 1))
}

/// 以第一次命中为中心截取不超过 `max_len` 个字符的摘要
///
/// 查询不在内容中时返回内容开头。窗口未到达内容边界时加 `...`。
pub fn excerpt(content: &str, needle: &str, max_len: usize) -> String {
    let chars: Vec<char> = content.chars().collect();
    let total = chars.len();
    if total <= max_len {
        return content.to_string();
    }

    let (start, end) = match find_case_insensitive(content, needle) {
        Some((match_start, match_end)) => {
            let match_len = match_end - match_start;
            if match_len >= max_len {
                (match_start, match_start + max_len)
            } else {
                let before = (max_len - match_len) / 2;
                let start = match_start.saturating_sub(before);
                let end = (start + max_len).min(total);
                (end.saturating_sub(max_len), end)
            }
        }
        None => (0, max_len),
    };

    let mut out = String::with_capacity(max_len + 2 * ELLIPSIS.len());
    if start > 0 {
        out.push_str(ELLIPSIS);
    }
    out.extend(&chars[start..end]);
    if end < total {
        out.push_str(ELLIPSIS);
    }
    out
}
