//! Keyword and channel predicates applied to every fetched item.
use regex::RegexSet;
use std::collections::HashSet;

/// Case-insensitive substring match against a fixed keyword list.
///
/// Keywords are matched literally, in configuration order; blank entries are
/// dropped. With no keywords nothing matches.
#[derive(Debug, Clone)]
pub struct KeywordFilter {
    keywords: Vec<String>,
    set: Option<RegexSet>,
}

impl KeywordFilter {
    pub fn new<I, S>(keywords: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords: Vec<String> = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        let set = if keywords.is_empty() {
            None
        } else {
            Some(RegexSet::new(
                keywords
                    .iter()
                    .map(|k| format!("(?i){}", regex::escape(k))),
            )?)
        };
        Ok(Self { keywords, set })
    }

    /// First keyword (in configuration order) contained in `text`.
    pub fn first_match(&self, text: &str) -> Option<&str> {
        let set = self.set.as_ref()?;
        set.matches(text)
            .iter()
            .next()
            .map(|idx| self.keywords[idx].as_str())
    }

    pub fn matches(&self, text: &str) -> bool {
        self.set.as_ref().is_some_and(|set| set.is_match(text))
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }
}

/// Case-insensitive set of channel, subreddit or channel-id names.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    names: HashSet<String>,
}

impl AllowList {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            names: names
                .into_iter()
                .map(|n| n.as_ref().trim().to_lowercase())
                .filter(|n| !n.is_empty())
                .collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(&name.trim().to_lowercase())
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Why an item was kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict<'a> {
    Allowed,
    Keyword(&'a str),
}

/// An item passes when its source is allow-listed or its text carries a
/// keyword.
#[derive(Debug, Clone)]
pub struct ItemFilter {
    allow: AllowList,
    keywords: KeywordFilter,
}

impl ItemFilter {
    pub fn new(allow: AllowList, keywords: KeywordFilter) -> Self {
        Self { allow, keywords }
    }

    pub fn keywords_only(keywords: KeywordFilter) -> Self {
        Self::new(AllowList::default(), keywords)
    }

    pub fn allow_only(allow: AllowList) -> Self {
        Self {
            allow,
            keywords: KeywordFilter {
                keywords: Vec::new(),
                set: None,
            },
        }
    }

    pub fn check<'a>(&'a self, source: &str, text: &str) -> Option<Verdict<'a>> {
        if self.allow.contains(source) {
            return Some(Verdict::Allowed);
        }
        self.keywords.first_match(text).map(Verdict::Keyword)
    }
}
