//! Glossary of type short-codes used for inline documentation hints.

use regex::Regex;
use std::sync::LazyLock;

use crate::config::NamedTable;

static CATEGORY_SPLIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\\?_").unwrap());
static TYPE_CONTEXT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+(:|\|\|)\w*").unwrap());

/// `tname` and `tdesc` merged; descriptions win on duplicate keys.
#[derive(Debug, Clone, Default)]
pub struct Glossary {
    terms: NamedTable,
}

impl Glossary {
    pub fn from_tables(tname: &NamedTable, tdesc: &NamedTable) -> Self {
        let terms = tname.iter().chain(tdesc.iter()).collect();
        Self { terms }
    }

    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.terms.codes()
    }

    pub fn get(&self, term: &str) -> Option<&str> {
        self.terms.get(term)
    }

    /// `<category>: <description>` when the part before `_` names a category,
    /// otherwise the plain description.
    pub fn hint(&self, term: &str) -> Option<String> {
        let description = self.terms.get(term)?;
        let category = CATEGORY_SPLIT_RE
            .split(term)
            .next()
            .filter(|c| !c.is_empty() && *c != term)
            .and_then(|c| self.terms.get(c));
        Some(match category {
            Some(category) => format!("{category}: {description}"),
            None => description.to_string(),
        })
    }

    /// Whether hints apply at `column` of `line`: inside `@param`/`@return` tags
    /// or right after a `name:type` / `a||b` fragment.
    pub fn is_hint_context(line: &str, column: usize) -> bool {
        if line.contains("@param") || line.contains("@return") {
            return true;
        }
        let chars: Vec<char> = line.chars().collect();
        let end = column.min(chars.len());
        let start = end.saturating_sub(12);
        let area: String = chars[start..end].iter().collect();
        TYPE_CONTEXT_RE.is_match(&area)
    }
}
