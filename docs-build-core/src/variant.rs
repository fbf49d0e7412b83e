//! Validation of new language/version/scope variants before they reach the
//! generator as `-a<kind>=<value>`.

use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// `<code>` then optional whitespace and a label, parentheses optional.
static VARIANT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z0-9_]+)(?:\s*\(\s*([^()]*?)\s*\)|\s+([^()]*?))?$").unwrap());
static LANGUAGE_CODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z]{2}$").unwrap());
static LANGUAGE_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\w{4,}$").unwrap());
static VERSION_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^v\d{3}(?:[ab]\d)?(?:_p\d)?$").unwrap());
static SCOPE_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?i)[a-z][a-z0-9]{2,}$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariantKind {
    Language,
    Version,
    Scope,
}

impl VariantKind {
    /// Letter used after `-a` on the generator command line.
    pub fn flag_code(&self) -> char {
        match self {
            VariantKind::Language => 'l',
            VariantKind::Version => 'v',
            VariantKind::Scope => 's',
        }
    }

    /// Example input shown when prompting for a new variant.
    pub fn placeholder(&self) -> &'static str {
        match self {
            VariantKind::Language => "en (English)",
            VariantKind::Version => "v257",
            VariantKind::Scope => "app (Reference)",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            VariantKind::Language => "language",
            VariantKind::Version => "version",
            VariantKind::Scope => "scope",
        }
    }
}

impl fmt::Display for VariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for VariantKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "language" | "lang" | "l" => Ok(VariantKind::Language),
            "version" | "ver" | "v" => Ok(VariantKind::Version),
            "scope" | "s" => Ok(VariantKind::Scope),
            other => Err(format!("unknown variant kind '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VariantError {
    #[error("invalid {kind} input '{input}': {reason}")]
    InvalidVariantInput {
        kind: VariantKind,
        input: String,
        reason: String,
    },
}

impl VariantError {
    /// The message to show when re-prompting.
    pub fn reason(&self) -> &str {
        match self {
            VariantError::InvalidVariantInput { reason, .. } => reason,
        }
    }
}

/// A validated variant ready to hand to the generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    kind: VariantKind,
    code: String,
    label: Option<String>,
}

impl Variant {
    pub fn kind(&self) -> VariantKind {
        self.kind
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// `code=label`, or just `code` for versions.
    pub fn normalized(&self) -> String {
        match &self.label {
            Some(label) => format!("{}={}", self.code, label),
            None => self.code.clone(),
        }
    }
}

pub fn validate_variant(kind: VariantKind, raw: &str) -> Result<Variant, VariantError> {
    let fail = |reason: &str| VariantError::InvalidVariantInput {
        kind,
        input: raw.to_string(),
        reason: reason.to_string(),
    };

    let input = raw.trim();
    let caps = VARIANT_RE.captures(input).ok_or_else(|| fail("Invalid Input"))?;
    let code = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
    let label = caps
        .get(2)
        .or_else(|| caps.get(3))
        .map(|m| m.as_str().split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|l| !l.is_empty());

    match kind {
        VariantKind::Language => {
            if !LANGUAGE_CODE_RE.is_match(code) {
                return Err(fail("Language code must have 2 lower case letters"));
            }
            match &label {
                Some(l) if LANGUAGE_LABEL_RE.is_match(l) => {}
                _ => return Err(fail("Missing name after language code")),
            }
        }
        VariantKind::Version => {
            if !VERSION_CODE_RE.is_match(code) {
                return Err(fail(
                    "Version must be a 'v' followed by 3 digits, e.g. v257 or v257b1_p2",
                ));
            }
            if label.is_some() {
                return Err(fail("Version takes no title"));
            }
        }
        VariantKind::Scope => {
            if !SCOPE_CODE_RE.is_match(code) {
                return Err(fail(
                    "Scope namespace must have at least 3 alphanumeric characters",
                ));
            }
            match &label {
                Some(l) if l.chars().count() >= 4 => {}
                _ => return Err(fail("Missing title after scope namespace")),
            }
        }
    }

    Ok(Variant {
        kind,
        code: code.to_string(),
        label,
    })
}
