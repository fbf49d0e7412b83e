//! Translation of filter state and build options into generator arguments.
//!
//! Both the render tool and the parser tool are described as a [`CommandLine`]:
//! an ordered list of flags plus an optional positional filter. `argv()` yields
//! the tokens handed to the child process; `Display` yields the canonical
//! argument string used for logs and tests.

use std::fmt;

use crate::filter::{FilterState, WILDCARD};
use crate::variant::Variant;

/// Options for one render invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// Wipe previous output.
    pub clean: bool,
    /// Full regenerate.
    pub clear: bool,
    /// Incremental update.
    pub update: bool,
    /// Run the rendering stage at all.
    pub generate: bool,
    /// Variant to register before rendering.
    pub add: Option<Variant>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            clean: false,
            clear: false,
            update: false,
            generate: true,
            add: None,
        }
    }
}

impl BuildOptions {
    pub fn clear() -> Self {
        Self {
            clear: true,
            ..Self::default()
        }
    }

    pub fn clean() -> Self {
        Self {
            clean: true,
            ..Self::default()
        }
    }

    pub fn update() -> Self {
        Self {
            update: true,
            ..Self::default()
        }
    }

    /// Registers a variant without rendering pages.
    pub fn add_variant(variant: Variant) -> Self {
        Self {
            generate: false,
            add: Some(variant),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flag {
    Clean,
    Clear,
    NoGenerate,
    Update,
    AddVariant { kind: char, value: String },
    Version(String),
    Parse { scope: String, name: String },
}

impl Flag {
    fn token(&self) -> String {
        match self {
            Flag::Clean => "-C".to_string(),
            Flag::Clear => "-c".to_string(),
            Flag::NoGenerate => "-n".to_string(),
            Flag::Update => "-u".to_string(),
            Flag::AddVariant { kind, value } => format!("-a{kind}={value}"),
            Flag::Version(v) => format!("-v={v}"),
            Flag::Parse { scope, name } => format!("-p={scope}.{name}"),
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Flag::AddVariant { kind, value } => write!(f, "-a{kind}=\"{value}\""),
            other => f.write_str(&other.token()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandLine {
    flags: Vec<Flag>,
    filter: Option<String>,
}

impl CommandLine {
    pub fn flags(&self) -> &[Flag] {
        &self.flags
    }

    /// Positional `<lang>.<scope>.<name>` argument, if any dimension is set.
    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty() && self.filter.is_none()
    }

    /// Tokens for direct process invocation. No shell quoting is applied.
    pub fn argv(&self) -> Vec<String> {
        self.flags
            .iter()
            .map(Flag::token)
            .chain(self.filter.iter().cloned())
            .collect()
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for flag in &self.flags {
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "{flag}")?;
            first = false;
        }
        if let Some(filter) = &self.filter {
            if !first {
                f.write_str(" ")?;
            }
            f.write_str(filter)?;
        }
        Ok(())
    }
}

/// Joins the non-wildcard language, scope and name filters with `.`.
pub fn positional_filter(filter: &FilterState) -> Option<String> {
    let parts: Vec<&str> = [filter.language(), filter.scope(), filter.name()]
        .into_iter()
        .filter(|p| *p != WILDCARD)
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("."))
    }
}

/// Render tool arguments: `-C -c -n -u -a<kind>="<value>" -v=<version> <filter>`,
/// each present only when applicable.
pub fn render_command(filter: &FilterState, options: &BuildOptions) -> CommandLine {
    let mut flags = Vec::new();
    if options.clean {
        flags.push(Flag::Clean);
    }
    if options.clear {
        flags.push(Flag::Clear);
    }
    if !options.generate {
        flags.push(Flag::NoGenerate);
    }
    if options.update {
        flags.push(Flag::Update);
    }
    if let Some(variant) = &options.add {
        flags.push(Flag::AddVariant {
            kind: variant.kind().flag_code(),
            value: variant.normalized(),
        });
    }
    if filter.version() != WILDCARD {
        flags.push(Flag::Version(filter.version().to_string()));
    }
    CommandLine {
        flags,
        filter: positional_filter(filter),
    }
}

/// Parser tool arguments: empty for a full parse, `-p=<scope>.<name>` to re-parse
/// a single entry.
pub fn parse_command(target: Option<(&str, &str)>) -> CommandLine {
    CommandLine {
        flags: target
            .map(|(scope, name)| {
                vec![Flag::Parse {
                    scope: scope.to_string(),
                    name: name.to_string(),
                }]
            })
            .unwrap_or_default(),
        filter: None,
    }
}
