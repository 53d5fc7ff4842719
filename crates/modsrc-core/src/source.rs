//! Source descriptors: what a module declaration asks to be resolved.

/// A module source reference together with the policy and location it was
/// declared with.
///
/// Descriptors are immutable inputs. Resolvers that rewrite the source (the
/// registry following a redirect, for instance) build a modified copy with
/// the `with_*` methods.
///
/// # Examples
///
/// ```
/// use modsrc_core::SourceDescriptor;
///
/// let desc = SourceDescriptor::new("hashicorp/consul/aws//modules/consul-cluster")
///     .with_version("~> 0.11")
///     .with_name("consul")
///     .allow_downloads(true);
///
/// assert_eq!(desc.source, "hashicorp/consul/aws//modules/consul-cluster");
/// assert_eq!(desc.version, "~> 0.11");
/// assert!(desc.allow_downloads);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SourceDescriptor {
    /// Raw reference string, possibly carrying a `//subdir` suffix.
    pub source: String,

    /// Version constraint; empty means unconstrained.
    pub version: String,

    /// Logical module name, used only in diagnostics.
    pub name: String,

    /// Whether resolvers may perform network I/O.
    pub allow_downloads: bool,

    /// Directory of the declaring module inside the base filesystem. Local
    /// sources are resolved relative to it.
    pub module_path: String,

    /// Sub-path of the resolved tree to treat as the effective root.
    pub relative_path: String,
}

impl SourceDescriptor {
    /// Creates a descriptor for `source` with downloads disabled.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    /// Sets the version constraint.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Sets the diagnostic name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Allows or forbids network I/O.
    #[must_use]
    pub fn allow_downloads(mut self, allow: bool) -> Self {
        self.allow_downloads = allow;
        self
    }

    /// Sets the directory of the declaring module.
    #[must_use]
    pub fn with_module_path(mut self, path: impl Into<String>) -> Self {
        self.module_path = path.into();
        self
    }

    /// Replaces the source reference.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Sets the relative path inside the resolved tree.
    #[must_use]
    pub fn with_relative_path(mut self, path: impl Into<String>) -> Self {
        self.relative_path = path.into();
        self
    }

    /// Name used in log events: the logical name if set, else the source.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.source
        } else {
            &self.name
        }
    }

    /// Whether a version constraint was given.
    #[must_use]
    pub fn has_version(&self) -> bool {
        !self.version.trim().is_empty()
    }
}

/// Splits a `//subdir` suffix off a source reference.
///
/// The `//` of a URL scheme (`https://`) and a leading getter prefix such as
/// `git::` are not separators. A query string found after the subdirectory
/// belongs to the source and is moved back onto it.
///
/// # Examples
///
/// ```
/// use modsrc_core::source::split_subdir;
///
/// assert_eq!(
///     split_subdir("hashicorp/consul/aws//modules/vpc"),
///     ("hashicorp/consul/aws".to_string(), "modules/vpc".to_string()),
/// );
/// assert_eq!(
///     split_subdir("https://example.com/m.tgz"),
///     ("https://example.com/m.tgz".to_string(), String::new()),
/// );
/// assert_eq!(
///     split_subdir("git::https://github.com/org/repo.git//sub?ref=v1"),
///     ("git::https://github.com/org/repo.git?ref=v1".to_string(), "sub".to_string()),
/// );
/// ```
#[must_use]
pub fn split_subdir(source: &str) -> (String, String) {
    let getter_len = getter_prefix(source).map_or(0, |getter| getter.len() + 2);
    let rest = &source[getter_len..];
    let scheme_end = rest.find("://").map_or(0, |idx| idx + 3);

    let Some(sep) = rest[scheme_end..].find("//") else {
        return (source.to_string(), String::new());
    };
    let sep = getter_len + scheme_end + sep;

    let mut base = source[..sep].to_string();
    let mut subdir = &source[sep + 2..];
    if let Some(query) = subdir.find('?') {
        base.push_str(&subdir[query..]);
        subdir = &subdir[..query];
    }
    (base, subdir.trim_matches('/').to_string())
}

/// Returns the getter prefix of a `getter::address` reference.
pub(crate) fn getter_prefix(source: &str) -> Option<&str> {
    let (getter, _) = source.split_once("::")?;
    (!getter.is_empty() && getter.bytes().all(|b| b.is_ascii_alphanumeric())).then_some(getter)
}

/// Returns `true` if the reference carries a URL scheme or getter prefix.
pub(crate) fn has_scheme(source: &str) -> bool {
    getter_prefix(source).is_some() || source.contains("://")
}
