//! Version constraint parsing and selection.
//!
//! Constraints use the module-registry syntax: comma-separated clauses, each
//! an operator (`=`, `!=`, `>`, `>=`, `<`, `<=`, `~>`) followed by a version,
//! or a bare version meaning an exact match. The pessimistic operator `~>`
//! allows only the rightmost given component to grow:
//!
//! | constraint  | allows                 |
//! |-------------|------------------------|
//! | `~> 1`      | `>= 1.0.0`             |
//! | `~> 1.2`    | `>= 1.2.0, < 2.0.0`    |
//! | `~> 1.2.3`  | `>= 1.2.3, < 1.3.0`    |
//!
//! Versions are parsed leniently (leading `v`, missing minor or patch
//! component) on top of [`semver::Version`].

use std::fmt;
use std::str::FromStr;

use semver::Version;

use crate::ResolveError;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Exact,
    NotEqual,
    Greater,
    GreaterEq,
    Less,
    LessEq,
    Pessimistic,
}

impl Op {
    /// Splits a leading operator off a clause.
    fn split(clause: &str) -> (Self, &str) {
        const OPS: [(&str, Op); 7] = [
            ("~>", Op::Pessimistic),
            (">=", Op::GreaterEq),
            ("<=", Op::LessEq),
            ("!=", Op::NotEqual),
            (">", Op::Greater),
            ("<", Op::Less),
            ("=", Op::Exact),
        ];
        OPS.iter()
            .find_map(|(token, op)| clause.strip_prefix(token).map(|rest| (*op, rest)))
            .unwrap_or((Self::Exact, clause))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Clause {
    op: Op,
    version: Version,
    /// Number of numeric components written (1 to 3).
    precision: usize,
}

impl Clause {
    fn matches(&self, candidate: &Version) -> bool {
        let v = &self.version;
        match self.op {
            Op::Exact => candidate == v,
            Op::NotEqual => candidate != v,
            Op::Greater => candidate > v,
            Op::GreaterEq => candidate >= v,
            Op::Less => candidate < v,
            Op::LessEq => candidate <= v,
            Op::Pessimistic => {
                if candidate < v {
                    return false;
                }
                match self.precision {
                    1 => true,
                    2 => candidate.major == v.major,
                    _ => candidate.major == v.major && candidate.minor == v.minor,
                }
            }
        }
    }
}

/// A parsed version constraint.
///
/// An empty constraint matches every release version.
///
/// # Examples
///
/// ```
/// use modsrc_core::VersionConstraint;
///
/// let constraint: VersionConstraint = "~> 1.0".parse()?;
/// assert!(constraint.matches(&semver::Version::new(1, 2, 0)));
/// assert!(!constraint.matches(&semver::Version::new(2, 0, 0)));
/// # Ok::<(), modsrc_core::ResolveError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionConstraint {
    raw: String,
    clauses: Vec<Clause>,
}

impl VersionConstraint {
    /// Parses a constraint expression.
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = |reason: String| ResolveError::InvalidConstraint {
            constraint: input.to_string(),
            reason,
        };

        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Ok(Self {
                raw: String::new(),
                clauses: Vec::new(),
            });
        }

        let clauses = trimmed
            .split(',')
            .map(|clause| {
                let clause = clause.trim();
                if clause.is_empty() {
                    return Err(invalid("empty clause".to_string()));
                }
                let (op, rest) = Op::split(clause);
                let rest = rest.trim();
                let (version, precision) = parse_lenient(rest)
                    .ok_or_else(|| invalid(format!("'{rest}' is not a version")))?;
                Ok(Clause {
                    op,
                    version,
                    precision,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            raw: trimmed.to_string(),
            clauses,
        })
    }

    /// Returns `true` if the constraint places no restriction.
    #[must_use]
    pub fn is_any(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Returns the constraint as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Checks whether `version` satisfies every clause.
    ///
    /// Pre-release versions are only considered when a clause itself names
    /// a pre-release.
    #[must_use]
    pub fn matches(&self, version: &Version) -> bool {
        if !version.pre.is_empty() && !self.clauses.iter().any(|c| !c.version.pre.is_empty()) {
            return false;
        }
        self.clauses.iter().all(|clause| clause.matches(version))
    }
}

impl FromStr for VersionConstraint {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Parses a version string leniently.
///
/// Accepts an optional leading `v` and pads a missing minor or patch
/// component with zero. Returns `None` for anything else that
/// [`semver::Version::parse`] rejects.
///
/// # Examples
///
/// ```
/// use modsrc_core::version::parse_version;
///
/// assert_eq!(parse_version("v1.2"), Some(semver::Version::new(1, 2, 0)));
/// assert_eq!(parse_version("not-a-version"), None);
/// ```
#[must_use]
pub fn parse_version(raw: &str) -> Option<Version> {
    parse_lenient(raw).map(|(version, _)| version)
}

fn parse_lenient(raw: &str) -> Option<(Version, usize)> {
    let raw = raw.trim();
    let raw = raw
        .strip_prefix('v')
        .or_else(|| raw.strip_prefix('V'))
        .unwrap_or(raw);

    let split = raw.find(['-', '+']).unwrap_or(raw.len());
    let (core, suffix) = raw.split_at(split);

    let parts = core
        .split('.')
        .map(|part| {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                None
            } else {
                part.parse::<u64>().ok()
            }
        })
        .collect::<Option<Vec<_>>>()?;

    if parts.is_empty() || parts.len() > 3 {
        return None;
    }

    let component = |idx: usize| parts.get(idx).copied().unwrap_or(0);
    let normalized = format!("{}.{}.{}{suffix}", component(0), component(1), component(2));
    Version::parse(&normalized).ok().map(|v| (v, parts.len()))
}

/// Parses raw version strings, silently discarding unparseable ones, and
/// sorts the result in descending order.
///
/// # Examples
///
/// ```
/// use modsrc_core::version::sorted_versions;
///
/// let versions = sorted_versions(["1.0.0", "not-a-version", "2.0.0"]);
/// assert_eq!(versions[0], semver::Version::new(2, 0, 0));
/// assert_eq!(versions.len(), 2);
/// ```
pub fn sorted_versions<'a>(raw: impl IntoIterator<Item = &'a str>) -> Vec<Version> {
    let mut versions: Vec<Version> = raw
        .into_iter()
        .filter_map(|raw| {
            let parsed = parse_version(raw);
            if parsed.is_none() {
                tracing::debug!(version = raw, "discarding unparseable version");
            }
            parsed
        })
        .collect();
    versions.sort_by(|a, b| b.cmp(a));
    versions
}

/// Selects the highest version satisfying `constraint`.
///
/// Unparseable entries in `raw` are ignored.
///
/// # Examples
///
/// ```
/// use modsrc_core::VersionConstraint;
/// use modsrc_core::version::select_version;
///
/// let constraint = VersionConstraint::parse("~>1.0")?;
/// let selected = select_version(&constraint, ["1.0.0", "1.2.0", "2.0.0"]);
/// assert_eq!(selected, Some(semver::Version::new(1, 2, 0)));
/// # Ok::<(), modsrc_core::ResolveError>(())
/// ```
pub fn select_version<'a>(
    constraint: &VersionConstraint,
    raw: impl IntoIterator<Item = &'a str>,
) -> Option<Version> {
    sorted_versions(raw)
        .into_iter()
        .find(|version| constraint.matches(version))
}
