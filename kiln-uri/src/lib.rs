//! RFC 3986 URI value type for the kiln schema registry.
//!
//! Registry identifiers are URLs, but the rewriting machinery constantly
//! moves between absolute identifiers (`https://example.com/schemas/a`) and
//! relative references (`a.json`, `nested/b.json`). [`Uri`] models both in a
//! single type: absolute URIs are backed by [`url::Url`] (which normalises
//! scheme, host, default ports and dot-segments at parse time), relative
//! references are kept as raw path/query/fragment components.
//!
//! The operations here are the ones the registry needs and nothing more:
//! [`Uri::canonicalize`], [`Uri::relative_to`], [`Uri::append_path`],
//! [`Uri::extension`], [`Uri::rebase`] and reference resolution via
//! [`Uri::resolve`]. All of them are total; only parsing can fail.

#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]

use std::borrow::Cow;
use std::fmt;

use url::Url;

pub mod error;
pub use error::UriError;

/*
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
╔══════════════════════════════════════════════════════════════════════════════╗
║                                     Uri                                      ║
║                                    ¯¯¯¯¯                                     ║
╚══════════════════════════════════════════════════════════════════════════════╝
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
*/

/// An RFC 3986 URI, either absolute or a relative reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Uri {
    /// A fully qualified URI, e.g. `https://example.com/schemas/a`.
    Absolute(Url),
    /// A relative reference, e.g. `a.json` or `nested/b.json#/properties/x`.
    Relative(Relative),
}

/// The components of a relative reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Relative {
    path: String,
    query: Option<String>,
    fragment: Option<String>,
}

impl Uri {
    /// Parses a URI, accepting both absolute URIs and relative references.
    ///
    /// # Errors
    /// Returns [`UriError::Parse`] if the input carries a scheme but is not a
    /// well-formed absolute URI.
    pub fn parse(input: &str) -> Result<Self, UriError> {
        if has_scheme(input) {
            let url = Url::parse(input).map_err(|source| UriError::Parse {
                input: input.to_owned(),
                source,
            })?;
            Ok(Self::Absolute(url))
        } else {
            Ok(Self::Relative(Relative::split(input)))
        }
    }

    /// Whether this URI is a relative reference.
    #[must_use]
    pub fn is_relative(&self) -> bool {
        matches!(self, Self::Relative(_))
    }

    /// Whether this URI is absolute.
    #[must_use]
    pub fn is_absolute(&self) -> bool {
        matches!(self, Self::Absolute(_))
    }

    /// The path component.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Absolute(url) => url.path(),
            Self::Relative(relative) => &relative.path,
        }
    }

    /// The fragment component, without the leading `#`.
    #[must_use]
    pub fn fragment(&self) -> Option<&str> {
        match self {
            Self::Absolute(url) => url.fragment(),
            Self::Relative(relative) => relative.fragment.as_deref(),
        }
    }

    /// Replaces the fragment component.
    #[must_use]
    pub fn with_fragment(self, fragment: Option<&str>) -> Self {
        match self {
            Self::Absolute(mut url) => {
                url.set_fragment(fragment);
                Self::Absolute(url)
            }
            Self::Relative(mut relative) => {
                relative.fragment = fragment.map(str::to_owned);
                Self::Relative(relative)
            }
        }
    }

    /// Normalises the URI: `url::Url` already lowercases the scheme and host,
    /// strips default ports and resolves dot-segments at parse time, so for
    /// absolute URIs this only drops empty query/fragment components. For
    /// relative references, dot-segments are removed lexically.
    ///
    /// After canonicalisation, two URIs denoting the same resource compare
    /// equal byte-for-byte.
    #[must_use]
    pub fn canonicalize(self) -> Self {
        match self {
            Self::Absolute(mut url) => {
                if url.query() == Some("") {
                    url.set_query(None);
                }
                if url.fragment() == Some("") {
                    url.set_fragment(None);
                }
                Self::Absolute(url)
            }
            Self::Relative(mut relative) => {
                relative.path = remove_dot_segments(&relative.path);
                if relative.query.as_deref() == Some("") {
                    relative.query = None;
                }
                if relative.fragment.as_deref() == Some("") {
                    relative.fragment = None;
                }
                Self::Relative(relative)
            }
        }
    }

    /// Lowercases the path component only, leaving query and fragment alone.
    /// Fragments may carry JSON Pointers whose case is meaningful.
    #[must_use]
    pub fn lowercase_path(self) -> Self {
        match self {
            Self::Absolute(mut url) => {
                let lowered = url.path().to_lowercase();
                url.set_path(&lowered);
                Self::Absolute(url)
            }
            Self::Relative(mut relative) => {
                relative.path = relative.path.to_lowercase();
                Self::Relative(relative)
            }
        }
    }

    /// Appends path segments, inserting exactly one `/` at the seam.
    #[must_use]
    pub fn append_path(self, suffix: &str) -> Self {
        if suffix.is_empty() {
            return self;
        }
        match self {
            Self::Absolute(mut url) => {
                let joined = join_paths(url.path(), suffix);
                url.set_path(&joined);
                Self::Absolute(url)
            }
            Self::Relative(mut relative) => {
                relative.path = join_paths(&relative.path, suffix);
                Self::Relative(relative)
            }
        }
    }

    /// Forces a trailing extension on the last path segment: `.yaml`/`.yml`
    /// are replaced, an existing `.<ext>` suffix is kept, anything else gets
    /// `.<ext>` appended. `ext` is given without the leading dot.
    #[must_use]
    pub fn extension(self, ext: &str) -> Self {
        match self {
            Self::Absolute(mut url) => {
                let forced = force_extension(url.path(), ext);
                url.set_path(&forced);
                Self::Absolute(url)
            }
            Self::Relative(mut relative) => {
                relative.path = force_extension(&relative.path, ext);
                Self::Relative(relative)
            }
        }
    }

    /// Attempts to express this URI as a reference relative to `base`.
    ///
    /// Succeeds when both are absolute, share an origin, and either the base
    /// path is a directory-style prefix of this path or both live in the same
    /// directory (the base's last segment is treated as a file). The result
    /// never contains `..` segments; when the URI cannot be expressed that
    /// way it is returned unchanged.
    #[must_use]
    pub fn relative_to(self, base: &Uri) -> Self {
        let (Self::Absolute(url), Self::Absolute(base_url)) = (&self, base) else {
            return self;
        };
        if !same_origin(url, base_url) {
            return self;
        }

        let query = url.query().map(str::to_owned);
        let fragment = url.fragment().map(str::to_owned);
        let target_path = url.path();
        let base_path = base_url.path();

        // Directory-style: the base path is a prefix ending at a segment
        // boundary.
        if let Some(rest) = target_path.strip_prefix(base_path) {
            if rest.is_empty() {
                return Self::Relative(Relative {
                    path: String::new(),
                    query,
                    fragment,
                });
            }
            if base_path.ends_with('/') {
                return Self::Relative(Relative {
                    path: rest.to_owned(),
                    query,
                    fragment,
                });
            }
            if let Some(stripped) = rest.strip_prefix('/') {
                return Self::Relative(Relative {
                    path: stripped.to_owned(),
                    query,
                    fragment,
                });
            }
        }

        // File-style: the base's last segment names a sibling document. The
        // root directory is excluded: a base like `https://host/schemas`
        // must not claim every path on the host.
        let directory_length = base_path.rfind('/').map_or(0, |index| index + 1);
        if directory_length > 1
            && target_path.len() > directory_length
            && target_path.starts_with(&base_path[..directory_length])
        {
            return Self::Relative(Relative {
                path: target_path[directory_length..].to_owned(),
                query,
                fragment,
            });
        }

        self
    }

    /// Replaces the `from` prefix of this URI with `to`. A URI not under
    /// `from` is returned unchanged.
    #[must_use]
    pub fn rebase(self, from: &Uri, to: &Uri) -> Self {
        let relative = self.clone().relative_to(from);
        match relative {
            Self::Relative(reference) if !reference.path.is_empty() => {
                let rebased = to.clone().append_path(&reference.path);
                match reference.fragment {
                    Some(fragment) => rebased.with_fragment(Some(&fragment)),
                    None => rebased,
                }
            }
            _ => self,
        }
    }

    /// Resolves a reference against this URI per RFC 3986 section 5.
    ///
    /// # Errors
    /// Returns [`UriError::RelativeBase`] when this URI is itself relative,
    /// or [`UriError::Parse`] when the reference is malformed.
    pub fn resolve(&self, reference: &str) -> Result<Self, UriError> {
        if has_scheme(reference) {
            return Self::parse(reference);
        }
        match self {
            Self::Absolute(url) => {
                let resolved = url.join(reference).map_err(|source| UriError::Parse {
                    input: reference.to_owned(),
                    source,
                })?;
                Ok(Self::Absolute(resolved))
            }
            Self::Relative(_) => Err(UriError::RelativeBase {
                reference: reference.to_owned(),
            }),
        }
    }

    /// Recomposes the URI into its string form.
    #[must_use]
    pub fn recompose(&self) -> String {
        match self {
            Self::Absolute(url) => url.to_string(),
            Self::Relative(relative) => {
                let mut output = relative.path.clone();
                if let Some(query) = &relative.query {
                    output.push('?');
                    output.push_str(query);
                }
                if let Some(fragment) = &relative.fragment {
                    output.push('#');
                    output.push_str(fragment);
                }
                output
            }
        }
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.recompose())
    }
}

impl PartialEq<str> for Uri {
    fn eq(&self, other: &str) -> bool {
        self.recompose() == other
    }
}

impl PartialEq<&str> for Uri {
    fn eq(&self, other: &&str) -> bool {
        self.recompose() == *other
    }
}

impl Relative {
    fn split(input: &str) -> Self {
        let (rest, fragment) = match input.split_once('#') {
            Some((rest, fragment)) => (rest, Some(fragment.to_owned())),
            None => (input, None),
        };
        let (path, query) = match rest.split_once('?') {
            Some((path, query)) => (path.to_owned(), Some(query.to_owned())),
            None => (rest.to_owned(), None),
        };
        Self {
            path,
            query,
            fragment,
        }
    }
}

/*
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
╔══════════════════════════════════════════════════════════════════════════════╗
║                                   helpers                                    ║
║                                  ¯¯¯¯¯¯¯¯¯                                   ║
╚══════════════════════════════════════════════════════════════════════════════╝
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
*/

/// Percent-decodes a string, replacing invalid UTF-8 sequences.
#[must_use]
pub fn decode_lossy(input: &str) -> Cow<'_, str> {
    percent_encoding::percent_decode_str(input).decode_utf8_lossy()
}

fn has_scheme(input: &str) -> bool {
    let Some(colon) = input.find(':') else {
        return false;
    };
    let candidate = &input[..colon];
    if let Some(delimiter) = input.find(['/', '?', '#']) {
        if delimiter < colon {
            return false;
        }
    }
    let mut characters = candidate.chars();
    matches!(characters.next(), Some(first) if first.is_ascii_alphabetic())
        && characters.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn same_origin(left: &Url, right: &Url) -> bool {
    left.scheme() == right.scheme()
        && left.host_str() == right.host_str()
        && left.port_or_known_default() == right.port_or_known_default()
        && left.username() == right.username()
}

fn join_paths(path: &str, suffix: &str) -> String {
    let base = path.trim_end_matches('/');
    let appended = suffix.trim_start_matches('/');
    format!("{base}/{appended}")
}

fn force_extension(path: &str, ext: &str) -> String {
    if path.is_empty() || path.ends_with('/') {
        return path.to_owned();
    }
    let dotted = format!(".{ext}");
    if path.ends_with(&dotted) {
        return path.to_owned();
    }
    for yaml in [".yaml", ".yml"] {
        if let Some(stem) = path.strip_suffix(yaml) {
            return format!("{stem}{dotted}");
        }
    }
    format!("{path}{dotted}")
}

// RFC 3986 section 5.2.4, for relative references only; absolute URIs get
// this from `url::Url` at parse time.
fn remove_dot_segments(path: &str) -> String {
    let mut output: Vec<&str> = Vec::new();
    let absolute = path.starts_with('/');
    let trailing_slash = path.ends_with('/') || path.ends_with("/.") || path.ends_with("/..");
    for segment in path.split('/') {
        match segment {
            "." | "" => {}
            ".." => {
                output.pop();
            }
            other => output.push(other),
        }
    }
    let mut result = String::new();
    if absolute {
        result.push('/');
    }
    result.push_str(&output.join("/"));
    if trailing_slash && !result.ends_with('/') {
        result.push('/');
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri(input: &str) -> Uri {
        Uri::parse(input).unwrap().canonicalize()
    }

    #[test]
    fn canonicalize_lowercases_scheme_and_host() {
        assert_eq!(uri("HTTPS://EXAMPLE.com/Foo"), "https://example.com/Foo");
    }

    #[test]
    fn canonicalize_removes_default_port() {
        assert_eq!(uri("https://example.com:443/x"), "https://example.com/x");
        assert_eq!(uri("http://example.com:80/x"), "http://example.com/x");
    }

    #[test]
    fn canonicalize_resolves_dot_segments() {
        assert_eq!(uri("https://example.com/a/../b"), "https://example.com/b");
        assert_eq!(uri("a/./b/../c").recompose(), "a/c");
    }

    #[test]
    fn relative_to_directory_prefix() {
        let base = uri("https://example.com/schemas");
        let relative = uri("https://example.com/schemas/a").relative_to(&base);
        assert!(relative.is_relative());
        assert_eq!(relative.recompose(), "a");
    }

    #[test]
    fn relative_to_sibling_file() {
        let base = uri("http://localhost:8000/example/b.json");
        let relative = uri("http://localhost:8000/example/a.json").relative_to(&base);
        assert_eq!(relative.recompose(), "a.json");
    }

    #[test]
    fn relative_to_nested_file() {
        let base = uri("http://localhost:8000/example/b.json");
        let relative = uri("http://localhost:8000/example/nested/c.json").relative_to(&base);
        assert_eq!(relative.recompose(), "nested/c.json");
    }

    #[test]
    fn relative_to_different_origin_is_unchanged() {
        let base = uri("https://example.com/schemas");
        let outcome = uri("https://other.com/schemas/a").relative_to(&base);
        assert!(outcome.is_absolute());
    }

    #[test]
    fn relative_to_never_claims_the_whole_host() {
        let base = uri("https://example.com/schemas");
        let outcome = uri("https://example.com/other/x").relative_to(&base);
        assert!(outcome.is_absolute());
        let sneaky = uri("https://example.com/schemas-evil/x").relative_to(&base);
        assert!(sneaky.is_absolute());
    }

    #[test]
    fn relative_to_non_prefix_path_is_unchanged() {
        let base = uri("https://example.com/one/two");
        let outcome = uri("https://example.com/three/four").relative_to(&base);
        assert!(outcome.is_absolute());
    }

    #[test]
    fn relative_to_keeps_the_fragment() {
        let base = uri("https://example.com/schemas");
        let relative = uri("https://example.com/schemas/a#/properties/x").relative_to(&base);
        assert_eq!(relative.recompose(), "a#/properties/x");
    }

    #[test]
    fn append_path_inserts_exactly_one_slash() {
        assert_eq!(
            uri("https://example.com/schemas/").append_path("/a.json"),
            "https://example.com/schemas/a.json"
        );
        assert_eq!(
            uri("https://example.com").append_path("a.json"),
            "https://example.com/a.json"
        );
    }

    #[test]
    fn extension_is_forced() {
        assert_eq!(
            uri("https://example.com/a").extension("json"),
            "https://example.com/a.json"
        );
        assert_eq!(
            uri("https://example.com/a.json").extension("json"),
            "https://example.com/a.json"
        );
        assert_eq!(
            uri("https://example.com/a.yaml").extension("json"),
            "https://example.com/a.json"
        );
        assert_eq!(
            uri("https://example.com/a.yml").extension("json"),
            "https://example.com/a.json"
        );
    }

    #[test]
    fn rebase_swaps_the_prefix() {
        let from = uri("https://example.com/schemas");
        let to = uri("http://localhost:8000/example");
        let rebased = uri("https://example.com/schemas/nested/a").rebase(&from, &to);
        assert_eq!(rebased, "http://localhost:8000/example/nested/a");
    }

    #[test]
    fn rebase_outside_the_prefix_is_unchanged() {
        let from = uri("https://example.com/schemas");
        let to = uri("http://localhost:8000/example");
        let rebased = uri("https://elsewhere.com/a").rebase(&from, &to);
        assert_eq!(rebased, "https://elsewhere.com/a");
    }

    #[test]
    fn resolve_relative_reference() {
        let base = uri("http://localhost:8000/example/b.json");
        assert_eq!(
            base.resolve("a.json").unwrap(),
            "http://localhost:8000/example/a.json"
        );
        assert_eq!(
            base.resolve("nested/c.json").unwrap(),
            "http://localhost:8000/example/nested/c.json"
        );
    }

    #[test]
    fn parse_rejects_malformed_absolute() {
        assert!(matches!(
            Uri::parse("http://"),
            Err(UriError::Parse { .. })
        ));
    }
}
