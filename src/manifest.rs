//! Requirements manifest line grammar.

use crate::models::Requirement;
use regex::Regex;
use std::sync::LazyLock;

static PACKAGE_LINE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^(?P<name>[A-Za-z0-9][A-Za-z0-9._-]*)\s*(?:\[[^\]]*\])?\s*(?P<spec>[^;]*)").ok()
});

const OPERATOR_CHARS: &[char] = &['=', '<', '>', '!', '~'];

/// Marks a PEP 508 direct reference (`name @ url`) in a stored version.
const DIRECT_REFERENCE: char = '@';

/// A package declared on one manifest line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredPackage {
    pub name: String,
    /// Version for an exact `==` pin, the raw specifier otherwise, empty when unconstrained.
    pub version: String,
}

/// Parse one manifest line. Blank lines, comments, option lines and bare
/// URLs (`git+https://...`, `https://...`) yield `None`.
pub fn parse_line(line: &str) -> Option<DeclaredPackage> {
    let content = strip_comment(line).trim();
    if content.is_empty() || content.starts_with('-') {
        return None;
    }

    let captures = PACKAGE_LINE.as_ref()?.captures(content)?;
    let name_match = captures.name("name")?;
    let after_name = &content[name_match.end()..];
    if after_name.starts_with('+') || after_name.starts_with("://") {
        return None;
    }
    let name = name_match.as_str().to_string();
    let spec: String = captures
        .name("spec")
        .map(|m| m.as_str())
        .unwrap_or_default()
        .split_whitespace()
        .collect();

    Some(DeclaredPackage {
        name,
        version: normalize_specifier(&spec),
    })
}

/// Parse every package declared in a manifest.
pub fn parse_manifest(contents: &str) -> Vec<DeclaredPackage> {
    contents.lines().filter_map(parse_line).collect()
}

/// A `#` starts a comment only at the beginning of a line or after
/// whitespace, so URL fragments like `#sha256=...` survive.
fn strip_comment(line: &str) -> &str {
    let mut previous = None;
    for (index, ch) in line.char_indices() {
        if ch == '#' && previous.map_or(true, char::is_whitespace) {
            return &line[..index];
        }
        previous = Some(ch);
    }
    line
}

/// Whether a stored version is a direct reference rather than a version.
pub fn is_direct_reference(version: &str) -> bool {
    version.starts_with(DIRECT_REFERENCE)
}

fn normalize_specifier(spec: &str) -> String {
    match spec.strip_prefix("==") {
        Some(version) if !version.contains(',') && !version.starts_with('=') => {
            version.to_string()
        }
        _ => spec.to_string(),
    }
}

/// Render a requirement as a pinned manifest line (without newline).
///
/// The desired version wins over the current one; bare versions get the
/// exact-pin operator and direct references keep their `name @ url` form.
pub fn render_line(requirement: &Requirement) -> String {
    let version = if requirement.desired_version.is_empty() {
        requirement.current_version.as_str()
    } else {
        requirement.desired_version.as_str()
    };

    if version.is_empty() {
        requirement.name.clone()
    } else if let Some(url) = version.strip_prefix(DIRECT_REFERENCE) {
        format!("{} @ {}", requirement.name, url)
    } else if version.starts_with(OPERATOR_CHARS) {
        format!("{}{}", requirement.name, version)
    } else {
        format!("{}=={}", requirement.name, version)
    }
}

/// Render a whole manifest, one requirement per line sorted by name.
pub fn render_manifest(requirements: &[Requirement]) -> String {
    let mut sorted: Vec<&Requirement> = requirements.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));
    sorted
        .into_iter()
        .map(|requirement| format!("{}\n", render_line(requirement)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn declared(name: &str, version: &str) -> Option<DeclaredPackage> {
        Some(DeclaredPackage {
            name: name.to_string(),
            version: version.to_string(),
        })
    }

    #[test]
    fn test_exact_pin_strips_operator() {
        assert_eq!(parse_line("requests==2.12.0"), declared("requests", "2.12.0"));
        assert_eq!(parse_line("requests == 2.12.0  # http"), declared("requests", "2.12.0"));
    }

    #[test]
    fn test_ranges_are_kept_verbatim() {
        assert_eq!(parse_line("flask>=1.0, <2"), declared("flask", ">=1.0,<2"));
        assert_eq!(parse_line("six~=1.10"), declared("six", "~=1.10"));
        assert_eq!(parse_line("pkg===1.0"), declared("pkg", "===1.0"));
    }

    #[test]
    fn test_unversioned_extras_and_markers() {
        assert_eq!(parse_line("pytest"), declared("pytest", ""));
        assert_eq!(parse_line("celery[redis]==4.1.0"), declared("celery", "4.1.0"));
        assert_eq!(
            parse_line("pywin32==223 ; sys_platform == 'win32'"),
            declared("pywin32", "223")
        );
    }

    #[test]
    fn test_skipped_lines() {
        assert_eq!(parse_line(""), None);
        assert_eq!(parse_line("   # comment"), None);
        assert_eq!(parse_line("-r base.txt"), None);
        assert_eq!(parse_line("--index-url https://pypi.org/simple"), None);
    }

    #[test]
    fn test_bare_urls_are_not_packages() {
        assert_eq!(parse_line("git+https://github.com/acme/lib.git#egg=lib"), None);
        assert_eq!(parse_line("hg+http://hg.example.com/lib#egg=lib"), None);
        assert_eq!(parse_line("https://example.com/x-1.0.whl"), None);
    }

    #[test]
    fn test_direct_reference_round_trips() {
        let declared_reference = parse_line("mypkg @ https://example.com/mypkg-1.0.whl").unwrap();
        assert_eq!(declared_reference.name, "mypkg");
        assert_eq!(declared_reference.version, "@https://example.com/mypkg-1.0.whl");
        assert!(is_direct_reference(&declared_reference.version));

        let requirement = Requirement::discovered("mypkg", &declared_reference.version);
        assert_eq!(
            render_line(&requirement),
            "mypkg @ https://example.com/mypkg-1.0.whl"
        );
    }

    #[test]
    fn test_url_fragment_is_not_a_comment() {
        assert_eq!(
            parse_line("lib @ https://example.com/lib-2.0.tar.gz#sha256=abc # pinned"),
            declared("lib", "@https://example.com/lib-2.0.tar.gz#sha256=abc")
        );
    }

    #[test]
    fn test_render_prefers_desired_version() {
        let mut requirement = Requirement::discovered("requests", "2.12.0");
        assert_eq!(render_line(&requirement), "requests==2.12.0");

        requirement.desired_version = "2.13.0".to_string();
        assert_eq!(render_line(&requirement), "requests==2.13.0");

        requirement.desired_version = ">=2.13".to_string();
        assert_eq!(render_line(&requirement), "requests>=2.13");

        assert_eq!(render_line(&Requirement::discovered("pytest", "")), "pytest");
    }

    #[test]
    fn test_render_manifest_sorts_by_name() {
        let requirements = vec![
            Requirement::discovered("six", "1.10.0"),
            Requirement::discovered("Flask", "1.0"),
            Requirement::discovered("attrs", ""),
        ];

        assert_eq!(
            render_manifest(&requirements),
            "Flask==1.0\nattrs\nsix==1.10.0\n"
        );
    }
}
