//! Shell script construction for commands run inside containers.
//!
//! Every caller-supplied value is passed through [`quote`] before it is
//! interpolated, so a script never depends on the content of a path or pattern.
//! Scripts are run as `sh -c <script>` and only use POSIX utilities that are
//! present in busybox-based images.

use std::borrow::Cow;

/// Quote `value` as a single POSIX shell word.
///
/// Values made only of safe characters are returned as-is. Everything else is
/// wrapped in single quotes, with embedded single quotes written as `'\''`.
pub fn quote(value: &str) -> Cow<'_, str> {
    shell_escape::unix::escape(Cow::Borrowed(value))
}

/// Quote a path operand, prefixing `./` when it would otherwise parse as an option.
pub fn quote_path(path: &str) -> String {
    if path.starts_with('-') {
        quote(&format!("./{}", path)).into_owned()
    } else {
        quote(path).into_owned()
    }
}

/// Print a file, optionally restricted to a 1-based line window.
pub fn read_file(path: &str, start_line: Option<u64>, max_lines: Option<u64>) -> String {
    let path = quote_path(path);

    if start_line.is_none() && max_lines.is_none() {
        return format!("cat {}", path);
    }

    let start = start_line.unwrap_or(1).max(1);
    let end = match max_lines {
        Some(0) => return format!("test -r {}", path),
        Some(n) => start.saturating_add(n - 1).to_string(),
        None => "$".to_string(),
    };
    let expression = format!("{},{}p", start, end);

    format!("test -r {path} && sed -n {} {path}", quote(&expression))
}

/// Write stdin to a file, creating parent directories when asked.
pub fn write_file(path: &str, append: bool, create_dirs: bool) -> String {
    let path = quote_path(path);
    let redirect = if append { ">>" } else { ">" };

    if create_dirs {
        format!(r#"mkdir -p "$(dirname {path})" && cat {redirect} {path}"#)
    } else {
        format!("cat {redirect} {path}")
    }
}

/// Long directory listing.
pub fn list_directory(path: &str, show_hidden: bool) -> String {
    let flags = if show_hidden { "-la" } else { "-l" };
    format!("ls {} {}", flags, quote_path(path))
}

/// Options for [`search_text`].
#[derive(Debug, Clone, Default)]
pub struct SearchOptions<'a> {
    /// Case-insensitive match
    pub ignore_case: bool,
    /// Treat the pattern as a literal string
    pub fixed_strings: bool,
    /// Restrict to file names matching this glob
    pub include: Option<&'a str>,
}

/// Recursive grep with line numbers.
pub fn search_text(pattern: &str, path: &str, options: &SearchOptions<'_>) -> String {
    let mut script = String::from("grep -rn");
    if options.ignore_case {
        script.push_str(" -i");
    }
    if options.fixed_strings {
        script.push_str(" -F");
    }
    if let Some(glob) = options.include {
        script.push_str(&format!(" --include={}", quote(glob)));
    }
    script.push_str(&format!(" -e {} {}", quote(pattern), quote_path(path)));
    script
}

/// Options for [`find_files`].
#[derive(Debug, Clone, Default)]
pub struct FindOptions<'a> {
    /// Name glob passed to `-name`
    pub name: Option<&'a str>,
    /// `f`, `d` or `l`
    pub file_type: Option<char>,
    /// Maximum directory depth
    pub max_depth: Option<u32>,
}

/// `find` invocation; `-maxdepth` precedes the tests as GNU find expects.
pub fn find_files(path: &str, options: &FindOptions<'_>) -> String {
    let mut script = format!("find {}", quote_path(path));
    if let Some(depth) = options.max_depth {
        script.push_str(&format!(" -maxdepth {}", depth));
    }
    if let Some(kind) = options.file_type {
        script.push_str(&format!(" -type {}", kind));
    }
    if let Some(name) = options.name {
        script.push_str(&format!(" -name {}", quote(name)));
    }
    script
}

/// Remove a file, or a whole tree when `recursive` is set.
///
/// Fails with a message when the path does not exist, since `rm -f` alone
/// would succeed silently.
pub fn delete_file(path: &str, recursive: bool) -> String {
    let path = quote_path(path);
    let flags = if recursive { "-rf" } else { "-f" };
    format!(
        r#"if [ -e {path} ] || [ -L {path} ]; then rm {flags} {path}; else echo "No such file or directory" >&2; exit 1; fi"#
    )
}
