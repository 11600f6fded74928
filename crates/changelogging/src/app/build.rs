//! Building changelog entries from fragments.
//!
//! [`Builder::render`] produces the entry text without touching the output file, which is what
//! draft builds print. [`Builder::write`] renders the same text and splices it into the output
//! document right after the start marker.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;
use time::Date;
use time::macros::format_description;

use crate::app::collect::{CollectError, Collector};
use crate::app::template::{Format, TemplateError};
use crate::app::wrap;
use crate::domain::errors::DomainError;
use crate::domain::fragments::{Fragment, Issue};
use crate::infra::config::Config;

const NO_SIGNIFICANT_CHANGES: &str = "No significant changes.";

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("invalid format")]
    Template(#[from] TemplateError),
    #[error("failed to collect fragments")]
    Collect(#[from] CollectError),
    #[error("invalid display order")]
    Lookup(#[from] DomainError),
    #[error("failed to format date")]
    Date(#[from] time::error::Format),
    #[error("start marker `{marker}` not found in `{}`", .path.display())]
    MarkerNotFound { marker: String, path: PathBuf },
    #[error("failed to read `{}`", .path.display())]
    ReadOutput { path: PathBuf, source: io::Error },
    #[error("failed to write `{}`", .path.display())]
    WriteOutput { path: PathBuf, source: io::Error },
}

#[derive(Serialize)]
struct TitleContext<'c> {
    name: &'c str,
    version: &'c str,
    url: &'c str,
    date: String,
}

#[derive(Serialize)]
struct IssueContext<'c> {
    name: &'c str,
    version: &'c str,
    url: &'c str,
    issue: u32,
}

/// Renders and writes changelog entries for one configuration and date.
#[derive(Debug, Clone)]
pub struct Builder<'b> {
    config: &'b Config,
    date: Date,
    title_format: Format,
    issue_format: Format,
}

impl<'b> Builder<'b> {
    /// Create a builder, validating both format strings up front.
    pub fn new(config: &'b Config, date: Date) -> Result<Self, BuildError> {
        let builder = Self {
            config,
            date,
            title_format: Format::parse(&config.title_format)?,
            issue_format: Format::parse(&config.issue_format)?,
        };
        builder.render_title()?;
        builder.render_issue(Issue(0))?;
        Ok(builder)
    }

    pub fn config(&self) -> &Config {
        self.config
    }

    pub fn date(&self) -> Date {
        self.date
    }

    pub fn collector(&self) -> Collector<'b> {
        Collector::new(&self.config.directory, &self.config.types)
    }

    /// Paths of the fragment files a build consumes.
    pub fn collect_paths(&self) -> Result<Vec<PathBuf>, BuildError> {
        Ok(self.collector().collect_paths()?)
    }

    /// Collect fragments and render the entry.
    pub fn render(&self) -> Result<String, BuildError> {
        let fragments = self.collector().collect()?;
        self.render_fragments(fragments)
    }

    /// Render the entry for an already collected set of fragments.
    pub fn render_fragments(&self, fragments: Vec<Fragment>) -> Result<String, BuildError> {
        let mut groups: HashMap<String, Vec<Fragment>> = HashMap::new();
        for fragment in fragments {
            groups
                .entry(fragment.fragment_type.name.clone())
                .or_default()
                .push(fragment);
        }
        for group in groups.values_mut() {
            Fragment::sort(group);
        }

        let mut unrendered: HashSet<&str> = groups.keys().map(String::as_str).collect();
        let mut sections = Vec::new();
        for fragment_type in self.config.display.into_types(&self.config.types)? {
            let Some(group) = groups.get(&fragment_type.name) else {
                continue;
            };
            unrendered.remove(fragment_type.name.as_str());

            let entries = group
                .iter()
                .map(|fragment| self.render_entry(fragment))
                .collect::<Result<Vec<_>, _>>()?;

            sections.push(format!(
                "{}{}\n\n{}",
                self.heading(self.config.section_level),
                fragment_type.title,
                entries.join("\n")
            ));
        }

        for name in unrendered {
            tracing::warn!(
                fragment_type = %name,
                count = groups.get(name).map_or(0, Vec::len),
                "fragments not rendered, type missing from display order"
            );
        }

        let body = if sections.is_empty() {
            NO_SIGNIFICANT_CHANGES.to_owned()
        } else {
            sections.join("\n\n")
        };

        Ok(format!(
            "{}{}\n\n{body}",
            self.heading(self.config.entry_level),
            self.render_title()?
        ))
    }

    /// Render the entry and splice it into the output file.
    ///
    /// Returns the paths of the consumed fragment files.
    pub fn write(&self) -> Result<Vec<PathBuf>, BuildError> {
        let paths = self.collect_paths()?;
        let entry = self.render()?;

        let path = &self.config.output;
        let document = fs::read_to_string(path).map_err(|source| BuildError::ReadOutput {
            path: path.clone(),
            source,
        })?;

        let marker = &self.config.start_string;
        let spliced =
            splice(&document, marker, &entry).ok_or_else(|| BuildError::MarkerNotFound {
                marker: marker.clone(),
                path: path.clone(),
            })?;

        fs::write(path, spliced).map_err(|source| BuildError::WriteOutput {
            path: path.clone(),
            source,
        })?;

        tracing::info!(output = %path.display(), fragments = paths.len(), "changelog written");
        Ok(paths)
    }

    fn render_title(&self) -> Result<String, BuildError> {
        let date = self
            .date
            .format(format_description!("[year]-[month]-[day]"))?;
        Ok(self.title_format.render(TitleContext {
            name: &self.config.name,
            version: &self.config.version,
            url: &self.config.url,
            date,
        })?)
    }

    fn render_issue(&self, issue: Issue) -> Result<String, BuildError> {
        Ok(self.issue_format.render(IssueContext {
            name: &self.config.name,
            version: &self.config.version,
            url: &self.config.url,
            issue: issue.value(),
        })?)
    }

    fn render_entry(&self, fragment: &Fragment) -> Result<String, BuildError> {
        let reference = self.render_issue(fragment.issue)?;
        let text = [fragment.content.as_str(), reference.as_str()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        Ok(if self.config.wrap {
            wrap::wrap_bullet(&self.config.bullet, &text, self.config.wrap_size)
        } else {
            wrap::bullet(&self.config.bullet, &text)
        })
    }

    fn heading(&self, level: usize) -> String {
        let mut heading = self.config.heading.to_string().repeat(level);
        heading.push(' ');
        heading
    }
}

/// Insert `entry` after the first line of `document` equal to `marker`.
///
/// Everything up to and including the marker is copied verbatim, followed by a blank line, the
/// entry, a blank line, and the remainder of the document, also verbatim. Blank lines directly
/// after the marker are the separator of a previous entry and are not repeated. The inserted
/// lines use the marker line's ending. Returns `None` without a marker line.
pub fn splice(document: &str, marker: &str, entry: &str) -> Option<String> {
    let mut offset = 0;
    let mut marker_line = None;
    for line in document.split_inclusive('\n') {
        if strip_line_ending(line) == marker {
            marker_line = Some((offset, line));
            break;
        }
        offset += line.len();
    }
    let (start, line) = marker_line?;

    let newline = match line.strip_suffix('\n') {
        Some(rest) if rest.ends_with('\r') => "\r\n",
        Some(_) => "\n",
        None if document.contains("\r\n") => "\r\n",
        None => "\n",
    };

    let marker_end = start + line.len();
    let mut rest = &document[marker_end..];
    while let Some(blank) = rest
        .split_inclusive('\n')
        .next()
        .filter(|next| next.trim().is_empty())
    {
        rest = &rest[blank.len()..];
    }

    let mut output = String::with_capacity(document.len() + entry.len() + 4 * newline.len());
    output.push_str(&document[..marker_end]);
    if !line.ends_with('\n') {
        output.push_str(newline);
    }
    output.push_str(newline);
    output.push_str(&entry.lines().collect::<Vec<_>>().join(newline));
    output.push_str(newline);

    if !rest.is_empty() {
        output.push_str(newline);
        output.push_str(rest);
    }

    Some(output)
}

fn strip_line_ending(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fragments::{Display, FragmentType, FragmentTypes};
    use std::path::Path;
    use time::macros::date;

    const MARKER: &str = "<!-- changelogging: start -->";

    fn config(root: &Path) -> Config {
        let mut config = Config::from_toml_str(
            r#"
[changelogging]
name = "tests"
version = "1.0.0"
url = "http://x"
directory = "changes"
output = "CHANGELOG.md"
wrap = false
"#,
            root,
        )
        .unwrap();
        config.types = FragmentTypes::from_types(vec![FragmentType::new("feature", "Features")]);
        config.display = Display::from_names(vec!["feature"]);
        config
    }

    fn setup() -> (tempfile::TempDir, Config) {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir_all(temp.path().join("changes")).unwrap();
        let config = config(temp.path());
        (temp, config)
    }

    #[test]
    fn renders_single_fragment() {
        let (temp, config) = setup();
        fs::write(temp.path().join("changes/1.feature"), "Added X.\n").unwrap();

        let builder = Builder::new(&config, date!(2024 - 01 - 02)).unwrap();
        let rendered = builder.render().unwrap();

        assert_eq!(
            rendered,
            "## 1.0.0 (2024-01-02)\n\n### Features\n\n- Added X. [#1](http://x/pull/1)"
        );
    }

    #[test]
    fn groups_follow_display_order_and_sort_by_issue() {
        let (temp, mut config) = setup();
        config.types = FragmentTypes::builtin();
        config.display = Display::from_names(vec!["fix", "feature"]);

        let changes = temp.path().join("changes");
        fs::write(changes.join("5.feature"), "Five.").unwrap();
        fs::write(changes.join("1.feature"), "One.").unwrap();
        fs::write(changes.join("3.fix"), "Three.").unwrap();
        fs::write(changes.join("2.change"), "Hidden.").unwrap();

        let builder = Builder::new(&config, date!(2024 - 01 - 02)).unwrap();
        let rendered = builder.render().unwrap();

        assert_eq!(
            rendered,
            "## 1.0.0 (2024-01-02)\n\n\
             ### Fixes\n\n\
             - Three. [#3](http://x/pull/3)\n\n\
             ### Features\n\n\
             - One. [#1](http://x/pull/1)\n\
             - Five. [#5](http://x/pull/5)"
        );
    }

    #[test]
    fn equal_issues_keep_file_name_order() {
        let (temp, config) = setup();
        let changes = temp.path().join("changes");
        fs::write(changes.join("4.feature.b"), "Second.").unwrap();
        fs::write(changes.join("4.feature.a"), "First.").unwrap();

        let rendered = Builder::new(&config, date!(2024 - 01 - 02))
            .unwrap()
            .render()
            .unwrap();

        let first = rendered.find("First.").unwrap();
        let second = rendered.find("Second.").unwrap();
        assert!(first < second);
    }

    #[test]
    fn duplicate_display_names_render_each_time() {
        let (temp, mut config) = setup();
        config.display = Display::from_names(vec!["feature", "feature"]);
        fs::write(temp.path().join("changes/1.feature"), "Twice.").unwrap();

        let rendered = Builder::new(&config, date!(2024 - 01 - 02))
            .unwrap()
            .render()
            .unwrap();
        assert_eq!(
            rendered,
            "## 1.0.0 (2024-01-02)\n\n\
             ### Features\n\n\
             - Twice. [#1](http://x/pull/1)\n\n\
             ### Features\n\n\
             - Twice. [#1](http://x/pull/1)"
        );
    }

    #[test]
    fn empty_directory_renders_placeholder() {
        let (_temp, config) = setup();
        let rendered = Builder::new(&config, date!(2024 - 01 - 02))
            .unwrap()
            .render()
            .unwrap();
        assert_eq!(rendered, "## 1.0.0 (2024-01-02)\n\nNo significant changes.");
    }

    #[test]
    fn unknown_display_name_fails_render() {
        let (_temp, mut config) = setup();
        config.display = Display::from_names(vec!["feature", "broken"]);

        let err = Builder::new(&config, date!(2024 - 01 - 02))
            .unwrap()
            .render()
            .unwrap_err();
        assert!(matches!(
            err,
            BuildError::Lookup(DomainError::TypeNotFound(name)) if name == "broken"
        ));
    }

    #[test]
    fn invalid_formats_fail_early() {
        let (_temp, mut config) = setup();
        config.issue_format = "{issue".into();
        assert!(matches!(
            Builder::new(&config, date!(2024 - 01 - 02)),
            Err(BuildError::Template(TemplateError::Unclosed(_)))
        ));

        config.issue_format = "{ticket}".into();
        assert!(matches!(
            Builder::new(&config, date!(2024 - 01 - 02)),
            Err(BuildError::Template(TemplateError::Render { .. }))
        ));
    }

    #[test]
    fn wraps_content_together_with_issue_reference() {
        let (temp, mut config) = setup();
        config.wrap = true;
        config.wrap_size = 30;
        fs::write(
            temp.path().join("changes/12.feature"),
            "Added a rather long description here.",
        )
        .unwrap();

        let rendered = Builder::new(&config, date!(2024 - 01 - 02))
            .unwrap()
            .render()
            .unwrap();

        assert!(rendered.ends_with(
            "- Added a rather long\n  description here.\n  [#12](http://x/pull/12)"
        ));
    }

    #[test]
    fn multi_paragraph_fragment_stays_inside_the_bullet() {
        let (temp, config) = setup();
        fs::write(
            temp.path().join("changes/1.feature"),
            "First para.\n\nSecond para line.\r\nThird.\n",
        )
        .unwrap();

        let rendered = Builder::new(&config, date!(2024 - 01 - 02))
            .unwrap()
            .render()
            .unwrap();

        assert!(rendered.ends_with(
            "- First para.\n\n  Second para line.\n  Third. [#1](http://x/pull/1)"
        ));
    }

    #[test]
    fn empty_fragment_renders_reference_only() {
        let (temp, config) = setup();
        fs::write(temp.path().join("changes/8.feature"), "\n").unwrap();

        let rendered = Builder::new(&config, date!(2024 - 01 - 02))
            .unwrap()
            .render()
            .unwrap();
        assert!(rendered.ends_with("- [#8](http://x/pull/8)"));
    }

    #[test]
    fn splice_inserts_after_marker() {
        let document = format!("# Changelog\n\n{MARKER}\n\n## 0.9.0\n\n- Old.\n");
        let spliced = splice(&document, MARKER, "## 1.0.0\n\n- New.").unwrap();
        assert_eq!(
            spliced,
            format!("# Changelog\n\n{MARKER}\n\n## 1.0.0\n\n- New.\n\n## 0.9.0\n\n- Old.\n")
        );
    }

    #[test]
    fn splice_with_nothing_after_marker() {
        let spliced = splice(&format!("{MARKER}\n"), MARKER, "entry").unwrap();
        assert_eq!(spliced, format!("{MARKER}\n\nentry\n"));
    }

    #[test]
    fn splice_preserves_crlf() {
        let document = format!("# Changelog\r\n{MARKER}\r\nold\r\n");
        let spliced = splice(&document, MARKER, "a\nb").unwrap();
        assert_eq!(
            spliced,
            format!("# Changelog\r\n{MARKER}\r\n\r\na\r\nb\r\n\r\nold\r\n")
        );
    }

    #[test]
    fn splice_copies_surrounding_text_verbatim() {
        let spliced = splice("a\r\nM\nb\n", "M", "E").unwrap();
        assert_eq!(spliced, "a\r\nM\n\nE\n\nb\n");

        let spliced = splice("a\nM\r\n\r\nb\nc", "M", "E").unwrap();
        assert_eq!(spliced, "a\nM\r\n\r\nE\r\n\r\nb\nc");
    }

    #[test]
    fn splice_marker_on_last_line_without_newline() {
        assert_eq!(splice("# Log\nM", "M", "E").unwrap(), "# Log\nM\n\nE\n");
    }

    #[test]
    fn splice_requires_exact_marker_line() {
        assert_eq!(splice("prefix <!-- marker -->\n", "<!-- marker -->", "x"), None);
        assert_eq!(splice("nothing here\n", MARKER, "x"), None);
    }

    #[test]
    fn write_splices_output_and_returns_consumed_paths() {
        let (temp, config) = setup();
        fs::write(temp.path().join("changes/1.feature"), "Added X.").unwrap();
        fs::write(temp.path().join("changes/.gitkeep"), "").unwrap();
        fs::write(
            temp.path().join("CHANGELOG.md"),
            format!("# Changelog\n\n{MARKER}\n"),
        )
        .unwrap();

        let builder = Builder::new(&config, date!(2024 - 01 - 02)).unwrap();
        let paths = builder.write().unwrap();

        assert_eq!(paths, [temp.path().join("changes/1.feature")]);
        let written = fs::read_to_string(temp.path().join("CHANGELOG.md")).unwrap();
        assert_eq!(
            written,
            format!(
                "# Changelog\n\n{MARKER}\n\n## 1.0.0 (2024-01-02)\n\n### Features\n\n\
                 - Added X. [#1](http://x/pull/1)\n"
            )
        );
    }

    #[test]
    fn write_without_marker_leaves_output_untouched() {
        let (temp, config) = setup();
        let output = temp.path().join("CHANGELOG.md");
        fs::write(&output, "# Changelog\n").unwrap();

        let err = Builder::new(&config, date!(2024 - 01 - 02))
            .unwrap()
            .write()
            .unwrap_err();

        assert!(matches!(err, BuildError::MarkerNotFound { .. }));
        assert_eq!(fs::read_to_string(&output).unwrap(), "# Changelog\n");
    }

    #[test]
    fn write_is_repeatable_from_the_same_template() {
        let (temp, config) = setup();
        fs::write(temp.path().join("changes/2.feature"), "Added Y.").unwrap();
        let output = temp.path().join("CHANGELOG.md");
        let template = format!("# Changelog\n\n{MARKER}\n\n## 0.1.0\n\n- Initial.\n");
        let builder = Builder::new(&config, date!(2024 - 01 - 02)).unwrap();

        fs::write(&output, &template).unwrap();
        builder.write().unwrap();
        let first = fs::read_to_string(&output).unwrap();

        fs::write(&output, &template).unwrap();
        builder.write().unwrap();
        let second = fs::read_to_string(&output).unwrap();

        assert_eq!(first, second);
    }
}
