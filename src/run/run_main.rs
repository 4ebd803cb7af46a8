use crate::dom::{parse_fragment, Dom, ElementData, HtmlParseError, NodeId};
use crate::location::{CoordinatesError, Point, PointCoordinates, Range};
use crate::output::{io_to_fmt, write_inner_html, SerializableResult};
use crate::run::cli::{split_assignment, OutputFormat};
use crate::run::RunOptions;
use crate::surround::{self, AnyMatcher, Operation, StyleMatcher, SurroundFormat, TagMatcher};
use std::fmt::{Display, Formatter};
use std::io::Write;
use std::{env, io};

/// The run's overall possible error.
#[derive(Debug)]
pub enum Error {
    /// The input wasn't an HTML fragment we could parse.
    HtmlParse(HtmlParseError),

    /// The `--start` or `--end` coordinates were invalid, or didn't resolve against the fragment.
    Coordinates(CoordinatesError),

    /// The wrapper or matcher options were invalid.
    FormatOption(FormatOptionError),

    /// The operation itself failed. The fragment is not written out.
    Surround(surround::Error),

    /// Couldn't read an input file.
    FileReadError(Input, io::Error),

    /// Couldn't write the output.
    WriteError(io::Error),
}

impl std::error::Error for Error {}

/// Returned when a wrapper attribute or style matcher option is not valid.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FormatOptionError {
    option: &'static str,
    value: String,
    reason: String,
}

impl std::error::Error for FormatOptionError {}

impl Display for FormatOptionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid {} {:?}: {}", self.option, self.value, self.reason)
    }
}

/// Stdin or an input file by path.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Input {
    Stdin,
    FilePath(String),
}

impl Error {
    pub(crate) fn from_io_error(error: io::Error, file: Input) -> Self {
        Error::FileReadError(file, error)
    }
}

impl Display for Input {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Input::Stdin => f.write_str("stdin"),
            Input::FilePath(file) => write!(f, "file {file:?}"),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::HtmlParse(err) => {
                writeln!(f, "HTML parse error:")?;
                writeln!(f, "{err}")
            }
            Error::Coordinates(err) => writeln!(f, "Invalid selection: {err}"),
            Error::FormatOption(err) => writeln!(f, "Invalid format: {err}"),
            Error::Surround(err) => writeln!(f, "Couldn't apply the format: {err}"),
            Error::FileReadError(file, err) => {
                if env::var("SURROUND_PORTABLE_ERRORS").unwrap_or_default().is_empty() {
                    writeln!(f, "{err} while reading {file}")
                } else {
                    writeln!(f, "{} while reading {file}", err.kind())
                }
            }
            Error::WriteError(err) => writeln!(f, "{err} while writing output"),
        }
    }
}

/// A simple facade for handling I/O.
///
/// This trait lets you do "I/O-y stuff" like mocking out stdin or reading files. The [`run`] method uses it.
pub trait OsFacade {
    /// Read stdin (or your mock of it) to a `String`.
    fn read_stdin(&self) -> io::Result<String>;

    /// Read a file path (or your mock of one) to a `String`.
    fn read_file(&self, path: &str) -> io::Result<String>;

    /// Get a writer for stdout (or your mock of it).
    fn stdout(&mut self) -> impl Write;

    /// Handle an error.
    fn write_error(&mut self, err: Error);

    /// Read a slice of file paths into a single, concatenated `String`.
    ///
    /// The default implementation (which you should feel free to use) treats the file path `"-"` as stdin. The first
    /// `"-"` reads all of stdin (via [`Self::read_stdin`]), and subsequent `"-"`s get silently ignored. A single
    /// trailing newline is dropped from each input.
    fn read_all(&self, html_file_paths: &[String]) -> Result<String, Error> {
        if html_file_paths.is_empty() {
            let contents = self.read_stdin().map_err(|err| Error::from_io_error(err, Input::Stdin))?;
            return Ok(without_trailing_newline(&contents).to_string());
        }
        let mut contents = String::new();
        let mut have_read_stdin = false;
        for path in html_file_paths {
            if path == "-" {
                if !have_read_stdin {
                    let stdin = self.read_stdin().map_err(|err| Error::from_io_error(err, Input::Stdin))?;
                    contents.push_str(without_trailing_newline(&stdin));
                    have_read_stdin = true
                }
            } else {
                let path_contents = self
                    .read_file(path)
                    .map_err(|err| Error::from_io_error(err, Input::FilePath(path.to_string())))?;
                contents.push_str(without_trailing_newline(&path_contents));
            }
        }
        Ok(contents)
    }
}

fn without_trailing_newline(text: &str) -> &str {
    let text = text.strip_suffix('\n').unwrap_or(text);
    text.strip_suffix('\r').unwrap_or(text)
}

/// Runs surround end to end.
///
/// This uses the provided [RunOptions] and [OsFacade] to read an HTML fragment, applies [`RunOptions::mode`] to the
/// selection given by [`RunOptions::start`] and [`RunOptions::end`], and then writes the result to the given
/// [`OsFacade`] in the format specified by [`RunOptions::output`]. Returns whether the run succeeded.
pub fn run(cli: &RunOptions, os: &mut impl OsFacade) -> bool {
    match run_or_error(cli, os) {
        Ok(()) => true,
        Err(err) => {
            os.write_error(err);
            false
        }
    }
}

fn run_or_error(cli: &RunOptions, os: &mut impl OsFacade) -> Result<(), Error> {
    let contents_str = os.read_all(&cli.html_file_paths)?;
    let mut dom = parse_fragment(&contents_str).map_err(Error::HtmlParse)?;
    let root = dom.root();

    let range = cli.selection(&dom, root).map_err(Error::Coordinates)?;
    let format = cli.surround_format().map_err(Error::FormatOption)?;
    let operation: Operation = cli.mode.into();
    log::debug!("running {operation:?} with {format:?}");
    let range = operation
        .apply(&mut dom, range, root, &format)
        .map_err(Error::Surround)?;

    if !cli.quiet {
        let mut stdout = os.stdout();
        match cli.output {
            OutputFormat::Html => {
                write_inner_html(&dom, root, &mut io_to_fmt(&mut stdout))
                    .map_err(|_| Error::WriteError(io::Error::other("while writing HTML")))?;
                writeln!(stdout).map_err(Error::WriteError)?;
            }
            OutputFormat::Json => {
                serde_json::to_writer(&mut stdout, &SerializableResult::new(&dom, root, &range))
                    .map_err(|err| Error::WriteError(err.into()))?;
            }
        }
    }
    Ok(())
}

impl RunOptions {
    /// The selection described by [`Self::start`] and [`Self::end`], defaulting to the whole fragment.
    pub fn selection(&self, dom: &Dom, root: NodeId) -> Result<Range, CoordinatesError> {
        let start = match &self.start {
            Some(coords) => coords.parse::<PointCoordinates>()?.resolve(dom, root)?,
            None => Point::new(root, 0),
        };
        let end = match &self.end {
            Some(coords) => coords.parse::<PointCoordinates>()?.resolve(dom, root)?,
            None => Point::new(root, dom.node_length(root)),
        };
        let range = Range::new(start, end);
        range.validate(dom, root)?;
        Ok(range)
    }

    /// The format described by [`Self::tag`], [`Self::attrs`], [`Self::match_tags`] and [`Self::match_style`].
    pub fn surround_format(&self) -> Result<SurroundFormat, FormatOptionError> {
        let mut template = ElementData::new(self.tag.trim());
        for attr in &self.attrs {
            let Some((name, value)) = split_assignment(attr) else {
                return Err(FormatOptionError {
                    option: "--attr",
                    value: attr.to_string(),
                    reason: "expected NAME=VALUE".to_string(),
                });
            };
            template.set_attr(name, value);
        }

        let mut tags = vec![self.tag.trim().to_string()];
        tags.extend(self.match_tags.iter().map(|tag| tag.trim().to_string()));
        let mut matcher = AnyMatcher::default();
        matcher.push(TagMatcher::new(tags));

        if let Some(style) = &self.match_style {
            let invalid = |reason: String| FormatOptionError {
                option: "--match-style",
                value: style.to_string(),
                reason,
            };
            let (property, pattern) =
                split_assignment(style).ok_or_else(|| invalid("expected PROPERTY=REGEX".to_string()))?;
            let regex = fancy_regex::Regex::new(pattern).map_err(|err| invalid(err.to_string()))?;
            matcher.push(StyleMatcher::new(property, regex));
        }
        Ok(SurroundFormat::new(template, matcher))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::range_coordinates;
    use crate::surround::Classification;

    struct NoFiles(&'static str);

    impl OsFacade for NoFiles {
        fn read_stdin(&self) -> io::Result<String> {
            Ok(self.0.to_string())
        }

        fn read_file(&self, path: &str) -> io::Result<String> {
            Err(io::Error::new(io::ErrorKind::NotFound, path))
        }

        fn stdout(&mut self) -> impl Write {
            io::sink()
        }

        fn write_error(&mut self, _: Error) {}
    }

    #[test]
    fn read_all_drops_one_trailing_newline() {
        unwrap!(NoFiles("a\n\n").read_all(&[]), Ok(contents));
        assert_eq!(contents, "a\n");
        unwrap!(NoFiles("a\r\n").read_all(&["-".to_string(), "-".to_string()]), Ok(contents));
        assert_eq!(contents, "a");
    }

    #[test]
    fn read_all_missing_file() {
        unwrap!(
            NoFiles("").read_all(&["nope.html".to_string()]),
            Err(Error::FileReadError(Input::FilePath(path), _))
        );
        assert_eq!(path, "nope.html");
    }

    #[test]
    fn default_selection_is_whole_fragment() {
        unwrap!(parse_fragment("11<b>22</b>"), Ok(dom));
        let root = dom.root();
        unwrap!(RunOptions::default().selection(&dom, root), Ok(range));
        assert_eq!(range.text(&dom), "1122");
        unwrap!(range_coordinates(&dom, &range, root), Some(coords));
        assert_eq!(coords.start.to_string(), ":0");
        assert_eq!(coords.end.to_string(), ":2");
    }

    #[test]
    fn explicit_selection() {
        unwrap!(parse_fragment("11<b>22</b>"), Ok(dom));
        let options = RunOptions {
            start: Some("0:1".to_string()),
            end: Some("1.0:1".to_string()),
            ..RunOptions::default()
        };
        unwrap!(options.selection(&dom, dom.root()), Ok(range));
        assert_eq!(range.text(&dom), "12");
    }

    #[test]
    fn format_from_options() {
        let options = RunOptions {
            tag: "span".to_string(),
            attrs: vec!["class=hl".to_string()],
            match_tags: vec!["mark".to_string()],
            match_style: Some("background-color=^yellow$".to_string()),
            ..RunOptions::default()
        };
        unwrap!(options.surround_format(), Ok(format));
        unwrap!(format.construct(), Some(template));
        assert_eq!(template.tag(), "span");
        assert_eq!(template.attr("class"), Some("hl"));

        let Classification { result, .. } = format.classify(&ElementData::new("mark"));
        assert!(result.is_match());
        let styled = ElementData::new("em").with_attr("style", "background-color: yellow");
        assert!(format.classify(&styled).result.is_match());
        assert!(!format.classify(&ElementData::new("em")).result.is_match());
    }

    #[test]
    fn invalid_style_regex() {
        let options = RunOptions {
            match_style: Some("color=(".to_string()),
            ..RunOptions::default()
        };
        unwrap!(options.surround_format(), Err(err));
        assert!(err.to_string().starts_with(r#"invalid --match-style "color=(": "#));
    }

    #[test]
    fn invalid_selection_fails_the_run() {
        let options = RunOptions {
            start: Some("0:2".to_string()),
            end: Some("0:1".to_string()),
            ..RunOptions::default()
        };
        assert!(!run(&options, &mut NoFiles("abc")));
    }

    use crate::util::utils_for_test::*;
}
