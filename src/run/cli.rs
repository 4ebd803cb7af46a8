use crate::surround::Operation;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, ValueEnum};
use derive_builder::Builder;
use std::fmt::{Display, Formatter};

macro_rules! create_options_structs {
    (
        $(
            $(#[$meta:meta])*
            clap $clap:tt
            pub $name:ident : $ty:ty
        ),* $(,)?
    ) => {
        #[derive(Clone, Default, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Parser)]
        #[command(version, about, long_about = None)]
        #[doc(hidden)]
        pub struct CliOptions {
            $(
            $(#[$meta])*
            #[arg$clap]
            pub(crate) $name: $ty,
            )*

            // clap-only stuff:

            /// What to do with the selection.
            #[arg(value_enum)]
            pub(crate) mode: Mode,

            /// An optional list of HTML files to read, by path. If not provided, standard input will be used.
            ///
            /// If these are provided, surround will act as if they were all concatenated into a single fragment. A
            /// single trailing newline at the end of each input is not part of the fragment.
            ///
            /// A path of "-" represents standard input. All but the first "-" paths are ignored.
            #[arg()]
            pub(crate) html_file_paths: Vec<String>,
        }

        /// Options analogous to the surround CLI's switches.
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Builder)]
        pub struct RunOptions {
            $(
            $(#[$meta])*
            pub $name: $ty,
            )*

            /// What to do with the selection. This is analogous to the positional `mode` argument in the CLI.
            pub mode: Mode,

            pub html_file_paths: Vec<String>,
        }

        impl From<CliOptions> for RunOptions {
            fn from(value: CliOptions) -> Self {
                Self {
                    $($name: value.$name,)*
                    mode: value.mode,
                    html_file_paths: value.html_file_paths,
                }
            }
        }
    };
}

create_options_structs! {
    /// The tag of the wrapper element that surround and reformat create.
    ///
    /// Elements with this tag are also recognized as already carrying the format.
    clap(long, default_value_t = String::from("b"))
    pub tag: String,

    /// An attribute for the wrapper element, as NAME=VALUE. Can be repeated.
    clap(long = "attr", value_name = "NAME=VALUE")
    pub attrs: Vec<String>,

    /// Another tag to recognize as carrying the format (for example, `strong` alongside `b`). Can be repeated.
    clap(long = "match-tag", value_name = "TAG")
    pub match_tags: Vec<String>,

    /// Also recognize elements whose inline style has a matching property, as PROPERTY=REGEX.
    ///
    /// When such an element loses the format, only that style property is removed from it. A `span` that's left
    /// without any attributes is removed entirely.
    clap(long, value_name = "PROPERTY=REGEX")
    pub match_style: Option<String>,

    /// Where the selection starts, as coordinates relative to the fragment: child indexes joined by ".", then ":"
    /// and an offset. For example, "1.0:3" is offset 3 in the first child of the fragment's second node.
    ///
    /// Defaults to the start of the fragment.
    clap(long, value_name = "COORDS")
    pub start: Option<String>,

    /// Where the selection ends, in the same form as --start. Defaults to the end of the fragment.
    clap(long, value_name = "COORDS")
    pub end: Option<String>,

    /// Specifies the output format. Defaults to html.
    clap(long, short, default_value_t = OutputFormat::Html)
    pub output: OutputFormat,

    /// Quiet: do not print anything to stdout. The exit code will still be 0 if the operation succeeded, and non-0 if
    /// it didn't.
    clap(long, short)
    pub quiet: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            tag: "b".to_string(),
            attrs: vec![],
            match_tags: vec![],
            match_style: None,
            start: None,
            end: None,
            output: OutputFormat::Html,
            quiet: false,
            mode: Mode::Surround,
            html_file_paths: vec![],
        }
    }
}

impl CliOptions {
    pub fn extra_validation(&self) -> bool {
        if self.tag.trim().is_empty() {
            let _ = CliOptions::command()
                .error(ErrorKind::ValueValidation, "--tag can't be empty")
                .print();
            return false;
        }
        for attr in &self.attrs {
            if split_assignment(attr).is_none() {
                let _ = CliOptions::command()
                    .error(
                        ErrorKind::ValueValidation,
                        format!("invalid value {attr:?} for '--attr': expected NAME=VALUE"),
                    )
                    .print();
                return false;
            }
        }
        if let Some(style) = &self.match_style {
            if split_assignment(style).is_none() {
                let _ = CliOptions::command()
                    .error(
                        ErrorKind::ValueValidation,
                        format!("invalid value {style:?} for '--match-style': expected PROPERTY=REGEX"),
                    )
                    .print();
                return false;
            }
        }
        true
    }
}

/// Splits `NAME=VALUE` at its first `=`. The name must not be empty; the value may be.
pub(crate) fn split_assignment(text: &str) -> Option<(&str, &str)> {
    let (name, value) = text.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        None
    } else {
        Some((name, value))
    }
}

/// The operation to run, analogous to the positional `mode` argument in the CLI.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum)]
pub enum Mode {
    /// Make the selection carry the format.
    #[default]
    Surround,
    /// Remove the format from the selection.
    Unsurround,
    /// Replace the format's wrappers within the selection with new ones, built from --tag and --attr.
    Reformat,
}

impl From<Mode> for Operation {
    fn from(value: Mode) -> Self {
        match value {
            Mode::Surround => Operation::Surround,
            Mode::Unsurround => Operation::Unsurround,
            Mode::Reformat => Operation::Reformat,
        }
    }
}

/// Output formats, analogous to `--output` in the CLI.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum)]
pub enum OutputFormat {
    /// Output the fragment's new HTML.
    #[default]
    Html,

    /// Output JSON with the fragment's new HTML, and the coordinates of the resulting selection:
    ///
    /// ```json
    /// {
    ///   "html": "111<b>222</b>",
    ///   "range": {
    ///     "start": { "path": [1, 0], "offset": 0 },
    ///     "end": { "path": [1, 0], "offset": 3 }
    ///   }
    /// }
    /// ```
    Json,
}

impl Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let self_str = match self {
            OutputFormat::Html => "html",
            OutputFormat::Json => "json",
        };
        f.write_str(self_str)
    }
}
