//! x2t - convert XML documents with xml2tree
//!
//! `x2t parse` prints the JSON view of a document, `x2t render` parses a
//! document and prints it back as normalized XML.

use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::task::Poll;

use clap::{Args, Parser, Subcommand};
use log::{Level, LevelFilter, Log, Metadata, Record};
use xml2tree::{
    FirstCharLowerCase, JsonView, ParseBooleans, ParseNumbers, ParseOptions, StripPrefix, Value,
    XmlDeclaration, XmlParser, XmlPrinter, XmlPrinterOptions,
};

/// Convert XML documents into policy-shaped trees
#[derive(Parser)]
#[command(name = "x2t")]
#[command(version)]
#[command(about = "Convert XML documents into policy-shaped trees", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a document and print its JSON view
    #[command(visible_alias = "p")]
    Parse {
        /// Input file (default: stdin)
        input: Option<String>,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<String>,
        /// Print JSON on a single line
        #[arg(long)]
        compact: bool,

        #[command(flatten)]
        parse: ParseArgs,
    },

    /// Parse a document and print it back as XML
    #[command(visible_alias = "r")]
    Render {
        /// Input file (default: stdin)
        input: Option<String>,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<String>,

        #[command(flatten)]
        render: RenderArgs,

        #[command(flatten)]
        parse: ParseArgs,
    },
}

#[derive(Args)]
struct ParseArgs {
    /// Store single children bare instead of in one-element arrays
    #[arg(long)]
    no_explicit_array: bool,
    /// Store attributes among the child elements
    #[arg(long)]
    merge_attrs: bool,
    /// Drop attributes
    #[arg(long)]
    ignore_attrs: bool,
    /// Trim element text
    #[arg(long)]
    trim: bool,
    /// Collapse whitespace runs in element text
    #[arg(long)]
    normalize: bool,
    /// Do not wrap the result in its root tag name
    #[arg(long)]
    no_explicit_root: bool,
    /// Keep text-only elements as objects
    #[arg(long)]
    explicit_charkey: bool,
    /// Group children under the child key
    #[arg(long)]
    explicit_children: bool,
    /// Keep children in document order (needs --explicit-children)
    #[arg(long)]
    preserve_children_order: bool,
    /// Treat text as children (needs --explicit-children)
    #[arg(long)]
    chars_as_children: bool,
    /// Keep whitespace-only text children
    #[arg(long)]
    include_white_chars: bool,
    /// Record namespace metadata
    #[arg(long)]
    xmlns: bool,
    /// Lower-case tag names
    #[arg(long)]
    normalize_tags: bool,
    /// Use null instead of "" for empty elements
    #[arg(long)]
    empty_null: bool,
    /// Recover from malformed markup
    #[arg(long)]
    lenient: bool,
    /// Parse in steps of this many bytes
    #[arg(long)]
    chunk_size: Option<usize>,
    /// Convert numeric text and attribute values to numbers
    #[arg(long)]
    parse_numbers: bool,
    /// Convert "true"/"false" text and attribute values to booleans
    #[arg(long)]
    parse_booleans: bool,
    /// Drop namespace prefixes from tag and attribute names
    #[arg(long)]
    strip_prefix: bool,
    /// Lower-case the first character of tag names
    #[arg(long)]
    first_char_lower: bool,
    /// Key for attributes in the JSON view
    #[arg(long, default_value = xml2tree::DEFAULT_ATTR_KEY)]
    attr_key: String,
    /// Key for character data in the JSON view
    #[arg(long, default_value = xml2tree::DEFAULT_CHAR_KEY)]
    char_key: String,
    /// Key for children in the JSON view
    #[arg(long, default_value = xml2tree::DEFAULT_CHILD_KEY)]
    child_key: String,
}

impl ParseArgs {
    fn to_options(&self) -> ParseOptions {
        let mut options = ParseOptions::default()
            .with_explicit_array(!self.no_explicit_array)
            .with_merge_attrs(self.merge_attrs)
            .with_ignore_attrs(self.ignore_attrs)
            .with_trim(self.trim)
            .with_normalize(self.normalize)
            .with_explicit_root(!self.no_explicit_root)
            .with_explicit_charkey(self.explicit_charkey)
            .with_explicit_children(self.explicit_children)
            .with_preserve_children_order(self.preserve_children_order)
            .with_chars_as_children(self.chars_as_children)
            .with_include_white_chars(self.include_white_chars)
            .with_xmlns(self.xmlns)
            .with_normalize_tags(self.normalize_tags)
            .with_strict(!self.lenient);
        if self.empty_null {
            options = options.with_empty_tag(Value::Null);
        }
        if let Some(size) = self.chunk_size {
            options = options.with_chunked(size);
        }
        if self.strip_prefix {
            options = options
                .with_tag_name_processor(StripPrefix)
                .with_attr_name_processor(StripPrefix);
        }
        if self.first_char_lower {
            options = options.with_tag_name_processor(FirstCharLowerCase);
        }
        if self.parse_numbers {
            options = options
                .with_value_processor(ParseNumbers)
                .with_attr_value_processor(ParseNumbers);
        }
        if self.parse_booleans {
            options = options
                .with_value_processor(ParseBooleans)
                .with_attr_value_processor(ParseBooleans);
        }
        options.attr_key = self.attr_key.clone();
        options.char_key = self.char_key.clone();
        options.child_key = self.child_key.clone();
        options
    }
}

#[derive(Args)]
struct RenderArgs {
    /// Print on a single line
    #[arg(long)]
    compact: bool,
    /// Spaces per indentation level
    #[arg(long, default_value = "1")]
    indent: usize,
    /// Omit the XML declaration
    #[arg(long)]
    headless: bool,
    /// Name of the root element
    #[arg(long)]
    root_name: Option<String>,
    /// Wrap text that needs escaping in CDATA sections
    #[arg(long)]
    cdata: bool,
    /// Leave the standalone flag out of the declaration
    #[arg(long)]
    no_standalone: bool,
}

impl RenderArgs {
    fn to_options(&self) -> XmlPrinterOptions {
        XmlPrinterOptions {
            pretty: !self.compact,
            indent: " ".repeat(self.indent),
            headless: self.headless,
            declaration: XmlDeclaration {
                standalone: if self.no_standalone { None } else { Some(true) },
                ..Default::default()
            },
            root_name: self.root_name.clone(),
            cdata: self.cdata,
            ..Default::default()
        }
    }
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Parse {
            input,
            output,
            compact,
            parse,
        } => run_parse(input.as_deref(), output.as_deref(), compact, &parse),
        Commands::Render {
            input,
            output,
            render,
            parse,
        } => run_render(input.as_deref(), output.as_deref(), &render, &parse),
    };

    match result {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::ExitCode::FAILURE
        }
    }
}

/// Parses the input and writes its JSON view.
fn run_parse(
    input_path: Option<&str>,
    output_path: Option<&str>,
    compact: bool,
    args: &ParseArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = args.to_options();
    let view = JsonView::new(&options);
    let tree = parse_input(input_path, options)?;

    let json = tree.map(|value| view.render(&value)).unwrap_or_default();
    let text = if compact {
        serde_json::to_string(&json)?
    } else {
        serde_json::to_string_pretty(&json)?
    };

    let mut output = open_output(output_path)?;
    writeln!(output, "{}", text)?;
    output.flush()?;
    Ok(())
}

/// Parses the input and writes it back as XML.
fn run_render(
    input_path: Option<&str>,
    output_path: Option<&str>,
    render: &RenderArgs,
    args: &ParseArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let tree = parse_input(input_path, args.to_options())?.unwrap_or_default();

    let mut output = open_output(output_path)?;
    {
        let mut printer = XmlPrinter::with_options(&mut output, render.to_options());
        printer.print(&tree)?;
    }
    writeln!(output)?;
    output.flush()?;
    Ok(())
}

fn parse_input(
    input_path: Option<&str>,
    options: ParseOptions,
) -> Result<Option<Value>, Box<dyn std::error::Error>> {
    let xml = match input_path {
        Some(path) if path != "-" => {
            log::info!("reading {}", path);
            fs::read_to_string(path)?
        }
        _ => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let parser = XmlParser::new(options)?;
    let mut task = parser.stream(&xml);
    let mut steps = 0usize;
    let tree = loop {
        match task.poll_chunk() {
            Poll::Pending => {
                steps += 1;
                log::trace!("chunk {} done, {} bytes consumed", steps, task.consumed());
            }
            Poll::Ready(outcome) => break outcome?,
        }
    };
    if tree.is_none() {
        log::warn!("input contains no element");
    }
    Ok(tree)
}

fn open_output(output_path: Option<&str>) -> io::Result<Box<dyn Write>> {
    Ok(match output_path {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout()),
    })
}

/// Logger writing `level: message` lines to stderr.
struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            let level = match record.level() {
                Level::Error => "error",
                Level::Warn => "warning",
                Level::Info => "info",
                Level::Debug => "debug",
                Level::Trace => "trace",
            };
            eprintln!("{}: {}", level, record.args());
        }
    }

    fn flush(&self) {}
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}
