use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use pdf_syntax::{
    ByteSource, ObjectTable, ParseOptions, ReadValidator, ReaderSource, SyntaxParser,
};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How far into the file the `%PDF-` header may start
const HEADER_SEARCH_LIMIT: u64 = 1024;

#[derive(Parser)]
#[command(
    name = "pdfsyntax",
    about = "Inspect the raw object syntax of PDF files",
    version,
    author
)]
struct Cli {
    /// Byte offset of the `%PDF-` header (located automatically if omitted)
    #[arg(long, global = true)]
    header_offset: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the indirect objects found by scanning for `obj` keywords
    Objects {
        /// Input PDF file
        input: PathBuf,

        /// Start scanning at this offset (relative to the header)
        #[arg(short, long, default_value_t = 0)]
        offset: u64,

        /// Stop after this many objects
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Print a single indirect object
    Object {
        /// Input PDF file
        input: PathBuf,

        /// Offset of the object header (relative to the header)
        #[arg(short, long)]
        at: u64,
    },

    /// Print the end offset of every `%%EOF` marker
    Trailers {
        /// Input PDF file
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Objects {
            input,
            offset,
            limit,
        } => {
            let mut parser = open_parser(&input, cli.header_offset, ParseOptions::lenient())?;
            list_objects(&mut parser, offset, limit);
        }

        Commands::Object { input, at } => {
            let mut parser = open_parser(&input, cli.header_offset, ParseOptions::lenient())?;
            if at >= parser.document_size() {
                bail!(
                    "offset {at} is past the end of the document ({} bytes)",
                    parser.document_size()
                );
            }

            let indirect = parser
                .get_indirect_object_at(at, &ObjectTable::new())
                .with_context(|| format!("no indirect object at offset {at}"))?;
            println!("{} {} obj", indirect.number, indirect.generation);
            println!("{}", indirect.object);
            println!("endobj");
        }

        Commands::Trailers { input } => {
            let options = ParseOptions {
                record_trailer_ends: true,
                ..ParseOptions::lenient()
            };
            let mut parser = open_parser(&input, cli.header_offset, options)?;
            list_trailers(&mut parser);
        }
    }

    Ok(())
}

fn open_parser(
    path: &Path,
    header_offset: Option<u64>,
    options: ParseOptions,
) -> Result<SyntaxParser<ReaderSource<File>>> {
    let header_offset = match header_offset {
        Some(offset) => offset,
        None => locate_header(path)?,
    };

    let source = ReaderSource::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    if header_offset > source.size() {
        bail!(
            "header offset {header_offset} is past the end of {}",
            path.display()
        );
    }

    tracing::debug!("{}: header at offset {}", path.display(), header_offset);
    let validator = ReadValidator::new(source);
    Ok(SyntaxParser::with_validator(validator, header_offset, options))
}

/// Find `%PDF-` within the first [`HEADER_SEARCH_LIMIT`] bytes
fn locate_header(path: &Path) -> Result<u64> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut prefix = Vec::new();
    file.take(HEADER_SEARCH_LIMIT)
        .read_to_end(&mut prefix)
        .with_context(|| format!("failed to read {}", path.display()))?;

    match prefix.windows(5).position(|window| window == b"%PDF-") {
        Some(offset) => Ok(offset as u64),
        None => {
            tracing::warn!("{}: no %PDF- header, assuming offset 0", path.display());
            Ok(0)
        }
    }
}

fn list_objects<S: ByteSource>(parser: &mut SyntaxParser<S>, offset: u64, limit: Option<usize>) {
    let mut table = ObjectTable::new();
    let mut printed = 0usize;
    parser.set_pos(offset);

    let size = parser.document_size();
    while limit.map_or(true, |limit| printed < limit) {
        let scan_from = parser.pos();
        let Some(distance) = parser.find_tag(b"obj") else {
            break;
        };
        let keyword_pos = scan_from + distance;
        let mut resume = keyword_pos + 3;

        // `obj<<` is a header too, only word bytes glue onto the keyword
        if !parser.is_whole_word(keyword_pos, size, b"obj", false) {
            parser.set_pos(resume);
            continue;
        }

        match header_start(parser, keyword_pos) {
            Some(start) => match parser.get_indirect_object_at(start, &table) {
                Ok(indirect) => {
                    let mut line = format!(
                        "{start:>10}  {} {} obj  {}",
                        indirect.number,
                        indirect.generation,
                        indirect.object.kind()
                    );
                    if let Some(stream) = indirect.object.as_stream() {
                        line.push_str(&format!("  ({} bytes)", stream.data.len()));
                    }
                    println!("{line}");

                    resume = resume.max(parser.pos());
                    table.insert_indirect(indirect);
                    printed += 1;
                }
                Err(e) => {
                    eprintln!("{start:>10}  error: {e}");
                }
            },
            None => tracing::debug!("`obj` at {} has no object header", keyword_pos),
        }

        parser.set_pos(resume);
    }

    println!("{printed} object(s)");
}

/// Walk back over `<num> <gen> ` in front of an `obj` keyword
fn header_start<S: ByteSource>(parser: &mut SyntaxParser<S>, keyword_pos: u64) -> Option<u64> {
    let mut pos = keyword_pos;
    for _ in 0..2 {
        pos = skip_back(parser, pos, is_pdf_whitespace);
        let digits_end = pos;
        pos = skip_back(parser, pos, |byte| byte.is_ascii_digit());
        if pos == digits_end {
            return None;
        }
    }
    Some(pos)
}

fn skip_back<S: ByteSource>(
    parser: &mut SyntaxParser<S>,
    mut pos: u64,
    predicate: impl Fn(u8) -> bool,
) -> u64 {
    while pos > 0 {
        match parser.get_char_at(pos - 1) {
            Some(byte) if predicate(byte) => pos -= 1,
            _ => break,
        }
    }
    pos
}

fn is_pdf_whitespace(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | b'\r' | b'\x0c' | b'\0')
}

fn list_trailers<S: ByteSource>(parser: &mut SyntaxParser<S>) {
    parser.set_pos(0);
    while !parser.get_next_word().is_empty() {}

    let ends = parser.take_trailer_ends();
    if ends.is_empty() {
        println!("no %%EOF markers found");
    }
    for end in &ends {
        println!("%%EOF ends at {end}");
    }

    let size = parser.document_size();
    if size > 0 {
        parser.set_pos(size - 1);
        if parser.backwards_search_to_word(b"trailer", 0) {
            println!("last trailer keyword at {}", parser.pos());
        }
    }
}
