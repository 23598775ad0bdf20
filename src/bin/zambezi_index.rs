//! `zambezi_index`: builds an index from one or more whitespace-tokenised input files and
//! writes it to disk.
//!
//! ```text
//! zambezi_index -index <dir> [-mb <blocks>] [-positional|-tf] [-bloom -k <nbHash> -r <bitsPerElement>] [-reverse] [-vectors] [-dfCutoff <n>] -input <files...>
//! ```

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use flate2::read::GzDecoder;

use zambezi::buffers::PositionalMode;
use zambezi::driver::{IndexBuilder, IndexingConfig};
use zambezi::error::ZambeziError;
use zambezi::segment_pool::{self, BloomParams};

struct Args {
    index: PathBuf,
    inputs: Vec<String>,
    mode: PositionalMode,
    reverse: bool,
    df_cutoff: usize,
    max_blocks: usize,
    bloom_hashes: u32,
    bloom_bits: u32,
    bloom: bool,
    vectors: bool,
}

fn usage() -> ! {
    eprintln!(
        "{}",
        ZambeziError::UsageError(
            "usage: zambezi_index -index <dir> [-mb <blocks>] [-positional|-tf] \
             [-bloom -k <nbHash> -r <bitsPerElement>] [-reverse] [-vectors] [-dfCutoff <n>] -input <files...>"
                .to_string()
        )
    );
    std::process::exit(2);
}

fn parse_args() -> Args {
    let raw: Vec<String> = std::env::args().skip(1).collect();
    let mut index = None;
    let mut inputs = Vec::new();
    let mut mode = PositionalMode::NonPositional;
    let mut reverse = false;
    let mut df_cutoff = 4usize;
    let mut max_blocks = segment_pool::MAX_INT_VALUE;
    let mut bloom_hashes = 4u32;
    let mut bloom_bits = 10u32;
    let mut bloom = false;
    let mut vectors = false;

    let mut i = 0;
    while i < raw.len() {
        match raw[i].as_str() {
            "-index" => {
                i += 1;
                index = raw.get(i).map(PathBuf::from);
            }
            "-mb" => {
                i += 1;
                max_blocks = raw.get(i).and_then(|v| v.parse().ok()).unwrap_or_else(usage);
            }
            "-positional" => mode = PositionalMode::Positional,
            "-tf" => mode = PositionalMode::TfOnly,
            "-bloom" => bloom = true,
            "-k" => {
                i += 1;
                bloom_hashes = raw.get(i).and_then(|v| v.parse().ok()).unwrap_or_else(usage);
            }
            "-r" => {
                i += 1;
                bloom_bits = raw.get(i).and_then(|v| v.parse().ok()).unwrap_or_else(usage);
            }
            "-reverse" => reverse = true,
            "-vectors" => vectors = true,
            "-dfCutoff" => {
                i += 1;
                df_cutoff = raw.get(i).and_then(|v| v.parse().ok()).unwrap_or_else(usage);
            }
            "-input" => {
                i += 1;
                while i < raw.len() && !raw[i].starts_with('-') {
                    inputs.push(raw[i].clone());
                    i += 1;
                }
                continue;
            }
            _ => usage(),
        }
        i += 1;
    }

    let Some(index) = index else { usage() };
    if inputs.is_empty() {
        usage();
    }

    Args {
        index,
        inputs,
        mode,
        reverse,
        df_cutoff,
        max_blocks,
        bloom_hashes,
        bloom_bits,
        bloom,
        vectors,
    }
}

fn open_input(path: &str) -> io::Result<Box<dyn BufRead>> {
    let file = File::open(path)?;
    if path.ends_with(".gz") {
        Ok(Box::new(BufReader::new(GzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

fn main() -> ExitCode {
    let args = parse_args();

    let bloom = args.bloom.then_some(BloomParams {
        num_hashes: args.bloom_hashes,
        bits_per_element: args.bloom_bits,
    });
    let mut builder = IndexBuilder::new(IndexingConfig {
        mode: args.mode,
        reverse: args.reverse,
        df_cutoff: args.df_cutoff,
        max_blocks: args.max_blocks,
        bloom,
        document_vectors: args.vectors,
    });

    let mut documents = 0u64;
    for path in &args.inputs {
        let reader = match open_input(path) {
            Ok(r) => r,
            Err(e) => {
                eprintln!("zambezi_index: could not open {path}: {e}");
                return ExitCode::from(1);
            }
        };
        for line in reader.lines() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    eprintln!("zambezi_index: read error in {path}: {e}");
                    return ExitCode::from(1);
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            if let Err(e) = builder.index_document(&line) {
                eprintln!("zambezi_index: {e}");
                return ExitCode::from(1);
            }
            documents += 1;
        }
    }

    println!("indexed {documents} documents, writing index to {}", args.index.display());
    let index = builder.finish();

    if let Err(e) = fs::create_dir_all(&args.index) {
        eprintln!("zambezi_index: could not create index directory: {e}");
        return ExitCode::from(1);
    }
    if let Err(e) = write_index(&args.index, &index) {
        eprintln!("zambezi_index: could not write index: {e}");
        return ExitCode::from(1);
    }

    println!("done");
    ExitCode::SUCCESS
}

fn write_index(dir: &Path, index: &zambezi::driver::BuiltIndex) -> zambezi::error::Result<()> {
    index.dictionary.write(&mut File::create(dir.join("dictionary.bin"))?)?;
    index
        .pointer_directory
        .write(&mut File::create(dir.join("pointer_directory.bin"))?)?;
    index.segment_pool.write(&mut File::create(dir.join("segment_pool.bin"))?)?;
    let mut meta = File::create(dir.join("meta.bin"))?;
    let flags = (index.reverse as u32) | ((index.mode as u32) << 1) | ((index.doc_vectors.is_some() as u32) << 3);
    meta.write_all(&flags.to_le_bytes())?;
    if let Some(vectors) = &index.doc_vectors {
        vectors.write(&mut File::create(dir.join("doc_vectors.bin"))?)?;
    }
    Ok(())
}
