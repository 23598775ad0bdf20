//! `zambezi_query`: evaluates a batch of queries against a previously built index.
//!
//! ```text
//! zambezi_query -index <dir> -query <file> [-output <file>] [-hits <k>] [-algorithm <SvS|WAND|MBWAND|BWAND_OR|BWAND_AND>] [-docnoMapping <file>]
//! ```
//!
//! `-features`/`-model` are accepted for compatibility with the wider toolchain but are
//! ignored: learning-to-rank re-ranking of the candidate set is out of scope here.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;

use zambezi::buffers::PositionalMode;
use zambezi::dictionary::Dictionary;
use zambezi::doc_vectors::DocumentVectors;
use zambezi::driver::BuiltIndex;
use zambezi::error::ZambeziError;
use zambezi::pointer_directory::PointerDirectory;
use zambezi::query::{Algorithm, Searcher};
use zambezi::segment_pool::SegmentPool;

struct Args {
    index: PathBuf,
    query: PathBuf,
    output: Option<PathBuf>,
    hits: usize,
    algorithm: Algorithm,
    docno_mapping: Option<PathBuf>,
}

fn usage() -> ! {
    eprintln!(
        "{}",
        ZambeziError::UsageError(
            "usage: zambezi_query -index <dir> -query <file> [-output <file>] [-hits <k>] \
             [-algorithm <SvS|WAND|MBWAND|BWAND_OR|BWAND_AND>] [-docnoMapping <file>] [-features <file>] [-model <file>]"
                .to_string()
        )
    );
    std::process::exit(2);
}

fn parse_args() -> Args {
    let raw: Vec<String> = std::env::args().skip(1).collect();
    let mut index = None;
    let mut query = None;
    let mut output = None;
    let mut hits = 10usize;
    let mut algorithm = Algorithm::Wand;
    let mut docno_mapping = None;

    let mut i = 0;
    while i < raw.len() {
        match raw[i].as_str() {
            "-index" => {
                i += 1;
                index = raw.get(i).map(PathBuf::from);
            }
            "-query" => {
                i += 1;
                query = raw.get(i).map(PathBuf::from);
            }
            "-output" => {
                i += 1;
                output = raw.get(i).map(PathBuf::from);
            }
            "-hits" => {
                i += 1;
                hits = raw.get(i).and_then(|v| v.parse().ok()).unwrap_or_else(usage);
            }
            "-algorithm" => {
                i += 1;
                let name = raw.get(i).unwrap_or_else(|| usage());
                algorithm = Algorithm::parse(name).unwrap_or_else(|| {
                    eprintln!("{}", ZambeziError::UsageError(format!("unknown algorithm {name:?}")));
                    std::process::exit(2)
                });
            }
            "-docnoMapping" => {
                i += 1;
                docno_mapping = raw.get(i).map(PathBuf::from);
            }
            "-features" | "-model" => {
                i += 1;
            }
            _ => usage(),
        }
        i += 1;
    }

    let Some(index) = index else { usage() };
    let Some(query) = query else { usage() };

    Args {
        index,
        query,
        output,
        hits,
        algorithm,
        docno_mapping,
    }
}

fn load_index(dir: &std::path::Path) -> zambezi::error::Result<BuiltIndex> {
    use zambezi::error::ZambeziError;

    let dictionary = Dictionary::read(&mut File::open(dir.join("dictionary.bin"))?)?;
    let pointer_directory = PointerDirectory::read(&mut File::open(dir.join("pointer_directory.bin"))?)?;
    let segment_pool = SegmentPool::read(&mut File::open(dir.join("segment_pool.bin"))?)?;

    let mut meta_bytes = [0u8; 4];
    File::open(dir.join("meta.bin"))?.read_exact(&mut meta_bytes)?;
    let flags = u32::from_le_bytes(meta_bytes);
    let reverse = flags & 0b1 != 0;
    let mode = match (flags >> 1) & 0b11 {
        0 => PositionalMode::NonPositional,
        1 => PositionalMode::TfOnly,
        2 => PositionalMode::Positional,
        other => {
            return Err(ZambeziError::CorruptIndex(format!(
                "meta.bin encodes unknown positional mode {other}"
            )));
        }
    };
    let has_vectors = (flags >> 3) & 0b1 != 0;
    let doc_vectors = if has_vectors {
        Some(DocumentVectors::read(&mut File::open(dir.join("doc_vectors.bin"))?)?)
    } else {
        None
    };

    Ok(BuiltIndex {
        dictionary,
        pointer_directory,
        segment_pool,
        doc_vectors,
        mode,
        reverse,
    })
}

fn load_docno_mapping(path: &std::path::Path) -> io::Result<HashMap<u32, String>> {
    let mut map = HashMap::new();
    for line in BufReader::new(File::open(path)?).lines() {
        let line = line?;
        let mut parts = line.split_whitespace();
        if let (Some(docid), Some(docno)) = (parts.next(), parts.next()) {
            if let Ok(docid) = docid.parse() {
                map.insert(docid, docno.to_string());
            }
        }
    }
    Ok(map)
}

fn main() -> std::process::ExitCode {
    let args = parse_args();

    let index = match load_index(&args.index) {
        Ok(i) => i,
        Err(e) => {
            eprintln!("zambezi_query: could not load index at {}: {e}", args.index.display());
            return std::process::ExitCode::from(1);
        }
    };
    let docno_mapping = match &args.docno_mapping {
        Some(path) => match load_docno_mapping(path) {
            Ok(m) => Some(m),
            Err(e) => {
                eprintln!("zambezi_query: could not load docno mapping: {e}");
                return std::process::ExitCode::from(1);
            }
        },
        None => None,
    };

    let queries = match File::open(&args.query) {
        Ok(f) => BufReader::new(f),
        Err(e) => {
            eprintln!("zambezi_query: could not open query file: {e}");
            return std::process::ExitCode::from(1);
        }
    };

    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => match File::create(path) {
            Ok(f) => Box::new(f),
            Err(e) => {
                eprintln!("zambezi_query: could not create output file: {e}");
                return std::process::ExitCode::from(1);
            }
        },
        None => Box::new(io::stdout()),
    };

    let searcher = Searcher::new(&index);
    let mut lines = queries.lines();

    let total: usize = match lines.next() {
        Some(Ok(l)) => match l.trim().parse() {
            Ok(n) => n,
            Err(_) => {
                eprintln!("zambezi_query: malformed query count {l:?}");
                return std::process::ExitCode::from(1);
            }
        },
        Some(Err(e)) => {
            eprintln!("zambezi_query: read error: {e}");
            return std::process::ExitCode::from(1);
        }
        None => {
            eprintln!("zambezi_query: empty query file, expected a leading query count");
            return std::process::ExitCode::from(1);
        }
    };

    for line in lines.take(total) {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("zambezi_query: read error: {e}");
                return std::process::ExitCode::from(1);
            }
        };
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < 2 {
            eprintln!("zambezi_query: malformed query line {line:?}");
            return std::process::ExitCode::from(1);
        }
        let qid: u32 = match tokens[0].parse() {
            Ok(v) => v,
            Err(_) => {
                eprintln!("zambezi_query: malformed qid in {line:?}");
                return std::process::ExitCode::from(1);
            }
        };
        let qlen: usize = match tokens[1].parse() {
            Ok(v) => v,
            Err(_) => {
                eprintln!("zambezi_query: malformed qlen in {line:?}");
                return std::process::ExitCode::from(1);
            }
        };
        if tokens.len() < 2 + qlen {
            eprintln!("zambezi_query: query {qid} declares qlen {qlen} but has fewer tokens");
            return std::process::ExitCode::from(1);
        }
        if qlen == 0 {
            continue;
        }
        let terms: Vec<String> = tokens[2..2 + qlen].iter().map(|s| s.to_string()).collect();
        let results = searcher.evaluate(&terms, args.algorithm, args.hits);

        for (rank, candidate) in results.iter().enumerate() {
            let docno = docno_mapping
                .as_ref()
                .and_then(|m| m.get(&candidate.doc_id))
                .cloned()
                .unwrap_or_else(|| candidate.doc_id.to_string());
            if let Err(e) = writeln!(
                out,
                "{} Q0 {} {} {} zambezi",
                qid,
                docno,
                rank + 1,
                candidate.score
            ) {
                eprintln!("zambezi_query: write error: {e}");
                return std::process::ExitCode::from(1);
            }
        }
    }

    std::process::ExitCode::SUCCESS
}
