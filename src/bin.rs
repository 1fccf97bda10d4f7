use clap::Parser;
use crossfill::backtracking_search::{find_fill, FillFailure};
use crossfill::grid_config::{generate_grid_config_from_template_string, render_grid};
use crossfill::word_list::WordList;
use std::fmt::{Debug, Formatter};
use std::fs;
use unicode_normalization::UnicodeNormalization;

/// crossfill: Command-line crossword fill-in puzzle solver
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the structure file, with _ representing open cells and anything else blocks
    grid_path: String,

    /// Path to a word list file with one candidate word per line
    words_path: String,

    /// Maximum number of search states to visit before giving up [default: unlimited]
    #[arg(long)]
    max_states: Option<usize>,

    /// Log solver diagnostics to stderr (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

struct Error(String);

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0) // Print error unquoted
    }
}

fn main() -> Result<(), Error> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!("[{}] {}", record.level(), message));
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()
        .map_err(|_| Error("Logger was already initialized".into()))?;

    let raw_grid_content = fs::read_to_string(&args.grid_path)
        .map_err(|_| Error(format!("Couldn't read file '{}'", args.grid_path)))?
        .trim()
        .lines()
        .map(|line| line.trim().nfc().collect::<String>())
        .collect::<Vec<_>>()
        .join("\n");

    let word_list =
        WordList::from_dict_file(args.words_path.as_str()).map_err(|err| Error(err.to_string()))?;

    if word_list.is_empty() {
        return Err(Error("Word list is empty".into()));
    }

    let grid_config = generate_grid_config_from_template_string(word_list, &raw_grid_content)
        .map_err(|err| Error(err.to_string()))?;

    match find_fill(&grid_config.to_config_ref(), args.max_states) {
        Ok(result) => println!(
            "{}",
            render_grid(&grid_config.to_config_ref(), &result.choices)
        ),
        Err(FillFailure::Unsatisfiable) => println!("No solution."),
        Err(FillFailure::ExceededStateLimit(limit)) => {
            return Err(Error(format!(
                "Gave up after visiting {limit} search states"
            )));
        }
    }

    Ok(())
}
