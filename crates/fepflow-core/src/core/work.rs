use rand::Rng;
use rand::seq::index;
use std::cmp::Ordering;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum SelectionError {
    #[error("Slice [{first}, {last}) is not a valid range for {len} files")]
    InvalidSlice {
        first: usize,
        last: usize,
        len: usize,
    },

    #[error("Cannot draw a random subset of {requested} from {len} files")]
    SubsetTooLarge { requested: usize, len: usize },

    #[error("Skip step must be at least 1")]
    ZeroSkip,
}

/// A set of integrated work values in kJ/mol together with the files they
/// came from. Forward and reverse transformations each get one `WorkSet`,
/// both expressed in the 0 -> 1 lambda frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkSet {
    pub files: Vec<String>,
    pub values: Vec<f64>,
}

impl WorkSet {
    pub fn new(files: Vec<String>, values: Vec<f64>) -> Self {
        Self { files, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn push(&mut self, file: String, value: f64) {
        self.files.push(file);
        self.values.push(value);
    }
}

/// Which subset of the sorted input file list to analyze. The variants are
/// mutually exclusive by construction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    All,
    /// Keep every nth file, counted from the end of the list so the last
    /// file always survives.
    Skip(usize),
    /// Keep the half-open index range `[first, last)`.
    Slice { first: usize, last: usize },
    /// Keep exactly the listed zero-based indices; out-of-range entries are
    /// dropped with a warning.
    Index(Vec<usize>),
    /// Keep a random subset of the given size, drawn without replacement.
    Random(usize),
}

impl Selection {
    pub fn apply<R: Rng>(
        &self,
        files: Vec<String>,
        rng: &mut R,
    ) -> Result<Vec<String>, SelectionError> {
        let len = files.len();
        match self {
            Selection::All => Ok(files),
            Selection::Skip(0) => Err(SelectionError::ZeroSkip),
            Selection::Skip(1) => Ok(files),
            Selection::Skip(step) => {
                let mut picked: Vec<String> = files
                    .into_iter()
                    .rev()
                    .step_by(*step)
                    .collect();
                picked.reverse();
                Ok(picked)
            }
            Selection::Slice { first, last } => {
                if *first >= *last || *last > len {
                    return Err(SelectionError::InvalidSlice {
                        first: *first,
                        last: *last,
                        len,
                    });
                }
                Ok(files[*first..*last].to_vec())
            }
            Selection::Index(indices) => {
                let picked: Vec<String> = indices
                    .iter()
                    .filter(|&&i| i < len)
                    .map(|&i| files[i].clone())
                    .collect();
                if picked.len() < indices.len() {
                    warn!(
                        len,
                        "Some requested file indices are out of range and were dropped."
                    );
                }
                Ok(picked)
            }
            Selection::Random(n) => {
                if *n > len {
                    return Err(SelectionError::SubsetTooLarge {
                        requested: *n,
                        len,
                    });
                }
                let mut indices: Vec<usize> = index::sample(rng, len, *n).into_vec();
                indices.sort_unstable();
                Ok(indices.into_iter().map(|i| files[i].clone()).collect())
            }
        }
    }
}

/// Sorts file names so numeric runs compare as numbers: `dgdl_9.xvg` comes
/// before `dgdl_10.xvg`.
pub fn natural_sort(files: &mut [String]) {
    files.sort_by(|a, b| natural_cmp(a, b));
}

fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut ta = tokenize(a).into_iter();
    let mut tb = tokenize(b).into_iter();
    loop {
        match (ta.next(), tb.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => match x.cmp(&y) {
                Ordering::Equal => continue,
                other => return other,
            },
        }
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Token {
    Number(u64),
    Text(String),
}

fn tokenize(s: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = s.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_ascii_digit() {
            let mut run = String::new();
            while let Some(&d) = chars.peek() {
                if d.is_ascii_digit() {
                    run.push(d);
                    chars.next();
                } else {
                    break;
                }
            }
            match run.parse::<u64>() {
                Ok(n) => tokens.push(Token::Number(n)),
                Err(_) => tokens.push(Token::Text(run)),
            }
        } else {
            let mut run = String::new();
            while let Some(&d) = chars.peek() {
                if d.is_ascii_digit() {
                    break;
                }
                run.push(d.to_ascii_lowercase());
                chars.next();
            }
            tokens.push(Token::Text(run));
        }
    }
    tokens
}
