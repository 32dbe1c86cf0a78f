use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum XvgError {
    #[error("Failed to read '{path}': {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed dH/dl row at {path}:{line}: '{content}'", path = path.display())]
    Malformed {
        path: PathBuf,
        line: usize,
        content: String,
    },

    #[error("'{path}' contains fewer than two dH/dl rows", path = path.display())]
    TooShort { path: PathBuf },
}

/// The lambda endpoint a dgdl file was produced from. A `One` file holds a
/// descending ramp; reversing both the lambda axis and the rows puts it in
/// the 0 -> 1 frame, and on a uniform ramp that leaves the trapezoid sum
/// unchanged. Both endpoints therefore integrate to the same sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LambdaStart {
    Zero,
    One,
}

/// Reads the (time, dH/dl) rows of a GROMACS dgdl.xvg file, skipping the
/// `#` comment and `@` grace directive headers.
pub fn read_dgdl(path: &Path) -> Result<Vec<(f64, f64)>, XvgError> {
    let file = File::open(path).map_err(|source| XvgError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(file);

    let mut rows = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| XvgError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('@') {
            continue;
        }

        let mut cols = trimmed.split_whitespace();
        let parsed = match (cols.next(), cols.next()) {
            (Some(t), Some(y)) => t.parse::<f64>().ok().zip(y.parse::<f64>().ok()),
            _ => None,
        };
        match parsed {
            Some(row) => rows.push(row),
            None => {
                return Err(XvgError::Malformed {
                    path: path.to_path_buf(),
                    line: idx + 1,
                    content: trimmed.to_string(),
                });
            }
        }
    }
    Ok(rows)
}

/// Integrates a dgdl.xvg file over lambda with the trapezoid rule, assuming
/// a linear lambda ramp across the rows, and returns the work in kJ/mol in
/// the 0 -> 1 frame. `invert` negates the result and is the only sign flip;
/// it corresponds to reverse legs that were themselves run from lambda zero
/// to one.
pub fn integrate_work(path: &Path, lambda0: LambdaStart, invert: bool) -> Result<f64, XvgError> {
    let rows = read_dgdl(path)?;
    if rows.len() < 2 {
        return Err(XvgError::TooShort {
            path: path.to_path_buf(),
        });
    }

    let dlambda = 1.0 / (rows.len() - 1) as f64;
    let mut integral = 0.0;
    for pair in rows.windows(2) {
        integral += 0.5 * (pair[0].1 + pair[1].1) * dlambda;
    }

    let mut work = match lambda0 {
        LambdaStart::Zero => integral,
        // Reversing both the ramp and the rows leaves the sum intact.
        LambdaStart::One => integral,
    };
    if invert {
        work = -work;
    }
    Ok(work)
}
