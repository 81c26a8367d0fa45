//! Seed spectral dataset loader and in-memory matrix (spec §3
//! `SpectrumMatrix`, §6.2). Loaded once at device start with `csv`, the
//! same crate the teacher already depends on for its own spectrum export
//! (`SpectrumContainer::write_to_csv`).

use std::path::{Path, PathBuf};

use crate::error::FatalInit;

#[derive(Debug, Clone)]
pub struct SpectrumMatrix {
    pub wavelengths: Vec<f32>,
    pub rows: Vec<Vec<f32>>,
    cursor: usize,
}

impl SpectrumMatrix {
    pub fn n(&self) -> usize {
        self.wavelengths.len()
    }

    pub fn m(&self) -> usize {
        self.rows.len()
    }

    /// Returns the row at the current cursor and advances it
    /// `(cursor + 1) mod M` (spec §4.2 single-shot `GET_SPECTRUM`).
    pub fn next_row(&mut self) -> &[f32] {
        let idx = self.cursor;
        self.cursor = (self.cursor + 1) % self.m();
        &self.rows[idx]
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn row(&self, idx: usize) -> &[f32] {
        &self.rows[idx % self.m()]
    }

    /// Probes the locations named in spec §6.2, in order.
    pub fn probe_path(exe_dir: &Path, name: &str) -> PathBuf {
        if Path::new(name).is_absolute() {
            return PathBuf::from(name);
        }
        let candidate = exe_dir.join("..").join("data").join(name);
        if candidate.exists() {
            return candidate;
        }
        let candidate = Path::new("./data").join(name);
        if candidate.exists() {
            return candidate;
        }
        PathBuf::from(name)
    }

    /// Loads the seed CSV. Wavelengths live on line 10 (1-indexed),
    /// starting at column 3; each following line is one spectrum row
    /// (column 1 is an ignored label, columns 2..N+1 align with the
    /// wavelength header). Rows with no parseable values are skipped.
    /// Fewer than 11 lines total is a load failure (spec §6.2).
    pub fn load(path: &Path) -> Result<Self, FatalInit> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| FatalInit(format!("cannot read spectrum CSV {}: {e}", path.display())))?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());
        let lines: Vec<csv::StringRecord> = reader
            .records()
            .collect::<Result<_, _>>()
            .map_err(|e| FatalInit(format!("cannot parse spectrum CSV: {e}")))?;

        if lines.len() < 11 {
            return Err(FatalInit(format!(
                "spectrum CSV has {} lines, need at least 11",
                lines.len()
            )));
        }

        let header = &lines[9]; // line 10, 1-indexed
        let wavelengths: Vec<f32> = header
            .iter()
            .skip(2) // column 3 onward, 1-indexed
            .filter_map(|v| v.trim().parse::<f32>().ok())
            .collect();

        if wavelengths.is_empty() {
            return Err(FatalInit("no parseable wavelengths on header line".into()));
        }
        let n = wavelengths.len();

        let rows: Vec<Vec<f32>> = lines[10..]
            .iter()
            .filter_map(|record| {
                let values: Vec<f32> = record
                    .iter()
                    .skip(1)
                    .filter_map(|v| v.trim().parse::<f32>().ok())
                    .collect();
                if values.is_empty() {
                    None
                } else {
                    let mut values = values;
                    values.resize(n, 0.0);
                    values.truncate(n);
                    Some(values)
                }
            })
            .collect();

        if rows.is_empty() {
            return Err(FatalInit("no parseable spectrum rows after header".into()));
        }

        Ok(Self {
            wavelengths,
            rows,
            cursor: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file
    }

    #[test]
    fn load_minimal_11_lines() {
        let mut lines: Vec<String> = (0..9).map(|i| format!("junk{i}")).collect();
        lines.push("label,x,500,510,520".to_string());
        lines.push("row0,label,1.0,2.0,3.0".to_string());
        let line_refs: Vec<&str> = lines.iter().map(|s| s.as_str()).collect();
        let file = write_csv(&line_refs);

        let matrix = SpectrumMatrix::load(file.path()).unwrap();
        assert_eq!(matrix.n(), 3);
        assert_eq!(matrix.m(), 1);
        assert_eq!(matrix.wavelengths, vec![500.0, 510.0, 520.0]);
    }

    #[test]
    fn cursor_wraps() {
        let mut lines: Vec<String> = (0..9).map(|i| format!("junk{i}")).collect();
        lines.push("label,x,500,510".to_string());
        lines.push("row0,l,1.0,2.0".to_string());
        let line_refs: Vec<&str> = lines.iter().map(|s| s.as_str()).collect();
        let file = write_csv(&line_refs);

        let mut matrix = SpectrumMatrix::load(file.path()).unwrap();
        assert_eq!(matrix.cursor(), 0);
        let _ = matrix.next_row();
        assert_eq!(matrix.cursor(), 0); // M=1, wraps back to 0
    }

    #[test]
    fn too_few_lines_fails() {
        let lines = vec!["a", "b", "c"];
        let file = write_csv(&lines);
        assert!(SpectrumMatrix::load(file.path()).is_err());
    }
}
