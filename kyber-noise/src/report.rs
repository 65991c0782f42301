//! Text report of a harness run.
//!
//! The format is line oriented ASCII, written in one pass:
//!
//! ```text
//! 0000000000000000000000000000000000000000000000000000000000000000
//! timing s nonce=0 eta=3 start_us=12 end_us=31 elapsed_us=19
//! ...
//! total elapsed_us=97
//! poly s
//! 1 0 -2 0 1 1 0 -1 0 0 2 -1 0 0 1 -3
//! ...
//! end
//! ```
//!
//! The first line is always the seed in uppercase hex. A failed run replaces
//! the `total` line with `failed <term> nonce=<n> error=<message>` and lists
//! only the polynomials of terms that completed.

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt::{self, Write};

use itertools::Itertools;
use thiserror::Error;

use crate::error::ConfigError;
use crate::pipeline::{NoiseRun, RunFailure, TermResult};
use crate::seed::Seed;

/// Writes reports to any [`fmt::Write`] sink.
pub struct ReportEmitter<W> {
    out: W,
    row_width: usize,
}

impl<W: Write> ReportEmitter<W> {
    pub fn new(out: W, row_width: usize) -> Result<Self, ConfigError> {
        if row_width == 0 {
            return Err(ConfigError::RowWidth);
        }
        Ok(Self { out, row_width })
    }

    pub fn emit(&mut self, seed: &Seed, run: &NoiseRun) -> fmt::Result {
        writeln!(self.out, "{}", seed)?;
        for result in &run.results {
            self.timing_line(result)?;
        }
        writeln!(self.out, "total elapsed_us={}", run.total.elapsed_us)?;
        for result in &run.results {
            self.poly_block(result)?;
        }
        writeln!(self.out, "end")
    }

    pub fn emit_failure(&mut self, seed: &Seed, failure: &RunFailure) -> fmt::Result {
        writeln!(self.out, "{}", seed)?;
        for result in &failure.completed {
            self.timing_line(result)?;
        }
        let (term, nonce) = match failure.failed {
            Some(spec) => (spec.name, spec.nonce.to_string()),
            None => ("-", "-".to_string()),
        };
        writeln!(
            self.out,
            "failed {} nonce={} error={}",
            term, nonce, failure.error
        )?;
        for result in &failure.completed {
            self.poly_block(result)?;
        }
        writeln!(self.out, "end")
    }

    pub fn emit_outcome(
        &mut self,
        seed: &Seed,
        outcome: &Result<NoiseRun, RunFailure>,
    ) -> fmt::Result {
        match outcome {
            Ok(run) => self.emit(seed, run),
            Err(failure) => self.emit_failure(seed, failure),
        }
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn timing_line(&mut self, result: &TermResult) -> fmt::Result {
        let t = &result.timing;
        writeln!(
            self.out,
            "timing {} nonce={} eta={} start_us={} end_us={} elapsed_us={}",
            result.spec.name,
            result.spec.nonce,
            result.spec.distribution_width,
            t.start_us,
            t.end_us,
            t.elapsed_us
        )
    }

    fn poly_block(&mut self, result: &TermResult) -> fmt::Result {
        writeln!(self.out, "poly {}", result.spec.name)?;
        for row in result.polynomial.coeffs().chunks(self.row_width) {
            writeln!(self.out, "{}", row.iter().format(" "))?;
        }
        Ok(())
    }
}

/// Render a whole outcome into a string.
pub fn render(
    seed: &Seed,
    outcome: &Result<NoiseRun, RunFailure>,
    row_width: usize,
) -> Result<String, ConfigError> {
    let mut emitter = ReportEmitter::new(String::new(), row_width)?;
    // Writing into a String cannot fail.
    let _ = emitter.emit_outcome(seed, outcome);
    Ok(emitter.into_inner())
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportParseError {
    #[error("report is empty")]
    Empty,

    #[error("line {line}: bad seed: {source}")]
    Seed { line: usize, source: ConfigError },

    #[error("line {line}: unexpected `{text}`")]
    Unexpected { line: usize, text: String },

    #[error("line {line}: missing or malformed field `{field}`")]
    Field { line: usize, field: &'static str },

    #[error("line {line}: bad coefficient `{text}`")]
    Coefficient { line: usize, text: String },

    #[error("report has no `end` line")]
    Truncated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTiming {
    pub name: String,
    pub nonce: u8,
    pub width: u8,
    pub start_us: u64,
    pub end_us: u64,
    pub elapsed_us: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFailure {
    pub term: String,
    pub nonce: Option<u8>,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPolynomial {
    pub name: String,
    pub coeffs: Vec<i16>,
}

/// Structured view of one report, for aligning against captured traces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReport {
    pub seed: Seed,
    pub timings: Vec<ParsedTiming>,
    pub total_us: Option<u64>,
    pub failure: Option<ParsedFailure>,
    pub polynomials: Vec<ParsedPolynomial>,
}

impl ParsedReport {
    pub fn polynomial(&self, name: &str) -> Option<&ParsedPolynomial> {
        self.polynomials.iter().find(|p| p.name == name)
    }
}

/// Parse the first report in `text`. Lines after `end` are ignored.
pub fn parse_report(text: &str) -> Result<ParsedReport, ReportParseError> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty());

    let (line, first) = lines.next().ok_or(ReportParseError::Empty)?;
    let seed = Seed::from_hex(first).map_err(|source| ReportParseError::Seed { line, source })?;

    let mut report = ParsedReport {
        seed,
        timings: Vec::new(),
        total_us: None,
        failure: None,
        polynomials: Vec::new(),
    };

    for (line, text) in lines {
        let (keyword, rest) = text.split_once(' ').unwrap_or((text, ""));
        match keyword {
            "timing" => report.timings.push(parse_timing(line, rest)?),
            "total" => report.total_us = Some(field(line, rest, "elapsed_us")?),
            "failed" => report.failure = Some(parse_failure(line, rest)?),
            "poly" if !rest.is_empty() => report.polynomials.push(ParsedPolynomial {
                name: rest.to_string(),
                coeffs: Vec::new(),
            }),
            "end" => return Ok(report),
            _ => {
                let poly = report
                    .polynomials
                    .last_mut()
                    .ok_or_else(|| ReportParseError::Unexpected {
                        line,
                        text: text.to_string(),
                    })?;
                for token in text.split_whitespace() {
                    let value = token.parse().map_err(|_| ReportParseError::Coefficient {
                        line,
                        text: token.to_string(),
                    })?;
                    poly.coeffs.push(value);
                }
            }
        }
    }
    Err(ReportParseError::Truncated)
}

fn parse_timing(line: usize, rest: &str) -> Result<ParsedTiming, ReportParseError> {
    let (name, fields) = rest
        .split_once(' ')
        .ok_or(ReportParseError::Field { line, field: "name" })?;
    Ok(ParsedTiming {
        name: name.to_string(),
        nonce: field(line, fields, "nonce")?,
        width: field(line, fields, "eta")?,
        start_us: field(line, fields, "start_us")?,
        end_us: field(line, fields, "end_us")?,
        elapsed_us: field(line, fields, "elapsed_us")?,
    })
}

fn parse_failure(line: usize, rest: &str) -> Result<ParsedFailure, ReportParseError> {
    let (term, fields) = rest
        .split_once(' ')
        .ok_or(ReportParseError::Field { line, field: "term" })?;
    let error = fields
        .split_once("error=")
        .map(|(_, e)| e.to_string())
        .ok_or(ReportParseError::Field { line, field: "error" })?;
    Ok(ParsedFailure {
        term: term.to_string(),
        nonce: field(line, fields, "nonce").ok(),
        error,
    })
}

/// Value of `key=value` among space separated fields.
fn field<T: core::str::FromStr>(
    line: usize,
    fields: &str,
    key: &'static str,
) -> Result<T, ReportParseError> {
    fields
        .split_whitespace()
        .filter_map(|kv| kv.split_once('='))
        .find(|(k, _)| *k == key)
        .and_then(|(_, v)| v.parse().ok())
        .ok_or(ReportParseError::Field { line, field: key })
}

#[cfg(feature = "std")]
pub use self::io::IoWriter;

#[cfg(feature = "std")]
mod io {
    use core::fmt;

    /// Bridges [`std::io::Write`] sinks such as stdout to the emitter.
    pub struct IoWriter<W> {
        inner: W,
        error: Option<std::io::Error>,
    }

    impl<W: std::io::Write> IoWriter<W> {
        pub fn new(inner: W) -> Self {
            Self { inner, error: None }
        }

        /// The io error behind the last `fmt::Error`, if any.
        pub fn take_error(&mut self) -> Option<std::io::Error> {
            self.error.take()
        }

        pub fn flush(&mut self) -> std::io::Result<()> {
            self.inner.flush()
        }
    }

    impl<W: std::io::Write> fmt::Write for IoWriter<W> {
        fn write_str(&mut self, s: &str) -> fmt::Result {
            self.inner.write_all(s.as_bytes()).map_err(|err| {
                self.error = Some(err);
                fmt::Error
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ExpandError, HarnessError};
    use crate::params::N;
    use crate::poly::NoisePolynomial;
    use crate::term::NoiseTermSpec;
    use crate::timing::{PipelineTiming, TimingSample};

    fn result(name: &'static str, nonce: u8, start: u64) -> TermResult {
        let mut coeffs = [0i16; N];
        for (i, c) in coeffs.iter_mut().enumerate() {
            *c = (i % 5) as i16 - 2;
        }
        TermResult {
            spec: NoiseTermSpec::new(name, nonce, 2),
            polynomial: NoisePolynomial::from_coeffs(coeffs),
            timing: TimingSample {
                term_name: name,
                start_us: start,
                end_us: start + 4,
                elapsed_us: 4,
            },
        }
    }

    fn sample_run() -> NoiseRun {
        let results = alloc::vec![result("s", 0, 10), result("e", 1, 20)];
        let total = PipelineTiming::spanning(&results[0].timing, &results[1].timing);
        NoiseRun { results, total }
    }

    #[test]
    fn test_report_layout() {
        let seed = Seed::from_bytes([0u8; 32]);
        let text = render(&seed, &Ok(sample_run()), 16).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "0".repeat(64));
        assert_eq!(lines[1], "timing s nonce=0 eta=2 start_us=10 end_us=14 elapsed_us=4");
        assert_eq!(lines[2], "timing e nonce=1 eta=2 start_us=20 end_us=24 elapsed_us=4");
        assert_eq!(lines[3], "total elapsed_us=14");
        assert_eq!(lines[4], "poly s");
        assert_eq!(lines[5], "-2 -1 0 1 2 -2 -1 0 1 2 -2 -1 0 1 2 -2");
        // seed, 2 timings, total, 2 * (header + 16 rows), end
        assert_eq!(lines.len(), 1 + 2 + 1 + 2 * 17 + 1);
        assert_eq!(*lines.last().unwrap(), "end");
    }

    #[test]
    fn test_row_width_respected() {
        let seed = Seed::from_bytes([0u8; 32]);
        let text = render(&seed, &Ok(sample_run()), 10).unwrap();
        let rows: Vec<&str> = text
            .lines()
            .skip_while(|l| *l != "poly s")
            .skip(1)
            .take_while(|l| !l.starts_with("poly"))
            .collect();
        assert_eq!(rows.len(), 26);
        assert!(rows[..25].iter().all(|r| r.split(' ').count() == 10));
        assert_eq!(rows[25].split(' ').count(), 6);
    }

    #[test]
    fn test_zero_row_width_rejected() {
        assert!(ReportEmitter::new(String::new(), 0).is_err());
    }

    #[test]
    fn test_failure_report() {
        let seed = Seed::from_bytes([0xAB; 32]);
        let failure = RunFailure {
            completed: alloc::vec![result("s", 0, 0), result("e", 1, 8)],
            failed: Some(NoiseTermSpec::new("r", 2, 2)),
            error: HarnessError::Expansion {
                term: "r",
                source: ExpandError { nonce: 2 },
            },
        };
        let text = render(&seed, &Err(failure), 16).unwrap();

        assert!(text.contains("\nfailed r nonce=2 error=term r: expansion failure"));
        assert!(!text.contains("total"));
        assert!(!text.contains("poly r"));
        assert!(text.contains("poly e"));

        let parsed = parse_report(&text).unwrap();
        let failure = parsed.failure.unwrap();
        assert_eq!(failure.term, "r");
        assert_eq!(failure.nonce, Some(2));
        assert_eq!(parsed.polynomials.len(), 2);
    }

    #[test]
    fn test_parse_recovers_values() {
        let seed = Seed::from_bytes([0x11; 32]);
        let run = sample_run();
        let text = render(&seed, &Ok(run.clone()), 16).unwrap();
        let parsed = parse_report(&text).unwrap();

        assert_eq!(parsed.seed, seed);
        assert_eq!(parsed.total_us, Some(14));
        assert_eq!(parsed.timings[1].name, "e");
        assert_eq!(parsed.timings[1].start_us, 20);
        let poly = parsed.polynomial("s").unwrap();
        assert_eq!(poly.coeffs[..], run.results[0].polynomial.coeffs()[..]);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_report(""), Err(ReportParseError::Empty));
        assert!(matches!(
            parse_report("nothex\nend"),
            Err(ReportParseError::Seed { line: 1, .. })
        ));
        let seed = "0".repeat(64);
        assert_eq!(
            parse_report(&alloc::format!("{}\n1 2 3\nend", seed)),
            Err(ReportParseError::Unexpected {
                line: 2,
                text: "1 2 3".to_string()
            })
        );
        assert_eq!(
            parse_report(&alloc::format!("{}\ntotal elapsed_us=5", seed)),
            Err(ReportParseError::Truncated)
        );
        assert_eq!(
            parse_report(&alloc::format!("{}\ntotal elapsed=5\nend", seed)),
            Err(ReportParseError::Field {
                line: 2,
                field: "elapsed_us"
            })
        );
    }
}
