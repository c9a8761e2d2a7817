//! Reader for the OR-Library `thpack` container loading benchmarks.
//!
//! Every case in a benchmark file is laid out as:
//!
//! ```text
//! <case id>
//! <n> <total units> <packed units reported for EB-AFIT>
//! <container x> <container y> <container z>
//! <number of item types>
//! <type> <x> <flag> <y> <flag> <z> <flag> <quantity>     (once per type)
//! ```
//!
//! Items carry no weight in this corpus.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;

use crate::geometry::{PlacementViolation, verify_packing};
use crate::model::{Container, ItemType, ValidationError};
use crate::optimizer::{PackingConfig, pack_with_config};
use crate::types::Vec3;

#[derive(Debug, Error)]
pub enum OrLibError {
    #[error("line {line}: unexpected end of input, expected {expected}")]
    UnexpectedEof { line: usize, expected: &'static str },
    #[error("line {line}: missing field {index} ({what})")]
    MissingField {
        line: usize,
        index: usize,
        what: &'static str,
    },
    #[error("line {line}: could not parse '{value}' as {what}")]
    InvalidNumber {
        line: usize,
        value: String,
        what: &'static str,
    },
    #[error("line {line}: {source}")]
    InvalidData {
        line: usize,
        #[source]
        source: ValidationError,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Unit counts published for a case.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReferenceResult {
    pub total_units: u32,
    pub packed_units: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BenchmarkCase {
    pub id: String,
    pub reference: ReferenceResult,
    pub container: Container,
    pub items: Vec<ItemType>,
}

/// Outcome of running one case.
#[derive(Clone, Debug)]
pub struct CaseReport {
    pub id: String,
    pub packed: usize,
    pub unpacked: usize,
    pub utilization_percent: f64,
    pub reference: ReferenceResult,
    pub violation: Option<PlacementViolation>,
}

impl CaseReport {
    /// Packed plus unpacked units equals the published total.
    pub fn total_matches(&self) -> bool {
        (self.packed + self.unpacked) as u64 == u64::from(self.reference.total_units)
    }

    /// Packed units equal the published EB-AFIT result.
    pub fn packed_matches(&self) -> bool {
        self.packed as u64 == u64::from(self.reference.packed_units)
    }
}

/// Non-empty lines with their 1-based line numbers.
struct Lines<'a> {
    inner: Box<dyn Iterator<Item = (usize, &'a str)> + 'a>,
    last_line: usize,
}

impl<'a> Lines<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            inner: Box::new(
                input
                    .lines()
                    .enumerate()
                    .map(|(index, line)| (index + 1, line.trim()))
                    .filter(|(_, line)| !line.is_empty()),
            ),
            last_line: 0,
        }
    }

    fn next_line(&mut self) -> Option<(usize, &'a str)> {
        let next = self.inner.next();
        if let Some((line, _)) = next {
            self.last_line = line;
        }
        next
    }

    fn require(&mut self, expected: &'static str) -> Result<(usize, &'a str), OrLibError> {
        self.next_line().ok_or(OrLibError::UnexpectedEof {
            line: self.last_line + 1,
            expected,
        })
    }
}

fn field<T: FromStr>(
    tokens: &[&str],
    line: usize,
    index: usize,
    what: &'static str,
) -> Result<T, OrLibError> {
    let raw = tokens
        .get(index)
        .ok_or(OrLibError::MissingField { line, index, what })?;
    raw.parse().map_err(|_| OrLibError::InvalidNumber {
        line,
        value: (*raw).to_string(),
        what,
    })
}

/// Parses every case of a benchmark file.
pub fn parse_cases(input: &str) -> Result<Vec<BenchmarkCase>, OrLibError> {
    let mut lines = Lines::new(input);
    let mut cases = Vec::new();

    while let Some((_, id)) = lines.next_line() {
        let (line, reference) = lines.require("reference result line")?;
        let tokens: Vec<&str> = reference.split_whitespace().collect();
        let reference = ReferenceResult {
            total_units: field(&tokens, line, 1, "total units")?,
            packed_units: field(&tokens, line, 2, "packed units")?,
        };

        let (line, dims) = lines.require("container dimensions")?;
        let tokens: Vec<&str> = dims.split_whitespace().collect();
        let dims = (
            field(&tokens, line, 0, "container x")?,
            field(&tokens, line, 1, "container y")?,
            field(&tokens, line, 2, "container z")?,
        );
        let container = Container::new(id, dims, 0.0)
            .map_err(|source| OrLibError::InvalidData { line, source })?;

        let (line, count) = lines.require("item type count")?;
        let count: usize = field(&[count], line, 0, "item type count")?;

        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            let (line, raw) = lines.require("item type line")?;
            let tokens: Vec<&str> = raw.split_whitespace().collect();
            let dims = Vec3::new(
                field(&tokens, line, 1, "item x")?,
                field(&tokens, line, 3, "item y")?,
                field(&tokens, line, 5, "item z")?,
            );
            let quantity = field(&tokens, line, 7, "quantity")?;
            let item = ItemType::new(dims.to_string(), dims.as_tuple(), quantity, 0.0)
                .map_err(|source| OrLibError::InvalidData { line, source })?;
            items.push(item);
        }

        cases.push(BenchmarkCase {
            id: id.to_string(),
            reference,
            container,
            items,
        });
    }

    Ok(cases)
}

/// Reads and parses a benchmark file.
pub fn load_cases(path: impl AsRef<Path>) -> Result<Vec<BenchmarkCase>, OrLibError> {
    let input = fs::read_to_string(path)?;
    parse_cases(&input)
}

/// Packs one case and checks the result.
pub fn run_case(case: &BenchmarkCase, config: PackingConfig) -> CaseReport {
    let result = pack_with_config(&case.container, &case.items, config);
    CaseReport {
        id: case.id.clone(),
        packed: result.packed_count(),
        unpacked: result.unpacked_count(),
        utilization_percent: result.utilization_percent(),
        reference: case.reference,
        violation: verify_packing(&result, config.epsilon).err(),
    }
}
