//! Per-scan state and comparison logic
//!
//! A [`ScanContext`] is built from [`ScanOptions`], validated once by
//! [`ScanContext::setup`], and then either fed freshly read blocks (first
//! scans) or asked to re-test known results (next scans).
//!
//! Chunks are read with `overlap = max(width - alignment, 0)` extra bytes so
//! values straddling a chunk boundary are visible in one read. A candidate at
//! `offset` in a buffer of nominal length `len` is only tested when
//! `len - (overlap - width) - offset > width`; anything further right lies
//! wholly in the overlap and belongs to the next chunk.

use super::compare::{self, FloatQuery, IntQuery, HISTORY_DECIMALS};
use super::expression::{Expression, ValueEvaluator};
use super::options::ScanOptions;
use crate::config::{MAX_ALIGNMENT, MIN_CHUNK_SIZE};
use crate::core::types::{
    Address, CompareSource, ConnectionError, DataType, DataValue, FloatScanOption, InputError,
    NumericScanType, ScanRange, ScanResult, StringComparison, StringEncoding,
};
use crate::memory::connection::{self, Connection};
use crate::memory::encoding;
use crate::memory::pattern::MemoryPattern;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Whether a context drives a first scan or a next scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPass {
    First,
    Next,
}

/// Lifecycle of a context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Unconfigured,
    Ready,
    Scanning,
    Finished,
    Failed,
}

/// A value found by a first scan
#[derive(Debug, Clone, PartialEq)]
pub struct FoundValue {
    pub address: Address,
    pub data_type: DataType,
    pub value: DataValue,
}

#[derive(Debug, Clone, PartialEq)]
struct StringQuery {
    text: String,
    width: usize,
    encoding: StringEncoding,
    comparison: StringComparison,
}

impl StringQuery {
    fn new(text: &str, encoding: StringEncoding, comparison: StringComparison) -> Option<Self> {
        let width = encoding::encode(text, encoding)?.len();
        Some(StringQuery {
            text: text.to_string(),
            width,
            encoding,
            comparison,
        })
    }
}

/// Compiled comparison for one data type
#[derive(Clone)]
enum Matcher {
    Integer(DataType, IntQuery),
    Float(DataType, FloatQuery),
    String(StringQuery),
    Pattern(MemoryPattern),
    Evaluator(DataType, Arc<dyn ValueEvaluator>),
}

impl Matcher {
    fn data_type(&self) -> DataType {
        match self {
            Matcher::Integer(dt, _) | Matcher::Float(dt, _) | Matcher::Evaluator(dt, _) => *dt,
            Matcher::String(_) => DataType::String,
            Matcher::Pattern(_) => DataType::ByteArray,
        }
    }

    fn width(&self) -> usize {
        match self {
            Matcher::String(query) => query.width,
            Matcher::Pattern(pattern) => pattern.len(),
            other => other.data_type().size().unwrap_or(0),
        }
    }

    /// Tests `bytes`, which are exactly `width()` long
    fn test(
        &self,
        bytes: &[u8],
        little_endian: bool,
        unsigned: bool,
        history: Option<&ScanResult>,
    ) -> Option<DataValue> {
        match self {
            Matcher::Integer(dt, query) => compare::match_integer(*dt, bytes, little_endian, query),
            Matcher::Float(dt, query) => compare::match_float(*dt, bytes, little_endian, query),
            Matcher::String(query) => {
                let decoded = encoding::decode(bytes, query.encoding)?;
                encoding::equals(&decoded, &query.text, query.comparison)
                    .then_some(DataValue::String(decoded))
            }
            Matcher::Pattern(pattern) => {
                pattern.matches(bytes).then(|| DataValue::ByteArray(bytes.to_vec()))
            }
            Matcher::Evaluator(dt, evaluator) => {
                let value = DataValue::read_numeric(*dt, bytes, little_endian)?;
                let v = compare::to_number(&value, unsigned)?;
                let first = history.and_then(|r| compare::to_number(&r.first, unsigned));
                let previous = history.and_then(|r| compare::to_number(&r.previous, unsigned));
                evaluator.evaluate(v, first, previous).then_some(value)
            }
        }
    }
}

enum Query {
    Single(Matcher),
    AnyType(Vec<Matcher>),
    /// Next scans comparing each result against its own recorded value
    History(CompareSource),
}

struct Compiled {
    range: ScanRange,
    alignment: u32,
    width: usize,
    overlap: usize,
    little_endian: bool,
    query: Query,
}

/// State of one scan invocation
pub struct ScanContext {
    options: ScanOptions,
    pass: ScanPass,
    state: ContextState,
    evaluator: Option<Arc<dyn ValueEvaluator>>,
    compiled: Option<Compiled>,
    last_error: Option<ConnectionError>,
}

impl fmt::Debug for ScanContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanContext")
            .field("pass", &self.pass)
            .field("state", &self.state)
            .field("data_type", &self.options.data_type)
            .field("scan_type", &self.options.scan_type)
            .field("last_error", &self.last_error)
            .finish_non_exhaustive()
    }
}

impl ScanContext {
    pub fn new(options: ScanOptions, pass: ScanPass) -> Self {
        ScanContext {
            options,
            pass,
            state: ContextState::Unconfigured,
            evaluator: None,
            compiled: None,
            last_error: None,
        }
    }

    /// Uses `evaluator` instead of a literal comparison or expression text
    pub fn with_evaluator(mut self, evaluator: Arc<dyn ValueEvaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    /// Parses and validates the inputs.
    ///
    /// On error the context is left exactly as it was.
    pub fn setup(&mut self, conn: &dyn Connection) -> Result<(), InputError> {
        let compiled = self.compile(conn.is_little_endian())?;
        debug!(
            pass = ?self.pass,
            data_type = %self.options.data_type,
            width = compiled.width,
            alignment = compiled.alignment,
            overlap = compiled.overlap,
            "scan context ready"
        );
        self.compiled = Some(compiled);
        self.state = ContextState::Ready;
        self.last_error = None;
        Ok(())
    }

    fn compile(&self, little_endian: bool) -> Result<Compiled, InputError> {
        let options = &self.options;

        let range = if self.pass == ScanPass::First {
            ScanRange::new(options.start_address, options.length)
                .map_err(|e| InputError::InvalidRange(e.to_string()))?
        } else {
            ScanRange::new(Address::null(), 0).map_err(|e| InputError::InvalidRange(e.to_string()))?
        };

        let query = self.compile_query()?;
        let width = match &query {
            Query::Single(matcher) => matcher.width(),
            Query::AnyType(matchers) => matchers.iter().map(Matcher::width).max().unwrap_or(0),
            Query::History(_) => options.data_type.size().unwrap_or(0),
        };

        let default_alignment = match &query {
            Query::AnyType(_) => 1,
            _ if options.data_type.is_numeric() => width as u32,
            _ => 1,
        };
        let alignment = options.alignment.unwrap_or(default_alignment);
        if alignment == 0 || alignment > MAX_ALIGNMENT {
            return Err(InputError::InvalidAlignment {
                value: alignment,
                max: MAX_ALIGNMENT,
            });
        }

        let chunk_size = options.chunk_size;
        if chunk_size < MIN_CHUNK_SIZE || chunk_size > u32::MAX as usize || chunk_size % alignment as usize != 0 {
            return Err(InputError::InvalidChunkSize {
                chunk_size,
                alignment,
            });
        }

        Ok(Compiled {
            range,
            alignment,
            width,
            overlap: width.saturating_sub(alignment as usize),
            little_endian,
            query,
        })
    }

    fn compile_query(&self) -> Result<Query, InputError> {
        let options = &self.options;

        if let Some(evaluator) = &self.evaluator {
            self.check_expression_allowed()?;
            return Ok(Query::Single(Matcher::Evaluator(options.data_type, Arc::clone(evaluator))));
        }

        if let Some(text) = &options.expression {
            self.check_expression_allowed()?;
            let expression = Expression::compile(text, self.pass == ScanPass::Next, options.hex_input)?;
            return Ok(Query::Single(Matcher::Evaluator(options.data_type, Arc::new(expression))));
        }

        if self.pass == ScanPass::Next && options.compare_source != CompareSource::Input {
            if options.scan_type.requires_second_input() {
                return Err(InputError::BoundsFromHistory(options.scan_type));
            }
            return Ok(Query::History(options.compare_source));
        }

        if let Some(any) = &options.any_type {
            let mut matchers = Vec::new();
            for data_type in any.candidates(&options.int_ordering) {
                let compiled = if data_type == DataType::String {
                    if options.scan_type != NumericScanType::Equals {
                        continue;
                    }
                    self.string_matcher()
                } else {
                    self.numeric_matcher(data_type)
                };

                match compiled {
                    Ok(matcher) => matchers.push(matcher),
                    Err(e @ InputError::ReversedBounds { .. }) => return Err(e),
                    Err(e) => debug!(%data_type, error = %e, "type disabled for this input"),
                }
            }

            if matchers.is_empty() {
                return Err(InputError::NoCandidateType(options.input_a.trim().to_string()));
            }
            return Ok(Query::AnyType(matchers));
        }

        let matcher = match options.data_type {
            DataType::String => self.string_matcher()?,
            DataType::ByteArray => {
                if options.input_a.trim().is_empty() {
                    return Err(InputError::Empty { field: "Input A" });
                }
                Matcher::Pattern(MemoryPattern::compile(&options.input_a, options.chunk_size)?)
            }
            numeric => self.numeric_matcher(numeric)?,
        };
        Ok(Query::Single(matcher))
    }

    fn check_expression_allowed(&self) -> Result<(), InputError> {
        if self.options.any_type.is_some() {
            return Err(InputError::InvalidExpression(
                "expressions cannot be combined with any-type scans".to_string(),
            ));
        }
        if !self.options.data_type.is_numeric() {
            return Err(InputError::ExpressionUnsupported(self.options.data_type));
        }
        Ok(())
    }

    fn numeric_matcher(&self, data_type: DataType) -> Result<Matcher, InputError> {
        let options = &self.options;
        let (hex, unsigned) = (options.hex_input, options.unsigned_integers);
        let second = options.scan_type.requires_second_input();

        let a = compare::parse_numeric("Input A", &options.input_a, data_type, hex, unsigned)?;
        let b = if second {
            let b = compare::parse_numeric("Input B", &options.input_b, data_type, hex, unsigned)?;
            if compare::is_reversed(data_type, unsigned, a, b) {
                return Err(InputError::reversed_bounds(options.input_a.trim(), options.input_b.trim()));
            }
            b
        } else {
            a
        };

        if data_type.is_integer() {
            return Ok(Matcher::Integer(
                data_type,
                IntQuery {
                    scan_type: options.scan_type,
                    a: a.int_bits(),
                    b: b.int_bits(),
                    unsigned,
                },
            ));
        }

        // Raw bit patterns have no decimal text to match precision against
        let (option, decimals) = if hex {
            (FloatScanOption::ExactValue, 0)
        } else if second {
            let decimals = compare::decimal_places(&options.input_a).max(compare::decimal_places(&options.input_b));
            (options.float_option, decimals)
        } else {
            (options.float_option, compare::decimal_places(&options.input_a))
        };

        Ok(Matcher::Float(
            data_type,
            FloatQuery {
                scan_type: options.scan_type,
                a: a.float(),
                b: b.float(),
                option,
                decimals,
                epsilon: options.float_epsilon,
            },
        ))
    }

    fn string_matcher(&self) -> Result<Matcher, InputError> {
        let options = &self.options;
        let text = options.input_a.as_str();
        if text.is_empty() {
            return Err(InputError::Empty { field: "Input A" });
        }

        let query = StringQuery::new(text, options.string_encoding, options.string_comparison)
            .ok_or_else(|| InputError::unparseable("Input A", text, DataType::String))?;
        if query.width > options.chunk_size {
            return Err(InputError::too_long("Input A", query.width, options.chunk_size));
        }
        Ok(Matcher::String(query))
    }

    fn compiled(&self) -> &Compiled {
        match &self.compiled {
            Some(compiled) => compiled,
            None => panic!("scan context used before setup"),
        }
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    pub fn pass(&self) -> ScanPass {
        self.pass
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.compiled.is_some()
    }

    /// Scan range validated by setup
    pub fn range(&self) -> ScanRange {
        self.compiled().range
    }

    pub fn alignment(&self) -> u32 {
        self.compiled().alignment
    }

    /// Widest element any enabled type can occupy
    pub fn element_width(&self) -> usize {
        self.compiled().width
    }

    /// Extra bytes read past each chunk
    pub fn overlap(&self) -> usize {
        self.compiled().overlap
    }

    pub fn chunk_size(&self) -> usize {
        self.options.chunk_size
    }

    /// Types this context can report, in the order they are tried
    pub fn data_types(&self) -> Vec<DataType> {
        match &self.compiled().query {
            Query::Single(matcher) => vec![matcher.data_type()],
            Query::AnyType(matchers) => matchers.iter().map(Matcher::data_type).collect(),
            Query::History(_) => vec![self.options.data_type],
        }
    }

    /// Connection error that ended the scan, if any
    pub fn last_error(&self) -> Option<&ConnectionError> {
        self.last_error.as_ref()
    }

    pub(crate) fn record_error(&mut self, error: ConnectionError) {
        self.last_error = Some(error);
    }

    pub(crate) fn set_state(&mut self, state: ContextState) {
        self.state = state;
    }

    /// Matches in a buffer of `chunkSize + overlap` bytes read at `base`
    pub fn process_block<'a>(&'a self, base: Address, block: &'a [u8]) -> BlockMatches<'a> {
        let nominal_len = block.len();
        self.block_matches(base, block, nominal_len)
    }

    /// Matches in a chunk whose logical length is `chunk_len`.
    ///
    /// `block` holds the chunk plus whatever overlap could be read, which is
    /// less than the full overlap when the read was clipped at the end of a
    /// region.
    pub fn process_chunk<'a>(&'a self, base: Address, block: &'a [u8], chunk_len: usize) -> BlockMatches<'a> {
        let nominal_len = chunk_len + self.overlap();
        self.block_matches(base, block, nominal_len)
    }

    fn block_matches<'a>(&'a self, base: Address, block: &'a [u8], nominal_len: usize) -> BlockMatches<'a> {
        let compiled = self.compiled();
        let matchers: &[Matcher] = match &compiled.query {
            Query::Single(matcher) => std::slice::from_ref(matcher),
            Query::AnyType(matchers) => matchers,
            Query::History(_) => panic!("history comparisons only apply to next scans"),
        };

        BlockMatches {
            matchers,
            base,
            block,
            nominal_len: nominal_len as isize,
            overlap: compiled.overlap as isize,
            alignment: compiled.alignment as usize,
            little_endian: compiled.little_endian,
            unsigned: self.options.unsigned_integers,
            offset: 0,
        }
    }

    /// Fails when `results` hold a type this context cannot re-test
    pub fn check_results(&self, results: &[ScanResult]) -> Result<(), InputError> {
        let compiled = self.compiled();
        let mismatch = results.iter().find(|r| match &compiled.query {
            Query::AnyType(matchers) => !matchers.iter().any(|m| m.data_type() == r.data_type),
            Query::History(_) if self.options.any_type.is_some() => r.data_type == DataType::ByteArray,
            _ => r.data_type != self.options.data_type,
        });

        match mismatch {
            Some(result) => Err(InputError::DataTypeMismatch {
                expected: self.options.data_type,
                found: result.data_type,
            }),
            None => Ok(()),
        }
    }

    fn next_matcher(&self, result: &ScanResult) -> Option<Cow<'_, Matcher>> {
        match &self.compiled().query {
            Query::Single(matcher) => Some(Cow::Borrowed(matcher)),
            Query::AnyType(matchers) => matchers
                .iter()
                .find(|m| m.data_type() == result.data_type)
                .map(Cow::Borrowed),
            Query::History(source) => self.history_matcher(result, *source).map(Cow::Owned),
        }
    }

    fn history_matcher(&self, result: &ScanResult, source: CompareSource) -> Option<Matcher> {
        let options = &self.options;
        let stored = match source {
            CompareSource::FirstValue => &result.first,
            _ => &result.previous,
        };

        let matcher = match stored {
            DataValue::Float(_) | DataValue::Double(_) => Matcher::Float(
                stored.data_type(),
                FloatQuery {
                    scan_type: options.scan_type,
                    a: stored.as_f64()?,
                    b: 0.0,
                    option: options.float_option,
                    decimals: HISTORY_DECIMALS,
                    epsilon: options.float_epsilon,
                },
            ),
            DataValue::String(text) => {
                Matcher::String(StringQuery::new(text, options.string_encoding, options.string_comparison)?)
            }
            DataValue::ByteArray(bytes) => Matcher::Pattern(MemoryPattern::exact(bytes)),
            integer => Matcher::Integer(
                integer.data_type(),
                IntQuery {
                    scan_type: options.scan_type,
                    a: integer.integer_bits()?,
                    b: 0,
                    unsigned: options.unsigned_integers,
                },
            ),
        };
        Some(matcher)
    }

    /// Re-reads `result.address` and re-applies the comparison.
    ///
    /// Issues exactly one read, zero-filling anything the target did not
    /// return. `Ok(None)` means the result no longer matches.
    pub async fn process_address(
        &self,
        conn: &dyn Connection,
        result: &ScanResult,
    ) -> Result<Option<DataValue>, ConnectionError> {
        let Some(matcher) = self.next_matcher(result) else {
            return Ok(None);
        };

        let width = matcher.width();
        let bytes = connection::read_zero_filled(conn, result.address, width).await?;
        let compiled = self.compiled();
        Ok(matcher.test(&bytes, compiled.little_endian, self.options.unsigned_integers, Some(result)))
    }
}

/// Iterator over the matches in one block
pub struct BlockMatches<'a> {
    matchers: &'a [Matcher],
    base: Address,
    block: &'a [u8],
    nominal_len: isize,
    overlap: isize,
    alignment: usize,
    little_endian: bool,
    unsigned: bool,
    offset: usize,
}

impl Iterator for BlockMatches<'_> {
    type Item = FoundValue;

    fn next(&mut self) -> Option<FoundValue> {
        while self.offset < self.block.len() {
            let offset = self.offset;
            self.offset += self.alignment;

            // past this point every candidate lies wholly in the overlap
            if self.nominal_len - self.overlap - offset as isize <= 0 {
                self.offset = self.block.len();
                break;
            }

            for matcher in self.matchers {
                let width = matcher.width();
                let w = width as isize;
                if self.nominal_len - (self.overlap - w) - offset as isize <= w
                    || offset + width > self.block.len()
                {
                    continue;
                }

                let bytes = &self.block[offset..offset + width];
                if let Some(value) = matcher.test(bytes, self.little_endian, self.unsigned, None) {
                    return Some(FoundValue {
                        address: self.base.add(offset as u32),
                        data_type: matcher.data_type(),
                        value,
                    });
                }
            }
        }
        None
    }
}
