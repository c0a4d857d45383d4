//! Parameter normalization into a canonical request spec

use serde_json::Value;

use crate::error::ValidationError;

pub const DEFAULT_DIMENSION: i64 = 1024;
pub const DEFAULT_STEPS: i64 = 3;
pub const DEFAULT_COUNT: i64 = 1;

const DIMENSION_STEP: i64 = 16;
const MAX_DIMENSION: i64 = (u32::MAX as i64) & !(DIMENSION_STEP - 1);
const MIN_STEPS: i64 = 1;
const MAX_STEPS: i64 = 4;
const MIN_COUNT: i64 = 1;
const MAX_COUNT: i64 = 4;

/// Raw caller fields; any of them may be absent or malformed
#[derive(Debug, Clone, Default)]
pub struct GenerateParams {
    pub prompt: Option<Value>,
    pub width: Option<Value>,
    pub height: Option<Value>,
    pub steps: Option<Value>,
    pub count: Option<Value>,
}

impl GenerateParams {
    /// Params with just a prompt, everything else defaulted
    pub fn prompt(prompt: impl Into<String>) -> Self {
        Self {
            prompt: Some(Value::String(prompt.into())),
            ..Default::default()
        }
    }
}

/// Validated, clamped, rounded parameters sent upstream.
///
/// Only [`normalize`] constructs this, so every instance holds a non-empty
/// trimmed prompt, dimensions that are multiples of 16 and at least 16, and
/// steps/count within `[1, 4]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSpec {
    prompt: String,
    width: u32,
    height: u32,
    steps: u32,
    count: u32,
}

impl RequestSpec {
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn steps(&self) -> u32 {
        self.steps
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}

/// Build a [`RequestSpec`] from raw caller fields
pub fn normalize(params: &GenerateParams) -> Result<RequestSpec, ValidationError> {
    let prompt = params
        .prompt
        .as_ref()
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or(ValidationError::EmptyPrompt)?;

    Ok(RequestSpec {
        prompt: prompt.to_string(),
        width: round_dimension(parse_or(params.width.as_ref(), DEFAULT_DIMENSION)),
        height: round_dimension(parse_or(params.height.as_ref(), DEFAULT_DIMENSION)),
        steps: clamp(parse_or(params.steps.as_ref(), DEFAULT_STEPS), MIN_STEPS, MAX_STEPS),
        count: clamp(parse_or(params.count.as_ref(), DEFAULT_COUNT), MIN_COUNT, MAX_COUNT),
    })
}

/// Nearest multiple of 16 (halves round up), never below 16
pub fn round_dimension(x: i64) -> u32 {
    let rounded = x
        .saturating_add(DIMENSION_STEP / 2)
        .div_euclid(DIMENSION_STEP)
        .saturating_mul(DIMENSION_STEP);
    rounded.clamp(DIMENSION_STEP, MAX_DIMENSION) as u32
}

fn clamp(x: i64, min: i64, max: i64) -> u32 {
    x.clamp(min, max) as u32
}

/// Parsed integer, or `default` when absent, unparsable, or zero
fn parse_or(value: Option<&Value>, default: i64) -> i64 {
    match value.and_then(parse_int) {
        Some(0) | None => default,
        Some(n) => n,
    }
}

/// Lenient integer parse: integers as-is, floats truncated, strings by
/// their leading sign and digits.
fn parse_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => parse_leading_int(s),
        _ => None,
    }
}

fn parse_leading_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first().copied()? {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }

    let magnitude = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}
