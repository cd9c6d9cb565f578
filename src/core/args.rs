//! Log arguments and their rendering
//!
//! A log call takes a heterogeneous list of [`Arg`]s. When the first one is a
//! text containing printf-style conversions (`%d`, `%v`, ...) and more
//! arguments follow, the list is rendered through that format; arguments the
//! format has no conversion for get an appended `, %v` so none is dropped.
//! Otherwise every argument is rendered on its own and joined with `,`.

use chrono::{DateTime, TimeZone};
use std::fmt::{self, Debug, Display, Write as _};
use std::sync::Arc;

/// Reference layout used for timestamps, `Mon Jan 2 15:04:05 -0700 MST 2006`.
///
/// chrono renders `%Z` as the zone name only for `Utc`. `Local` and
/// `FixedOffset` values print the offset again there, e.g. `+03:00`, not an
/// abbreviation like `MST`.
pub const TIMESTAMP_LAYOUT: &str = "%a %b %-d %H:%M:%S %z %Z %Y";

const ERROR_PREFIX: &str = "ERROR:";

/// Widths and precisions above this are rejected with `%!(BADWIDTH)` and
/// `%!(BADPREC)`.
const MAX_FIELD: usize = 1_000_000;

/// A value that knows how to render itself into a log line.
pub trait LogRender: Send + Sync {
    fn render_into(&self, buf: &mut String);
}

/// Scalars and anything else without a dedicated rendering rule.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Uint(u64),
    Float(f64),
    Bool(bool),
    Char(char),
    /// Pre-rendered `{:?}` representation
    Debug(String),
}

/// One argument of a log call.
#[derive(Clone)]
pub enum Arg {
    /// Absent value
    Nil,
    Text(String),
    /// Joined with newlines
    Lines(Vec<String>),
    Custom(Arc<dyn LogRender>),
    /// Already rendered with [`TIMESTAMP_LAYOUT`]
    Timestamp(String),
    /// Message of an error value
    Error(String),
    /// A nested argument list, flattened one level
    Nested(Vec<Arg>),
    Other(Value),
    /// Leading marker: when `true` the line is emitted undecorated
    RawPrint(bool),
}

impl Arg {
    pub fn error<E: std::error::Error + ?Sized>(err: &E) -> Self {
        Arg::Error(err.to_string())
    }

    pub fn debug<T: Debug + ?Sized>(value: &T) -> Self {
        Arg::Other(Value::Debug(format!("{:?}", value)))
    }

    pub fn custom<R: LogRender + 'static>(render: R) -> Self {
        Arg::Custom(Arc::new(render))
    }

    pub fn timestamp<Tz: TimeZone>(time: &DateTime<Tz>) -> Self
    where
        Tz::Offset: Display,
    {
        Arg::Timestamp(time.format(TIMESTAMP_LAYOUT).to_string())
    }

    pub fn nested(args: impl IntoIterator<Item = Arg>) -> Self {
        Arg::Nested(args.into_iter().collect())
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Arg::Nil)
    }
}

impl Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Nil => f.write_str("Nil"),
            Arg::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Arg::Lines(lines) => f.debug_tuple("Lines").field(lines).finish(),
            Arg::Custom(_) => f.write_str("Custom(..)"),
            Arg::Timestamp(s) => f.debug_tuple("Timestamp").field(s).finish(),
            Arg::Error(s) => f.debug_tuple("Error").field(s).finish(),
            Arg::Nested(args) => f.debug_tuple("Nested").field(args).finish(),
            Arg::Other(v) => f.debug_tuple("Other").field(v).finish(),
            Arg::RawPrint(raw) => f.debug_tuple("RawPrint").field(raw).finish(),
        }
    }
}

impl From<&str> for Arg {
    fn from(s: &str) -> Self {
        Arg::Text(s.to_string())
    }
}

impl From<String> for Arg {
    fn from(s: String) -> Self {
        Arg::Text(s)
    }
}

impl From<&String> for Arg {
    fn from(s: &String) -> Self {
        Arg::Text(s.clone())
    }
}

impl From<Vec<String>> for Arg {
    fn from(lines: Vec<String>) -> Self {
        Arg::Lines(lines)
    }
}

impl From<Vec<&str>> for Arg {
    fn from(lines: Vec<&str>) -> Self {
        Arg::Lines(lines.into_iter().map(String::from).collect())
    }
}

impl From<Vec<Arg>> for Arg {
    fn from(args: Vec<Arg>) -> Self {
        Arg::Nested(args)
    }
}

impl From<Arc<dyn LogRender>> for Arg {
    fn from(render: Arc<dyn LogRender>) -> Self {
        Arg::Custom(render)
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for Arg
where
    Tz::Offset: Display,
{
    fn from(time: DateTime<Tz>) -> Self {
        Arg::timestamp(&time)
    }
}

impl<T: Into<Arg>> From<Option<T>> for Arg {
    fn from(value: Option<T>) -> Self {
        value.map_or(Arg::Nil, Into::into)
    }
}

macro_rules! impl_from_scalar {
    ($variant:ident as $target:ty: $($t:ty),+) => {
        $(
            impl From<$t> for Arg {
                fn from(v: $t) -> Self {
                    Arg::Other(Value::$variant(v as $target))
                }
            }
        )+
    };
}

impl_from_scalar!(Int as i64: i8, i16, i32, i64, isize);
impl_from_scalar!(Uint as u64: u8, u16, u32, u64, usize);
impl_from_scalar!(Float as f64: f32, f64);

impl From<bool> for Arg {
    fn from(v: bool) -> Self {
        Arg::Other(Value::Bool(v))
    }
}

impl From<char> for Arg {
    fn from(v: char) -> Self {
        Arg::Other(Value::Char(v))
    }
}

/// Render a whole argument list into a fresh string.
pub fn render_args(args: &[Arg]) -> String {
    let mut buf = String::new();
    write_args(&mut buf, args);
    buf
}

/// Render `args` into `buf`, through the leading format string if any.
pub fn write_args(buf: &mut String, args: &[Arg]) {
    match format_string(args) {
        Some((format, _)) => sprintf(buf, &format, &args[1..]),
        None => join_args(buf, args),
    }
}

/// Render each argument and separate them with `,`.
pub fn join_args(buf: &mut String, args: &[Arg]) {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            buf.push(',');
        }
        write_arg(buf, arg);
    }
}

/// Render one argument by its category rule.
pub fn write_arg(buf: &mut String, arg: &Arg) {
    match arg {
        Arg::Nil => buf.push_str(" is nil"),
        Arg::Text(s) => buf.push_str(strip_error_prefix(s)),
        Arg::Lines(lines) => buf.push_str(&lines.join("\n")),
        Arg::Custom(render) => render.render_into(buf),
        Arg::Timestamp(s) => buf.push_str(s),
        Arg::Nested(args) => match args.as_slice() {
            [] => {}
            [single] => write_arg(buf, single),
            _ => write_args(buf, args),
        },
        Arg::Error(message) => buf.push_str(strip_error_prefix(message)),
        Arg::Other(value) => write_debug_value(buf, value),
        Arg::RawPrint(_) => {}
    }
}

pub fn strip_error_prefix(s: &str) -> &str {
    s.strip_prefix(ERROR_PREFIX).unwrap_or(s)
}

/// Detect a leading format string.
///
/// Returns the (padded) format and the number of conversions it had, or
/// `None` when the list should be joined instead.
pub fn format_string(args: &[Arg]) -> Option<(String, usize)> {
    if args.len() < 2 {
        return None;
    }

    let Arg::Text(format) = &args[0] else {
        return None;
    };

    let count = count_conversions(format);
    if count == 0 {
        return None;
    }

    let mut format = format.clone();
    let remaining = args.len() - 1;
    if count < remaining {
        format.push_str(&", %v".repeat(remaining - count));
    }

    Some((format, count))
}

/// Number of conversions in `format`, not counting `%%`.
pub fn count_conversions(format: &str) -> usize {
    parse_format(format)
        .iter()
        .filter(|piece| matches!(piece, Piece::Conversion(_)))
        .count()
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Flags {
    minus: bool,
    plus: bool,
    zero: bool,
    space: bool,
    sharp: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Conversion {
    flags: Flags,
    width: Option<usize>,
    precision: Option<usize>,
    bad_width: bool,
    bad_prec: bool,
    verb: char,
}

#[derive(Debug, PartialEq, Eq)]
enum Piece<'a> {
    Literal(&'a str),
    Percent,
    Conversion(Conversion),
}

fn parse_format(format: &str) -> Vec<Piece<'_>> {
    let mut pieces = Vec::new();
    let mut chars = format.char_indices().peekable();
    let mut literal_start = 0;

    while let Some((start, c)) = chars.next() {
        if c != '%' {
            continue;
        }
        if literal_start < start {
            pieces.push(Piece::Literal(&format[literal_start..start]));
        }

        let mut flags = Flags::default();
        while let Some(&(_, f)) = chars.peek() {
            match f {
                '-' => flags.minus = true,
                '+' => flags.plus = true,
                '0' => flags.zero = true,
                ' ' => flags.space = true,
                '#' => flags.sharp = true,
                _ => break,
            }
            chars.next();
        }

        let width = take_number(&mut chars);
        let precision = match chars.peek() {
            Some(&(_, '.')) => {
                chars.next();
                Some(take_number(&mut chars).unwrap_or(0))
            }
            _ => None,
        };
        let bad_width = width.is_some_and(|w| w > MAX_FIELD);
        let bad_prec = precision.is_some_and(|p| p > MAX_FIELD);

        match chars.next() {
            Some((_, '%')) if flags == Flags::default() && width.is_none() => {
                pieces.push(Piece::Percent);
            }
            Some((end, verb)) => {
                pieces.push(Piece::Conversion(Conversion {
                    flags,
                    width: width.filter(|_| !bad_width),
                    precision: precision.filter(|_| !bad_prec),
                    bad_width,
                    bad_prec,
                    verb,
                }));
                literal_start = end + verb.len_utf8();
                continue;
            }
            None => {
                // dangling '%' stays literal text
                pieces.push(Piece::Literal(&format[start..]));
                literal_start = format.len();
                continue;
            }
        }
        literal_start = chars.peek().map_or(format.len(), |&(i, _)| i);
    }

    if literal_start < format.len() {
        pieces.push(Piece::Literal(&format[literal_start..]));
    }
    pieces
}

fn take_number(chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>) -> Option<usize> {
    let mut number: Option<usize> = None;
    while let Some(&(_, d)) = chars.peek() {
        let Some(digit) = d.to_digit(10) else { break };
        number = Some(number.unwrap_or(0).saturating_mul(10).saturating_add(digit as usize));
        chars.next();
    }
    number
}

/// Positional substitution of `args` into `format`.
pub fn sprintf(buf: &mut String, format: &str, args: &[Arg]) {
    let mut args = args.iter();
    for piece in parse_format(format) {
        match piece {
            Piece::Literal(text) => buf.push_str(text),
            Piece::Percent => buf.push('%'),
            Piece::Conversion(conv) => match args.next() {
                Some(arg) => {
                    if conv.bad_width {
                        buf.push_str("%!(BADWIDTH)");
                    }
                    if conv.bad_prec {
                        buf.push_str("%!(BADPREC)");
                    }
                    write_conversion(buf, &conv, arg);
                }
                None => {
                    let _ = write!(buf, "%!{}(MISSING)", conv.verb);
                }
            },
        }
    }
}

fn write_conversion(buf: &mut String, conv: &Conversion, arg: &Arg) {
    let mut body = match (arg, conv.verb) {
        (Arg::Other(value), _) => format_value(conv, value),
        (_, 'q') => format!("{:?}", plain(arg)),
        (Arg::Text(s), 's' | 'v') => truncate(s, conv.precision).to_string(),
        _ => plain(arg),
    };

    if let Some(width) = conv.width {
        let len = body.chars().count();
        if len < width {
            let pad = width - len;
            if conv.flags.minus {
                body.push_str(&" ".repeat(pad));
            } else if conv.flags.zero && is_numeric(arg) {
                let split = usize::from(body.starts_with(['-', '+']));
                body.insert_str(split, &"0".repeat(pad));
            } else {
                body.insert_str(0, &" ".repeat(pad));
            }
        }
    }

    buf.push_str(&body);
}

fn is_numeric(arg: &Arg) -> bool {
    matches!(
        arg,
        Arg::Other(Value::Int(_) | Value::Uint(_) | Value::Float(_))
    )
}

fn truncate(s: &str, precision: Option<usize>) -> &str {
    match precision {
        Some(n) => s.char_indices().nth(n).map_or(s, |(i, _)| &s[..i]),
        None => s,
    }
}

fn format_value(conv: &Conversion, value: &Value) -> String {
    let sign = |negative: bool| match (negative, conv.flags.plus, conv.flags.space) {
        (true, _, _) => "-",
        (false, true, _) => "+",
        (false, false, true) => " ",
        _ => "",
    };

    match *value {
        Value::Int(i) => {
            let magnitude = i.unsigned_abs();
            format!("{}{}", sign(i < 0), format_unsigned(conv, magnitude))
        }
        Value::Uint(u) => format!("{}{}", sign(false), format_unsigned(conv, u)),
        Value::Float(f) => {
            let body = match conv.verb {
                'f' | 'F' => format!("{:.*}", conv.precision.unwrap_or(6), f.abs()),
                'e' | 'E' => {
                    let text = exponent(f.abs(), conv.precision.unwrap_or(6));
                    if conv.verb == 'E' {
                        text.to_uppercase()
                    } else {
                        text
                    }
                }
                _ => match conv.precision {
                    Some(p) => format!("{:.*}", p, f.abs()),
                    None => format!("{}", f.abs()),
                },
            };
            format!("{}{}", sign(f.is_sign_negative() && f != 0.0), body)
        }
        Value::Bool(b) => b.to_string(),
        Value::Char(c) => match conv.verb {
            'q' => format!("{:?}", c),
            'd' => (c as u32).to_string(),
            _ => c.to_string(),
        },
        Value::Debug(ref s) => s.clone(),
    }
}

fn format_unsigned(conv: &Conversion, n: u64) -> String {
    match conv.verb {
        'x' if conv.flags.sharp => format!("{:#x}", n),
        'x' => format!("{:x}", n),
        'X' if conv.flags.sharp => format!("0X{:X}", n),
        'X' => format!("{:X}", n),
        'o' if conv.flags.sharp => format!("0{:o}", n),
        'o' => format!("{:o}", n),
        'b' => format!("{:b}", n),
        'c' => u32::try_from(n)
            .ok()
            .and_then(char::from_u32)
            .map_or_else(|| char::REPLACEMENT_CHARACTER.to_string(), String::from),
        'f' | 'F' | 'e' | 'g' => {
            format!("{:.*}", conv.precision.unwrap_or(6), n as f64)
        }
        _ => n.to_string(),
    }
}

/// `1.500000e+00` style, two-digit signed exponent.
fn exponent(f: f64, precision: usize) -> String {
    let text = format!("{:.*e}", precision, f);
    match text.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{}e{}{:02}", mantissa, sign, exp.abs())
        }
        None => text,
    }
}

/// Rendering of an argument when substituted into a format.
fn plain(arg: &Arg) -> String {
    match arg {
        Arg::Nil => "<nil>".to_string(),
        Arg::Text(s) | Arg::Timestamp(s) | Arg::Error(s) => s.clone(),
        Arg::Lines(lines) => format!("[{}]", lines.join(" ")),
        Arg::Custom(render) => {
            let mut buf = String::new();
            render.render_into(&mut buf);
            buf
        }
        Arg::Nested(args) => {
            let parts: Vec<String> = args.iter().map(plain).collect();
            format!("[{}]", parts.join(" "))
        }
        Arg::Other(value) => match value {
            Value::Int(i) => i.to_string(),
            Value::Uint(u) => u.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Char(c) => c.to_string(),
            Value::Debug(s) => s.clone(),
        },
        Arg::RawPrint(raw) => raw.to_string(),
    }
}

fn write_debug_value(buf: &mut String, value: &Value) {
    let _ = match value {
        Value::Int(i) => write!(buf, "{}", i),
        Value::Uint(u) => write!(buf, "{}", u),
        Value::Float(f) => write!(buf, "{:?}", f),
        Value::Bool(b) => write!(buf, "{}", b),
        Value::Char(c) => write!(buf, "{:?}", c),
        Value::Debug(s) => {
            buf.push_str(s);
            Ok(())
        }
    };
}
