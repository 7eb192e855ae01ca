//! The primitive tree: literal Micheline structure before type-guided projection.
//!
//! Binary layout (one tag byte per node):
//!
//! | tag | node                                   |
//! |-----|----------------------------------------|
//! | 0   | int (signed zarith)                    |
//! | 1   | string (u32 length + utf8)             |
//! | 2   | sequence (u32 byte length + nodes)     |
//! | 3-8 | prim with 0/1/2 args, without/with annots |
//! | 9   | prim with argument sequence and annots |
//! | 10  | bytes (u32 length + raw)               |

use super::opcode::OpCode;
use crate::error::DecodeError;
use num_bigint::{BigInt, BigUint, Sign};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Deepest nesting accepted when decoding, inferring or projecting a tree.
/// Kept in line with serde_json's recursion limit so trees from either
/// encoding fit the same bound.
pub(crate) const MAX_DEPTH: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prim {
    Int(BigInt),
    String(String),
    Bytes(Vec<u8>),
    Seq(Vec<Prim>),
    App {
        op: OpCode,
        args: Vec<Prim>,
        annots: Vec<String>,
    },
}

impl Prim {
    pub fn app(op: OpCode, args: Vec<Prim>) -> Self {
        Prim::App {
            op,
            args,
            annots: Vec::new(),
        }
    }

    pub fn nullary(op: OpCode) -> Self {
        Self::app(op, Vec::new())
    }

    pub fn int(v: i64) -> Self {
        Prim::Int(BigInt::from(v))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Prim::String(s.into())
    }

    /// Add an annotation such as `%field` or `:type`.
    pub fn with_annot(mut self, annot: impl Into<String>) -> Self {
        if let Prim::App { annots, .. } = &mut self {
            annots.push(annot.into());
        }
        self
    }

    pub fn op_code(&self) -> Option<OpCode> {
        match self {
            Prim::App { op, .. } => Some(*op),
            _ => None,
        }
    }

    pub fn is(&self, code: OpCode) -> bool {
        self.op_code() == Some(code)
    }

    pub fn args(&self) -> &[Prim] {
        match self {
            Prim::App { args, .. } => args,
            Prim::Seq(items) => items,
            _ => &[],
        }
    }

    pub fn annots(&self) -> &[String] {
        match self {
            Prim::App { annots, .. } => annots,
            _ => &[],
        }
    }

    /// Field (`%name`) annotation, else type (`:name`) annotation, without sigil.
    pub fn label(&self) -> Option<&str> {
        let annots = self.annots();
        annots
            .iter()
            .find_map(|a| a.strip_prefix('%'))
            .or_else(|| annots.iter().find_map(|a| a.strip_prefix(':')))
            .filter(|s| !s.is_empty())
    }

    /// The reserved key used by big-map removals that drop the whole map.
    pub fn is_empty_bigmap(&self) -> bool {
        matches!(self, Prim::App { op, args, .. } if *op == OpCode::I_EMPTY_BIG_MAP && args.is_empty())
    }

    pub fn from_binary(data: &[u8]) -> Result<Prim, DecodeError> {
        let mut r = Reader::new(data);
        let prim = Prim::decode(&mut r)?;
        if !r.is_empty() {
            return Err(DecodeError::binary(
                r.position(),
                format!("{} trailing bytes", r.remaining()),
            ));
        }
        Ok(prim)
    }

    pub(crate) fn decode(r: &mut Reader<'_>) -> Result<Prim, DecodeError> {
        decode_node(r, 0)
    }

    pub fn to_binary(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode(&mut out);
        out
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        match self {
            Prim::Int(v) => {
                out.push(0);
                write_zarith(v, out);
            }
            Prim::String(s) => {
                out.push(1);
                write_bytes(s.as_bytes(), out);
            }
            Prim::Bytes(b) => {
                out.push(10);
                write_bytes(b, out);
            }
            Prim::Seq(items) => {
                out.push(2);
                write_seq(items, out);
            }
            Prim::App { op, args, annots } => {
                let has_annots = !annots.is_empty();
                match args.len() {
                    n @ 0..=2 => {
                        out.push(3 + 2 * n as u8 + has_annots as u8);
                        out.push(op.0);
                        for arg in args {
                            arg.encode(out);
                        }
                        if has_annots {
                            write_bytes(annots.join(" ").as_bytes(), out);
                        }
                    }
                    _ => {
                        out.push(9);
                        out.push(op.0);
                        write_seq(args, out);
                        write_bytes(annots.join(" ").as_bytes(), out);
                    }
                }
            }
        }
    }

    /// Micheline JSON representation.
    pub fn to_json(&self) -> Value {
        match self {
            Prim::Int(v) => json!({ "int": v.to_string() }),
            Prim::String(s) => json!({ "string": s }),
            Prim::Bytes(b) => json!({ "bytes": hex::encode(b) }),
            Prim::Seq(items) => Value::Array(items.iter().map(Prim::to_json).collect()),
            Prim::App { op, args, annots } => {
                let mut map = Map::new();
                map.insert("prim".to_string(), Value::String(op.to_string()));
                if !args.is_empty() {
                    map.insert(
                        "args".to_string(),
                        Value::Array(args.iter().map(Prim::to_json).collect()),
                    );
                }
                if !annots.is_empty() {
                    map.insert("annots".to_string(), json!(annots));
                }
                Value::Object(map)
            }
        }
    }

    pub fn from_json(value: &Value) -> Result<Prim, String> {
        match value {
            Value::Array(items) => items
                .iter()
                .map(Prim::from_json)
                .collect::<Result<Vec<_>, _>>()
                .map(Prim::Seq),
            Value::Object(map) => {
                if let Some(v) = map.get("int") {
                    let s = v.as_str().ok_or("int must be a string")?;
                    return s
                        .parse::<BigInt>()
                        .map(Prim::Int)
                        .map_err(|e| format!("invalid int '{s}': {e}"));
                }
                if let Some(v) = map.get("string") {
                    let s = v.as_str().ok_or("string must be a string")?;
                    return Ok(Prim::String(s.to_string()));
                }
                if let Some(v) = map.get("bytes") {
                    let s = v.as_str().ok_or("bytes must be a string")?;
                    return hex::decode(s)
                        .map(Prim::Bytes)
                        .map_err(|e| format!("invalid bytes '{s}': {e}"));
                }
                let name = map
                    .get("prim")
                    .and_then(Value::as_str)
                    .ok_or("expected int, string, bytes or prim")?;
                let op = OpCode::from_name(name).ok_or_else(|| format!("unknown prim '{name}'"))?;
                let args = match map.get("args") {
                    Some(Value::Array(items)) => items
                        .iter()
                        .map(Prim::from_json)
                        .collect::<Result<Vec<_>, _>>()?,
                    Some(Value::Null) | None => Vec::new(),
                    Some(_) => return Err("args must be an array".to_string()),
                };
                let annots = match map.get("annots") {
                    Some(Value::Array(items)) => items
                        .iter()
                        .map(|a| a.as_str().map(str::to_string).ok_or("annots must be strings"))
                        .collect::<Result<Vec<_>, _>>()?,
                    Some(Value::Null) | None => Vec::new(),
                    Some(_) => return Err("annots must be an array".to_string()),
                };
                Ok(Prim::App { op, args, annots })
            }
            other => Err(format!("unexpected micheline node {other}")),
        }
    }
}

impl Serialize for Prim {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Prim {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Prim::from_json(&value).map_err(serde::de::Error::custom)
    }
}

/// Cursor over a binary payload that reports offsets in its errors.
pub(crate) struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub(crate) fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < n {
            return Err(DecodeError::binary(
                self.pos,
                format!("need {} bytes, {} left", n, self.remaining()),
            ));
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub(crate) fn u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    pub(crate) fn u32_be(&mut self) -> Result<u32, DecodeError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub(crate) fn i64_be(&mut self) -> Result<i64, DecodeError> {
        let b = self.take(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(b);
        Ok(i64::from_be_bytes(buf))
    }

    /// Split off a length-prefixed sub-reader whose offsets stay absolute.
    fn sub(&mut self) -> Result<Reader<'a>, DecodeError> {
        let len = self.u32_be()? as usize;
        let start = self.pos;
        self.take(len)?;
        Ok(Reader {
            data: &self.data[..start + len],
            pos: start,
        })
    }
}

fn decode_node(r: &mut Reader<'_>, depth: usize) -> Result<Prim, DecodeError> {
    if depth > MAX_DEPTH {
        return Err(DecodeError::binary(r.position(), "nesting too deep"));
    }
    let offset = r.position();
    let tag = r.u8()?;
    match tag {
        0 => read_zarith(r).map(Prim::Int),
        1 => {
            let len = r.u32_be()? as usize;
            let start = r.position();
            let raw = r.take(len)?;
            String::from_utf8(raw.to_vec())
                .map(Prim::String)
                .map_err(|_| DecodeError::binary(start, "string is not valid UTF-8"))
        }
        2 => decode_seq(r, depth).map(Prim::Seq),
        3..=8 => {
            let op = read_opcode(r)?;
            let argc = ((tag - 3) / 2) as usize;
            let mut args = Vec::with_capacity(argc);
            for _ in 0..argc {
                args.push(decode_node(r, depth + 1)?);
            }
            let annots = if (tag - 3) % 2 == 1 {
                read_annots(r)?
            } else {
                Vec::new()
            };
            Ok(Prim::App { op, args, annots })
        }
        9 => {
            let op = read_opcode(r)?;
            let args = decode_seq(r, depth)?;
            let annots = read_annots(r)?;
            Ok(Prim::App { op, args, annots })
        }
        10 => {
            let len = r.u32_be()? as usize;
            Ok(Prim::Bytes(r.take(len)?.to_vec()))
        }
        other => Err(DecodeError::binary(offset, format!("unknown node tag {other}"))),
    }
}

fn decode_seq(r: &mut Reader<'_>, depth: usize) -> Result<Vec<Prim>, DecodeError> {
    let mut sub = r.sub()?;
    let mut items = Vec::new();
    while !sub.is_empty() {
        items.push(decode_node(&mut sub, depth + 1)?);
    }
    Ok(items)
}

fn read_opcode(r: &mut Reader<'_>) -> Result<OpCode, DecodeError> {
    let offset = r.position();
    let op = OpCode(r.u8()?);
    if !op.is_valid() {
        return Err(DecodeError::binary(offset, format!("unknown opcode {}", op.0)));
    }
    Ok(op)
}

fn read_annots(r: &mut Reader<'_>) -> Result<Vec<String>, DecodeError> {
    let len = r.u32_be()? as usize;
    let start = r.position();
    let raw = r.take(len)?;
    let text = std::str::from_utf8(raw)
        .map_err(|_| DecodeError::binary(start, "annotation is not valid UTF-8"))?;
    Ok(text.split(' ').filter(|a| !a.is_empty()).map(str::to_string).collect())
}

fn read_zarith(r: &mut Reader<'_>) -> Result<BigInt, DecodeError> {
    let first = r.u8()?;
    let negative = first & 0x40 != 0;
    let mut magnitude = BigUint::from(first & 0x3f);
    let mut shift = 6u32;
    let mut more = first & 0x80 != 0;
    while more {
        let b = r.u8()?;
        magnitude |= BigUint::from(b & 0x7f) << shift;
        shift += 7;
        more = b & 0x80 != 0;
    }
    let sign = if negative { Sign::Minus } else { Sign::Plus };
    Ok(BigInt::from_biguint(sign, magnitude))
}

fn write_zarith(v: &BigInt, out: &mut Vec<u8>) {
    let magnitude = v.magnitude();
    let bits = magnitude.bits();
    let mut first = 0u8;
    for i in 0..6 {
        if magnitude.bit(i) {
            first |= 1 << i;
        }
    }
    if v.sign() == Sign::Minus {
        first |= 0x40;
    }
    if bits > 6 {
        first |= 0x80;
    }
    out.push(first);
    let mut pos = 6;
    while pos < bits {
        let mut b = 0u8;
        for i in 0..7 {
            if magnitude.bit(pos + i) {
                b |= 1 << i;
            }
        }
        pos += 7;
        if pos < bits {
            b |= 0x80;
        }
        out.push(b);
    }
}

fn write_bytes(data: &[u8], out: &mut Vec<u8>) {
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(data);
}

fn write_seq(items: &[Prim], out: &mut Vec<u8>) {
    let mut buf = Vec::new();
    for item in items {
        item.encode(&mut buf);
    }
    write_bytes(&buf, out);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_small_int() {
        assert_eq!(Prim::from_binary(&[0x00, 0x2a]).unwrap(), Prim::int(42));
        assert_eq!(Prim::from_binary(&[0x00, 0x41]).unwrap(), Prim::int(-1));
    }

    #[test]
    fn test_decode_multibyte_int() {
        // 1000 = 0b1111101000: low six bits 101000, then 1111
        let prim = Prim::from_binary(&[0x00, 0xa8, 0x0f]).unwrap();
        assert_eq!(prim, Prim::int(1000));
        assert_eq!(prim.to_binary(), vec![0x00, 0xa8, 0x0f]);
    }

    #[test]
    fn test_decode_pair_with_annots() {
        // Pair "a" 1 as tag 7, then a %f annotated Unit as tag 4
        let bytes = hex::decode("07070100000001610001").unwrap();
        let prim = Prim::from_binary(&bytes).unwrap();
        assert_eq!(
            prim,
            Prim::app(OpCode::D_PAIR, vec![Prim::string("a"), Prim::int(1)])
        );

        let unit = Prim::nullary(OpCode::D_UNIT).with_annot("%f");
        let bytes = unit.to_binary();
        assert_eq!(bytes, hex::decode("040b000000022566").unwrap());
        assert_eq!(Prim::from_binary(&bytes).unwrap().label(), Some("f"));
    }

    #[test]
    fn test_generic_prim_with_many_args() {
        let prim = Prim::app(
            OpCode::D_PAIR,
            vec![Prim::int(1), Prim::int(2), Prim::int(3)],
        );
        let bytes = prim.to_binary();
        assert_eq!(bytes[0], 9);
        assert_eq!(Prim::from_binary(&bytes).unwrap(), prim);
    }

    #[test]
    fn test_sequence_and_bytes() {
        let prim = Prim::Seq(vec![Prim::Bytes(vec![0xca, 0xfe]), Prim::string("x")]);
        let bytes = prim.to_binary();
        assert_eq!(Prim::from_binary(&bytes).unwrap(), prim);
    }

    #[test]
    fn test_malformed_input() {
        assert!(matches!(
            Prim::from_binary(&[0x01, 0x00, 0x00, 0x00, 0x05, b'a']),
            Err(DecodeError::BinaryDecode { .. })
        ));
        assert!(matches!(
            Prim::from_binary(&[0x0b]),
            Err(DecodeError::BinaryDecode { offset: 0, .. })
        ));
        assert!(Prim::from_binary(&[0x03, 0xff]).is_err());
        assert!(Prim::from_binary(&[0x00, 0x01, 0x00]).is_err());
    }

    #[test]
    fn test_json_roundtrip() {
        let json = json!({
            "prim": "Pair",
            "args": [{"int": "-7"}, {"bytes": "00ff"}],
            "annots": ["%x"]
        });
        let prim: Prim = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(prim.args()[0], Prim::int(-7));
        assert_eq!(serde_json::to_value(&prim).unwrap(), json);
    }

    #[test]
    fn test_json_rejects_unknown_prim() {
        assert!(serde_json::from_value::<Prim>(json!({"prim": "Bogus"})).is_err());
        assert!(serde_json::from_value::<Prim>(json!(42)).is_err());
    }

    #[test]
    fn test_is_empty_bigmap() {
        assert!(Prim::nullary(OpCode::I_EMPTY_BIG_MAP).is_empty_bigmap());
        assert!(!Prim::int(0).is_empty_bigmap());
    }

    fn nested_some(depth: usize) -> Vec<u8> {
        let mut data = [0x05, 0x09].repeat(depth);
        data.extend_from_slice(&[0x00, 0x01]);
        data
    }

    fn on_small_stack<T: Send + 'static>(f: impl FnOnce() -> T + Send + 'static) -> T {
        std::thread::Builder::new()
            .stack_size(2 * 1024 * 1024)
            .spawn(f)
            .unwrap()
            .join()
            .unwrap()
    }

    #[test]
    fn test_depth_limit() {
        let ok = on_small_stack(|| Prim::from_binary(&nested_some(MAX_DEPTH)).is_ok());
        assert!(ok);

        for depth in [MAX_DEPTH + 1, 1000, 100_000] {
            let result = on_small_stack(move || Prim::from_binary(&nested_some(depth)));
            assert!(
                matches!(result, Err(DecodeError::BinaryDecode { .. })),
                "depth {depth}"
            );
        }
    }
}
