//! Projection of primitive trees through a type into plain JSON values.
//!
//! Scalars render the way the explorer renders them: numbers as decimal
//! strings, bytes as hex, binary addresses and keys as base58. Pairs flatten
//! into objects keyed by field annotation or position, unions become a
//! single-entry object naming the taken branch.

use super::opcode::OpCode;
use super::prim::{MAX_DEPTH, Prim};
use super::types::Type;
use crate::error::DecodeError;
use crate::types::Address;
use crate::types::key::{encode_chain_id, encode_public_key, encode_signature};
use chrono::DateTime;
use num_traits::ToPrimitive;
use serde_json::{Map, Value as Json, json};
use std::borrow::Cow;

/// What to do when a value does not match its type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OnError {
    /// Render the mismatching subtree as `{"@error": .., "@prim": ..}` and continue.
    #[default]
    Prim,
    /// Abort with [`DecodeError::ValueProjection`].
    Fail,
}

/// A value paired with the type it should be read as.
#[derive(Debug, Clone, Copy)]
pub struct Value<'a> {
    typ: &'a Type,
    prim: &'a Prim,
    on_error: OnError,
}

impl<'a> Value<'a> {
    pub fn new(typ: &'a Type, prim: &'a Prim) -> Self {
        Self {
            typ,
            prim,
            on_error: OnError::default(),
        }
    }

    pub fn with_on_error(mut self, on_error: OnError) -> Self {
        self.on_error = on_error;
        self
    }

    pub fn map(&self) -> Result<Json, DecodeError> {
        self.node(self.typ.prim(), self.prim, "$", 0)
    }

    fn node(&self, typ: &Prim, val: &Prim, path: &str, depth: usize) -> Result<Json, DecodeError> {
        let projected = if depth > MAX_DEPTH {
            Err(DecodeError::projection(path, "nesting too deep"))
        } else {
            self.project(typ, val, path, depth)
        };
        match projected {
            Ok(v) => Ok(v),
            Err(err) if self.on_error == OnError::Prim => {
                let reason = match &err {
                    DecodeError::ValueProjection { reason, .. } => reason.clone(),
                    other => other.to_string(),
                };
                Ok(json!({ "@error": reason, "@prim": val.to_json() }))
            }
            Err(err) => Err(err),
        }
    }

    fn project(&self, typ: &Prim, val: &Prim, path: &str, depth: usize) -> Result<Json, DecodeError> {
        let Some(op) = typ.op_code() else {
            return Ok(val.to_json());
        };
        let targs = typ.args();
        let mismatch = || DecodeError::projection(path, format!("expected {op} value, got {}", describe(val)));
        let encoding = |e: DecodeError| DecodeError::projection(path, e.to_string());

        match op {
            OpCode::T_INT | OpCode::T_NAT | OpCode::T_MUTEZ => match val {
                Prim::Int(v) => Ok(Json::String(v.to_string())),
                _ => Err(mismatch()),
            },
            OpCode::T_STRING => match val {
                Prim::String(s) => Ok(Json::String(s.clone())),
                _ => Err(mismatch()),
            },
            OpCode::T_BYTES => match val {
                Prim::Bytes(b) => Ok(Json::String(hex::encode(b))),
                _ => Err(mismatch()),
            },
            OpCode::T_BOOL => match val.op_code() {
                Some(OpCode::D_TRUE) => Ok(Json::Bool(true)),
                Some(OpCode::D_FALSE) => Ok(Json::Bool(false)),
                _ => Err(mismatch()),
            },
            OpCode::T_UNIT => match val.op_code() {
                Some(OpCode::D_UNIT) => Ok(Json::Null),
                _ => Err(mismatch()),
            },
            OpCode::T_TIMESTAMP => match val {
                Prim::Int(v) => Ok(Json::String(
                    v.to_i64()
                        .and_then(|secs| DateTime::from_timestamp(secs, 0))
                        .map(|t| t.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
                        .unwrap_or_else(|| v.to_string()),
                )),
                Prim::String(s) => Ok(Json::String(s.clone())),
                _ => Err(mismatch()),
            },
            OpCode::T_ADDRESS | OpCode::T_CONTRACT => match val {
                Prim::String(s) => Ok(Json::String(s.clone())),
                Prim::Bytes(b) => {
                    let (addr, entrypoint) = Address::from_binary(b).map_err(encoding)?;
                    Ok(Json::String(match entrypoint {
                        Some(ep) => format!("{addr}%{ep}"),
                        None => addr.to_string(),
                    }))
                }
                _ => Err(mismatch()),
            },
            OpCode::T_KEY_HASH => match val {
                Prim::String(s) => Ok(Json::String(s.clone())),
                Prim::Bytes(b) => Ok(Json::String(
                    Address::from_key_hash_binary(b).map_err(encoding)?.to_string(),
                )),
                _ => Err(mismatch()),
            },
            OpCode::T_KEY | OpCode::T_SIGNATURE | OpCode::T_CHAIN_ID => match val {
                Prim::String(s) => Ok(Json::String(s.clone())),
                Prim::Bytes(b) => {
                    let encoded = match op {
                        OpCode::T_KEY => encode_public_key(b),
                        OpCode::T_SIGNATURE => encode_signature(b),
                        _ => encode_chain_id(b),
                    };
                    Ok(Json::String(encoded.map_err(encoding)?))
                }
                _ => Err(mismatch()),
            },
            OpCode::T_OPTION => match (val.op_code(), val.args(), targs) {
                (Some(OpCode::D_NONE), _, _) => Ok(Json::Null),
                (Some(OpCode::D_SOME), [inner], [inner_type]) => {
                    self.node(inner_type, inner, path, depth + 1)
                }
                _ => Err(mismatch()),
            },
            OpCode::T_OR => match (val.op_code(), val.args(), targs) {
                (Some(OpCode::D_LEFT), [inner], [left, _]) => {
                    self.branch(left, inner, "0", path, depth)
                }
                (Some(OpCode::D_RIGHT), [inner], [_, right]) => {
                    self.branch(right, inner, "1", path, depth)
                }
                _ => Err(mismatch()),
            },
            OpCode::T_PAIR => {
                if !(val.is(OpCode::D_PAIR) || matches!(val, Prim::Seq(_))) || targs.len() < 2 {
                    return Err(mismatch());
                }
                let mut out = Map::new();
                let mut index = 0;
                self.pair_fields(typ, val, path, &mut out, &mut index, depth)?;
                Ok(Json::Object(out))
            }
            OpCode::T_TICKET => match targs {
                [content] => {
                    let as_pair = Prim::app(
                        OpCode::T_PAIR,
                        vec![
                            Prim::nullary(OpCode::T_ADDRESS).with_annot("%ticketer"),
                            content.clone().with_annot("%value"),
                            Prim::nullary(OpCode::T_NAT).with_annot("%amount"),
                        ],
                    );
                    self.project(&as_pair, val, path, depth)
                }
                _ => Ok(val.to_json()),
            },
            OpCode::T_LIST | OpCode::T_SET => match (val, targs) {
                (Prim::Seq(items), [item_type]) => items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| self.node(item_type, item, &format!("{path}[{i}]"), depth + 1))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Json::Array),
                _ => Err(mismatch()),
            },
            OpCode::T_MAP | OpCode::T_BIG_MAP => match (val, targs) {
                (Prim::Int(id), _) if op == OpCode::T_BIG_MAP => Ok(id
                    .to_i64()
                    .map(Json::from)
                    .unwrap_or_else(|| Json::String(id.to_string()))),
                (Prim::Seq(items), [key_type, value_type]) => {
                    self.map_entries(key_type, value_type, items, path, depth)
                }
                _ => Err(mismatch()),
            },
            _ => Ok(val.to_json()),
        }
    }

    fn branch(&self, typ: &Prim, val: &Prim, index: &str, path: &str, depth: usize) -> Result<Json, DecodeError> {
        if typ.is(OpCode::T_OR) && typ.label().is_none() {
            return self.node(typ, val, path, depth + 1);
        }
        let key = typ.label().unwrap_or(index).to_string();
        let inner = self.node(typ, val, &format!("{path}.{key}"), depth + 1)?;
        let mut out = Map::new();
        out.insert(key, inner);
        Ok(Json::Object(out))
    }

    fn pair_fields(
        &self,
        typ: &Prim,
        val: &Prim,
        path: &str,
        out: &mut Map<String, Json>,
        index: &mut usize,
        depth: usize,
    ) -> Result<(), DecodeError> {
        let targs = typ.args();
        let vargs = val.args();
        if targs.is_empty() || vargs.is_empty() {
            return Err(DecodeError::projection(path, "empty pair"));
        }
        let n = targs.len();
        let m = vargs.len();
        for i in 0..n.min(m) {
            let last = i + 1 == n.min(m);
            // right combs may be written with fewer or more explicit levels
            let (field_type, field_val): (Cow<'_, Prim>, Cow<'_, Prim>) = if last && n > m {
                (
                    Cow::Owned(Prim::app(OpCode::T_PAIR, targs[i..].to_vec())),
                    Cow::Borrowed(&vargs[i]),
                )
            } else if last && m > n {
                (
                    Cow::Borrowed(&targs[i]),
                    Cow::Owned(Prim::app(OpCode::D_PAIR, vargs[i..].to_vec())),
                )
            } else {
                (Cow::Borrowed(&targs[i]), Cow::Borrowed(&vargs[i]))
            };
            let (field_type, field_val) = (field_type.as_ref(), field_val.as_ref());
            if field_type.is(OpCode::T_PAIR)
                && field_type.label().is_none()
                && (field_val.is(OpCode::D_PAIR) || matches!(field_val, Prim::Seq(_)))
            {
                self.pair_fields(field_type, field_val, path, out, index, depth)?;
                continue;
            }
            let key = field_type
                .label()
                .map(str::to_string)
                .unwrap_or_else(|| index.to_string());
            *index += 1;
            let v = self.node(field_type, field_val, &format!("{path}.{key}"), depth + 1)?;
            out.insert(key, v);
        }
        Ok(())
    }

    fn map_entries(
        &self,
        key_type: &Prim,
        value_type: &Prim,
        items: &[Prim],
        path: &str,
        depth: usize,
    ) -> Result<Json, DecodeError> {
        let scalar_keys = key_type.op_code().is_some_and(is_scalar);
        let mut object = Map::new();
        let mut entries = Vec::new();
        for (i, elt) in items.iter().enumerate() {
            let [k, v] = elt.args() else {
                return Err(DecodeError::projection(
                    format!("{path}[{i}]"),
                    format!("expected Elt, got {}", describe(elt)),
                ));
            };
            if !elt.is(OpCode::D_ELT) {
                return Err(DecodeError::projection(
                    format!("{path}[{i}]"),
                    format!("expected Elt, got {}", describe(elt)),
                ));
            }
            let key = self.node(key_type, k, &format!("{path}[{i}]"), depth + 1)?;
            match (&key, scalar_keys) {
                (Json::String(s), true) => {
                    let value = self.node(value_type, v, &format!("{path}.{s}"), depth + 1)?;
                    object.insert(s.clone(), value);
                }
                (Json::Bool(b), true) => {
                    let value = self.node(value_type, v, &format!("{path}.{b}"), depth + 1)?;
                    object.insert(b.to_string(), value);
                }
                _ => {
                    let value = self.node(value_type, v, &format!("{path}[{i}]"), depth + 1)?;
                    entries.push(json!({ "key": key, "value": value }));
                }
            }
        }
        if entries.is_empty() {
            Ok(Json::Object(object))
        } else {
            // a mixed map only arises from malformed keys; keep everything
            entries.extend(object.into_iter().map(|(k, v)| json!({ "key": k, "value": v })));
            Ok(Json::Array(entries))
        }
    }
}

fn is_scalar(op: OpCode) -> bool {
    matches!(
        op,
        OpCode::T_INT
            | OpCode::T_NAT
            | OpCode::T_MUTEZ
            | OpCode::T_STRING
            | OpCode::T_BYTES
            | OpCode::T_BOOL
            | OpCode::T_TIMESTAMP
            | OpCode::T_ADDRESS
            | OpCode::T_KEY_HASH
            | OpCode::T_KEY
            | OpCode::T_SIGNATURE
            | OpCode::T_CHAIN_ID
    )
}

fn describe(val: &Prim) -> String {
    match val {
        Prim::Int(_) => "int".to_string(),
        Prim::String(_) => "string".to_string(),
        Prim::Bytes(_) => "bytes".to_string(),
        Prim::Seq(_) => "sequence".to_string(),
        Prim::App { op, .. } => op.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AddressType;

    fn t(op: OpCode) -> Prim {
        Prim::nullary(op)
    }

    fn d(op: OpCode, args: Vec<Prim>) -> Prim {
        Prim::app(op, args)
    }

    #[test]
    fn test_scalars() {
        let nat = Type::new(t(OpCode::T_NAT));
        assert_eq!(Value::new(&nat, &Prim::int(1000)).map().unwrap(), json!("1000"));

        let bytes = Type::new(t(OpCode::T_BYTES));
        assert_eq!(
            Value::new(&bytes, &Prim::Bytes(vec![0xca, 0xfe])).map().unwrap(),
            json!("cafe")
        );

        let ts = Type::new(t(OpCode::T_TIMESTAMP));
        assert_eq!(
            Value::new(&ts, &Prim::int(1_600_000_000)).map().unwrap(),
            json!("2020-09-13T12:26:40Z")
        );

        let unit = Type::new(t(OpCode::T_UNIT));
        assert_eq!(Value::new(&unit, &t(OpCode::D_UNIT)).map().unwrap(), Json::Null);
    }

    #[test]
    fn test_binary_address() {
        let addr = Address::new(AddressType::Contract, [7u8; 20]);
        let typ = Type::new(t(OpCode::T_ADDRESS));
        let val = Prim::Bytes(addr.to_binary().to_vec());
        assert_eq!(Value::new(&typ, &val).map().unwrap(), json!(addr.to_string()));

        let mut with_ep = addr.to_binary().to_vec();
        with_ep.extend_from_slice(b"mint");
        let val = Prim::Bytes(with_ep);
        assert_eq!(
            Value::new(&typ, &val).map().unwrap(),
            json!(format!("{addr}%mint"))
        );
    }

    #[test]
    fn test_pair_flattening() {
        // pair (address %from) (pair (address %to) (nat %value))
        let typ = Type::new(d(
            OpCode::T_PAIR,
            vec![
                t(OpCode::T_STRING).with_annot("%from"),
                d(
                    OpCode::T_PAIR,
                    vec![t(OpCode::T_STRING).with_annot("%to"), t(OpCode::T_NAT).with_annot("%value")],
                ),
            ],
        ));
        // the same value written as a flat comb
        let val = d(
            OpCode::D_PAIR,
            vec![Prim::string("alice"), Prim::string("bob"), Prim::int(5)],
        );
        assert_eq!(
            Value::new(&typ, &val).map().unwrap(),
            json!({"from": "alice", "to": "bob", "value": "5"})
        );
    }

    #[test]
    fn test_unlabeled_pair_uses_positions() {
        let typ = Type::new(d(OpCode::T_PAIR, vec![t(OpCode::T_INT), t(OpCode::T_STRING)]));
        let val = d(OpCode::D_PAIR, vec![Prim::int(-3), Prim::string("x")]);
        assert_eq!(Value::new(&typ, &val).map().unwrap(), json!({"0": "-3", "1": "x"}));
    }

    #[test]
    fn test_or_and_option() {
        let typ = Type::new(d(
            OpCode::T_OR,
            vec![
                d(OpCode::T_OPTION, vec![t(OpCode::T_NAT)]).with_annot("%maybe"),
                t(OpCode::T_UNIT).with_annot("%nothing"),
            ],
        ));
        let left = d(OpCode::D_LEFT, vec![d(OpCode::D_SOME, vec![Prim::int(9)])]);
        assert_eq!(Value::new(&typ, &left).map().unwrap(), json!({"maybe": "9"}));
        let right = d(OpCode::D_RIGHT, vec![t(OpCode::D_UNIT)]);
        assert_eq!(Value::new(&typ, &right).map().unwrap(), json!({"nothing": null}));
    }

    #[test]
    fn test_maps() {
        let typ = Type::new(d(OpCode::T_MAP, vec![t(OpCode::T_STRING), t(OpCode::T_INT)]));
        let val = Prim::Seq(vec![
            d(OpCode::D_ELT, vec![Prim::string("a"), Prim::int(1)]),
            d(OpCode::D_ELT, vec![Prim::string("b"), Prim::int(2)]),
        ]);
        assert_eq!(Value::new(&typ, &val).map().unwrap(), json!({"a": "1", "b": "2"}));

        let pair_keys = Type::new(d(
            OpCode::T_MAP,
            vec![d(OpCode::T_PAIR, vec![t(OpCode::T_INT), t(OpCode::T_INT)]), t(OpCode::T_BOOL)],
        ));
        let val = Prim::Seq(vec![d(
            OpCode::D_ELT,
            vec![d(OpCode::D_PAIR, vec![Prim::int(1), Prim::int(2)]), t(OpCode::D_TRUE)],
        )]);
        assert_eq!(
            Value::new(&pair_keys, &val).map().unwrap(),
            json!([{"key": {"0": "1", "1": "2"}, "value": true}])
        );

        let big_map = Type::new(d(OpCode::T_BIG_MAP, vec![t(OpCode::T_STRING), t(OpCode::T_INT)]));
        assert_eq!(Value::new(&big_map, &Prim::int(17)).map().unwrap(), json!(17));
    }

    #[test]
    fn test_mismatch_lenient_and_strict() {
        let typ = Type::new(d(
            OpCode::T_PAIR,
            vec![t(OpCode::T_NAT).with_annot("%a"), t(OpCode::T_NAT).with_annot("%b")],
        ));
        let val = d(OpCode::D_PAIR, vec![Prim::int(1), Prim::string("oops")]);

        let lenient = Value::new(&typ, &val).map().unwrap();
        assert_eq!(lenient["a"], json!("1"));
        assert_eq!(lenient["b"]["@prim"], json!({"string": "oops"}));
        assert!(lenient["b"]["@error"].as_str().unwrap().contains("expected nat"));

        let err = Value::new(&typ, &val).with_on_error(OnError::Fail).map().unwrap_err();
        match err {
            DecodeError::ValueProjection { path, .. } => assert_eq!(path, "$.b"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_nesting_limit() {
        let result = std::thread::Builder::new()
            .stack_size(2 * 1024 * 1024)
            .spawn(|| {
                let mut val = Prim::int(1);
                for _ in 0..300 {
                    val = d(OpCode::D_SOME, vec![val]);
                }
                let typ = Type::infer(&val);
                let strict = Value::new(&typ, &val).with_on_error(OnError::Fail).map();
                let lenient = Value::new(&typ, &val).map();
                (strict, lenient.is_ok())
            })
            .unwrap()
            .join()
            .unwrap();
        match result.0 {
            Err(DecodeError::ValueProjection { reason, .. }) => assert!(reason.contains("too deep")),
            other => panic!("unexpected result {other:?}"),
        }
        assert!(result.1);
    }
}
