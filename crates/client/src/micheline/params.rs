//! Transaction parameters: entrypoint selector plus argument value.

use super::opcode::OpCode;
use super::prim::{Prim, Reader};
use super::types::{Entrypoint, Entrypoints, Type};
use crate::error::DecodeError;

const RESERVED_ENTRYPOINTS: [&str; 10] = [
    "default",
    "root",
    "do",
    "set_delegate",
    "remove_delegate",
    "deposit",
    "stake",
    "unstake",
    "finalize_unstake",
    "set_delegate_parameters",
];

const NAMED_ENTRYPOINT_TAG: u8 = 255;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameters {
    pub entrypoint: String,
    pub value: Prim,
}

impl Parameters {
    pub fn from_binary(data: &[u8]) -> Result<Self, DecodeError> {
        let mut r = Reader::new(data);
        let tag_offset = r.position();
        let entrypoint = match r.u8()? {
            NAMED_ENTRYPOINT_TAG => {
                let len = r.u8()? as usize;
                let offset = r.position();
                let raw = r.take(len)?;
                String::from_utf8(raw.to_vec())
                    .map_err(|_| DecodeError::binary(offset, "entrypoint name is not UTF-8"))?
            }
            tag => RESERVED_ENTRYPOINTS
                .get(tag as usize)
                .ok_or_else(|| DecodeError::binary(tag_offset, format!("unknown entrypoint tag {tag}")))?
                .to_string(),
        };
        let len = r.u32_be()? as usize;
        let offset = r.position();
        let body = r.take(len)?;
        let value = Prim::from_binary(body).map_err(|err| match err {
            DecodeError::BinaryDecode { offset: inner, reason, .. } => {
                DecodeError::binary(offset + inner, reason)
            }
            other => other,
        })?;
        if !r.is_empty() {
            return Err(DecodeError::binary(
                r.position(),
                format!("{} trailing bytes", r.remaining()),
            ));
        }
        Ok(Self { entrypoint, value })
    }

    /// Fails for entrypoint names that do not fit the one byte length prefix.
    pub fn to_binary(&self) -> Result<Vec<u8>, DecodeError> {
        let mut out = Vec::new();
        match RESERVED_ENTRYPOINTS.iter().position(|n| *n == self.entrypoint) {
            Some(tag) => out.push(tag as u8),
            None => {
                let len = u8::try_from(self.entrypoint.len()).map_err(|_| {
                    DecodeError::invalid(
                        "entrypoint",
                        self.entrypoint.clone(),
                        format!("name is {} bytes, at most 255 allowed", self.entrypoint.len()),
                    )
                })?;
                out.push(NAMED_ENTRYPOINT_TAG);
                out.push(len);
                out.extend_from_slice(self.entrypoint.as_bytes());
            }
        }
        let body = self.value.to_binary();
        out.extend_from_slice(&(body.len() as u32).to_be_bytes());
        out.extend_from_slice(&body);
        Ok(out)
    }

    /// Find the entrypoint this call targets and the argument value for it.
    ///
    /// Calls to `default`/`root` carry the full `Left`/`Right` path through
    /// the parameter union; it is unwrapped until an entrypoint matches. Names
    /// missing from the table fall back to the whole parameter type.
    pub fn map_entrypoint<'a>(&'a self, typ: &Type, eps: &Entrypoints) -> (Entrypoint, &'a Prim) {
        if self.entrypoint == "default" || self.entrypoint == "root" {
            let mut branch = String::new();
            let mut node_type = typ.prim();
            let mut node = &self.value;
            while node_type.is(OpCode::T_OR) {
                let (step, idx) = match (node.op_code(), node.args()) {
                    (Some(OpCode::D_LEFT), [_]) => ('L', 0),
                    (Some(OpCode::D_RIGHT), [_]) => ('R', 1),
                    _ => break,
                };
                let Some(next_type) = node_type.args().get(idx) else {
                    break;
                };
                branch.push(step);
                node_type = next_type;
                node = &node.args()[0];
            }
            if !branch.is_empty()
                && let Some(ep) = eps.find_branch(&branch)
            {
                return (ep.clone(), node);
            }
        } else if let Some(ep) = eps.get(&self.entrypoint) {
            return (ep.clone(), &self.value);
        }
        let fallback = Entrypoint {
            id: 0,
            name: self.entrypoint.clone(),
            branch: String::new(),
            typ: typ.clone(),
        };
        (fallback, &self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param_type() -> Type {
        // or (nat %deposit_funds) (or (string %memo) (unit %withdraw))
        Type::new(Prim::app(
            OpCode::T_OR,
            vec![
                Prim::nullary(OpCode::T_NAT).with_annot("%deposit_funds"),
                Prim::app(
                    OpCode::T_OR,
                    vec![
                        Prim::nullary(OpCode::T_STRING).with_annot("%memo"),
                        Prim::nullary(OpCode::T_UNIT).with_annot("%withdraw"),
                    ],
                ),
            ],
        ))
    }

    #[test]
    fn test_reserved_entrypoint() {
        // default, 5 byte value: int 1000
        let data = hex::decode("000000000300a80f").unwrap();
        let params = Parameters::from_binary(&data).unwrap();
        assert_eq!(params.entrypoint, "default");
        assert_eq!(params.value, Prim::int(1000));
        assert_eq!(params.to_binary().unwrap(), data);
    }

    #[test]
    fn test_named_entrypoint() {
        let params = Parameters {
            entrypoint: "memo".to_string(),
            value: Prim::string("hi"),
        };
        let data = params.to_binary().unwrap();
        assert_eq!(data[0], 255);
        assert_eq!(data[1], 4);
        assert_eq!(&data[2..6], b"memo");
        assert_eq!(Parameters::from_binary(&data).unwrap(), params);
    }

    #[test]
    fn test_entrypoint_name_length() {
        let mut params = Parameters {
            entrypoint: "a".repeat(255),
            value: Prim::int(0),
        };
        let data = params.to_binary().unwrap();
        assert_eq!(data[1], 255);
        assert_eq!(Parameters::from_binary(&data).unwrap(), params);

        params.entrypoint.push('a');
        assert!(matches!(
            params.to_binary(),
            Err(DecodeError::InvalidEncoding { kind: "entrypoint", .. })
        ));
    }

    #[test]
    fn test_bad_tag_and_truncation() {
        assert!(matches!(
            Parameters::from_binary(&[42, 0, 0, 0, 0]),
            Err(DecodeError::BinaryDecode { offset: 0, .. })
        ));
        assert!(Parameters::from_binary(&[0, 0, 0, 0, 9, 0]).is_err());
    }

    #[test]
    fn test_map_named() {
        let typ = param_type();
        let eps = typ.entrypoints();
        let params = Parameters {
            entrypoint: "memo".to_string(),
            value: Prim::string("hi"),
        };
        let (ep, value) = params.map_entrypoint(&typ, &eps);
        assert_eq!(ep.name, "memo");
        assert_eq!(ep.branch, "RL");
        assert_eq!(value, &Prim::string("hi"));
    }

    #[test]
    fn test_map_default_walks_branches() {
        let typ = param_type();
        let eps = typ.entrypoints();
        let params = Parameters {
            entrypoint: "default".to_string(),
            value: Prim::app(
                OpCode::D_RIGHT,
                vec![Prim::app(OpCode::D_RIGHT, vec![Prim::nullary(OpCode::D_UNIT)])],
            ),
        };
        let (ep, value) = params.map_entrypoint(&typ, &eps);
        assert_eq!(ep.name, "withdraw");
        assert_eq!(value, &Prim::nullary(OpCode::D_UNIT));
    }

    #[test]
    fn test_map_unknown_falls_back_to_root() {
        let typ = param_type();
        let eps = typ.entrypoints();
        let params = Parameters {
            entrypoint: "missing".to_string(),
            value: Prim::int(1),
        };
        let (ep, _) = params.map_entrypoint(&typ, &eps);
        assert_eq!(ep.name, "missing");
        assert_eq!(ep.typ, typ);
    }
}
