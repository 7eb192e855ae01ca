//! Type expressions, rendered type definitions and entrypoint tables.

use super::opcode::OpCode;
use super::prim::{MAX_DEPTH, Prim};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A Michelson type expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Type(Prim);

impl Type {
    pub fn new(prim: Prim) -> Self {
        Self(prim)
    }

    pub fn prim(&self) -> &Prim {
        &self.0
    }

    pub fn op_code(&self) -> Option<OpCode> {
        self.0.op_code()
    }

    pub fn label(&self) -> Option<&str> {
        self.0.label()
    }

    /// Key type of a map or big_map.
    pub fn left(&self) -> Option<Type> {
        self.0.args().first().cloned().map(Type)
    }

    /// Value type of a map or big_map.
    pub fn right(&self) -> Option<Type> {
        self.0.args().get(1).cloned().map(Type)
    }

    pub fn typedef(&self, name: &str) -> Typedef {
        build_typedef(&self.0, name)
    }

    /// Derive a type from the shape of a value when no schema is available.
    pub fn infer(value: &Prim) -> Type {
        Type(infer_node(value, 0))
    }

    pub fn entrypoints(&self) -> Entrypoints {
        let mut found = Vec::new();
        if self.0.is(OpCode::T_OR) {
            collect_entrypoints(&self.0, String::new(), &mut found);
        }
        let mut eps = Entrypoints::default();
        for (id, (branch, node)) in found.into_iter().enumerate() {
            let name = node
                .label()
                .map(str::to_string)
                .unwrap_or_else(|| format!("@entrypoint_{id}"));
            eps.0.insert(
                name.clone(),
                Entrypoint {
                    id,
                    name,
                    branch,
                    typ: Type(node.clone()),
                },
            );
        }
        if !eps.0.contains_key("default") {
            eps.0.insert(
                "default".to_string(),
                Entrypoint {
                    id: eps.0.len(),
                    name: "default".to_string(),
                    branch: String::new(),
                    typ: self.clone(),
                },
            );
        }
        eps
    }
}

fn collect_entrypoints<'a>(node: &'a Prim, branch: String, out: &mut Vec<(String, &'a Prim)>) {
    let is_or = node.is(OpCode::T_OR) && node.args().len() == 2;
    if !branch.is_empty() && (node.label().is_some() || !is_or) {
        out.push((branch.clone(), node));
    }
    if is_or {
        let args = node.args();
        collect_entrypoints(&args[0], format!("{branch}L"), out);
        collect_entrypoints(&args[1], format!("{branch}R"), out);
    }
}

/// A named entry into a contract's parameter type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entrypoint {
    pub id: usize,
    pub name: String,
    /// Path of `L`/`R` steps from the parameter root.
    pub branch: String,
    pub typ: Type,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entrypoints(BTreeMap<String, Entrypoint>);

impl Entrypoints {
    pub fn get(&self, name: &str) -> Option<&Entrypoint> {
        self.0.get(name)
    }

    pub fn find_branch(&self, branch: &str) -> Option<&Entrypoint> {
        self.0.values().find(|ep| ep.branch == branch)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entrypoint> {
        self.0.values()
    }
}

/// JSON description of a type, as emitted for big-map allocations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Typedef {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(rename = "type")]
    pub typ: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<Typedef>,
}

fn build_typedef(node: &Prim, name: &str) -> Typedef {
    let name = node.label().unwrap_or(name).to_string();
    let Some(op) = node.op_code() else {
        return Typedef {
            name,
            typ: "invalid".to_string(),
            optional: false,
            args: Vec::new(),
        };
    };
    let args = node.args();
    let children = match op {
        OpCode::T_OPTION if args.len() == 1 => {
            let mut inner = build_typedef(&args[0], &name);
            inner.optional = true;
            return inner;
        }
        OpCode::T_PAIR | OpCode::T_OR => {
            let mut fields = Vec::new();
            flatten_fields(node, op, &mut fields);
            fields
                .into_iter()
                .enumerate()
                .map(|(i, f)| build_typedef(f, &i.to_string()))
                .collect()
        }
        OpCode::T_MAP | OpCode::T_BIG_MAP if args.len() == 2 => vec![
            build_typedef(&args[0], "@key"),
            build_typedef(&args[1], "@value"),
        ],
        OpCode::T_LAMBDA if args.len() == 2 => vec![
            build_typedef(&args[0], "@param"),
            build_typedef(&args[1], "@return"),
        ],
        _ => args.iter().map(|a| build_typedef(a, "@item")).collect(),
    };
    Typedef {
        name,
        typ: op.to_string(),
        optional: false,
        args: children,
    }
}

/// Flatten unannotated nested pairs (or unions) into one field list.
fn flatten_fields<'a>(node: &'a Prim, op: OpCode, out: &mut Vec<&'a Prim>) {
    for arg in node.args() {
        if arg.is(op) && arg.label().is_none() {
            flatten_fields(arg, op, out);
        } else {
            out.push(arg);
        }
    }
}

fn infer_node(value: &Prim, depth: usize) -> Prim {
    let unit = || Prim::nullary(OpCode::T_UNIT);
    if depth > MAX_DEPTH {
        return unit();
    }
    let infer = |v: &Prim| infer_node(v, depth + 1);
    match value {
        Prim::Int(_) => Prim::nullary(OpCode::T_INT),
        Prim::String(_) => Prim::nullary(OpCode::T_STRING),
        Prim::Bytes(_) => Prim::nullary(OpCode::T_BYTES),
        Prim::Seq(items) => match items.first() {
            Some(first) if first.is(OpCode::D_ELT) && first.args().len() == 2 => Prim::app(
                OpCode::T_MAP,
                vec![infer(&first.args()[0]), infer(&first.args()[1])],
            ),
            Some(first) => Prim::app(OpCode::T_LIST, vec![infer(first)]),
            None => Prim::app(OpCode::T_LIST, vec![unit()]),
        },
        Prim::App { op, args, .. } => match (*op, args.as_slice()) {
            (OpCode::D_PAIR, items) if items.len() >= 2 => {
                Prim::app(OpCode::T_PAIR, items.iter().map(infer).collect())
            }
            (OpCode::D_TRUE | OpCode::D_FALSE, _) => Prim::nullary(OpCode::T_BOOL),
            (OpCode::D_SOME, [inner]) => Prim::app(OpCode::T_OPTION, vec![infer(inner)]),
            (OpCode::D_NONE, _) => Prim::app(OpCode::T_OPTION, vec![unit()]),
            (OpCode::D_LEFT, [inner]) => Prim::app(OpCode::T_OR, vec![infer(inner), unit()]),
            (OpCode::D_RIGHT, [inner]) => Prim::app(OpCode::T_OR, vec![unit(), infer(inner)]),
            _ => unit(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(op: OpCode) -> Prim {
        Prim::nullary(op)
    }

    fn fa12_parameter() -> Type {
        // or (or (pair %transfer address (pair address nat)) (nat %burn)) (unit %pause)
        Type::new(Prim::app(
            OpCode::T_OR,
            vec![
                Prim::app(
                    OpCode::T_OR,
                    vec![
                        Prim::app(
                            OpCode::T_PAIR,
                            vec![
                                t(OpCode::T_ADDRESS).with_annot(":from"),
                                Prim::app(
                                    OpCode::T_PAIR,
                                    vec![t(OpCode::T_ADDRESS).with_annot(":to"), t(OpCode::T_NAT).with_annot(":value")],
                                ),
                            ],
                        )
                        .with_annot("%transfer"),
                        t(OpCode::T_NAT).with_annot("%burn"),
                    ],
                ),
                t(OpCode::T_UNIT).with_annot("%pause"),
            ],
        ))
    }

    #[test]
    fn test_entrypoints_from_or_tree() {
        let eps = fa12_parameter().entrypoints();
        assert_eq!(eps.get("transfer").unwrap().branch, "LL");
        assert_eq!(eps.get("burn").unwrap().branch, "LR");
        assert_eq!(eps.get("pause").unwrap().branch, "R");
        assert_eq!(eps.get("default").unwrap().branch, "");
        assert_eq!(eps.find_branch("LR").unwrap().name, "burn");
        assert_eq!(eps.len(), 4);
    }

    #[test]
    fn test_entrypoints_non_or_type() {
        let eps = Type::new(t(OpCode::T_NAT)).entrypoints();
        assert_eq!(eps.len(), 1);
        assert_eq!(eps.get("default").unwrap().typ, Type::new(t(OpCode::T_NAT)));
    }

    #[test]
    fn test_typedef_flattens_pairs() {
        let transfer = fa12_parameter().entrypoints().get("transfer").unwrap().typ.clone();
        let def = transfer.typedef("@param");
        assert_eq!(def.name, "transfer");
        assert_eq!(def.typ, "pair");
        let names: Vec<_> = def.args.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["from", "to", "value"]);
    }

    #[test]
    fn test_typedef_option_and_big_map() {
        let typ = Type::new(Prim::app(
            OpCode::T_BIG_MAP,
            vec![t(OpCode::T_ADDRESS), Prim::app(OpCode::T_OPTION, vec![t(OpCode::T_NAT)])],
        ));
        let def = typ.typedef("ledger");
        assert_eq!(def.typ, "big_map");
        assert_eq!(def.args[0].name, "@key");
        assert_eq!(def.args[1].typ, "nat");
        assert!(def.args[1].optional);
        assert_eq!(typ.left().unwrap().op_code(), Some(OpCode::T_ADDRESS));
    }

    #[test]
    fn test_infer_from_value() {
        let key = Prim::app(OpCode::D_PAIR, vec![Prim::string("a"), Prim::int(1)]);
        let typ = Type::infer(&key);
        assert_eq!(typ.op_code(), Some(OpCode::T_PAIR));
        assert_eq!(typ.prim().args()[0], t(OpCode::T_STRING));
        assert_eq!(typ.prim().args()[1], t(OpCode::T_INT));
        assert_eq!(Type::infer(&Prim::nullary(OpCode::D_TRUE)).op_code(), Some(OpCode::T_BOOL));
    }
}
