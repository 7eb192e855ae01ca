//! Query parameters for explorer endpoints and table queries.

use crate::error::ClientError;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_LIMIT: u32 = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

impl Order {
    pub fn as_str(self) -> &'static str {
        match self {
            Order::Asc => "asc",
            Order::Desc => "desc",
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Order {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(Order::Asc),
            "desc" => Ok(Order::Desc),
            other => Err(format!("invalid order '{other}', expected asc or desc")),
        }
    }
}

/// Comparison applied by a table filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    Nin,
    Range,
    Regexp,
}

impl FilterMode {
    pub fn as_str(self) -> &'static str {
        match self {
            FilterMode::Eq => "eq",
            FilterMode::Ne => "ne",
            FilterMode::Gt => "gt",
            FilterMode::Gte => "gte",
            FilterMode::Lt => "lt",
            FilterMode::Lte => "lte",
            FilterMode::In => "in",
            FilterMode::Nin => "nin",
            FilterMode::Range => "rg",
            FilterMode::Regexp => "re",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub mode: FilterMode,
    pub value: String,
}

/// Key/value query parameters; setting a key again replaces it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    query: BTreeMap<String, String>,
}

impl Params {
    pub fn set(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.insert(key.into(), value.to_string());
        self
    }

    pub fn remove(mut self, key: &str) -> Self {
        self.query.remove(key);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.query.is_empty()
    }

    /// Append the encoded parameters to `path`.
    pub fn append_to(&self, path: &str) -> Result<String, ClientError> {
        if self.query.is_empty() {
            return Ok(path.to_string());
        }
        Ok(format!("{path}?{}", serde_urlencoded::to_string(&self.query)?))
    }
}

macro_rules! flag_params {
    ($name:ident { $($method:ident => $key:literal),* $(,)? }) => {
        impl $name {
            pub fn new() -> Self {
                Self::default()
            }

            pub fn with_limit(self, limit: u32) -> Self {
                Self(self.0.set("limit", limit))
            }

            pub fn with_offset(self, offset: u32) -> Self {
                Self(self.0.set("offset", offset))
            }

            pub fn with_cursor(self, cursor: u64) -> Self {
                Self(self.0.set("cursor", cursor))
            }

            pub fn with_order(self, order: Order) -> Self {
                Self(self.0.set("order", order))
            }

            $(
                pub fn $method(self) -> Self {
                    Self(self.0.set($key, 1))
                }
            )*

            pub fn append_to(&self, path: &str) -> Result<String, ClientError> {
                self.0.append_to(path)
            }
        }
    };
}

/// Parameters for `/explorer/op/...` style endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpParams(Params);

flag_params!(OpParams {
    with_unpack => "unpack",
    with_prim => "prim",
    with_meta => "meta",
    with_rights => "rights",
    with_merge => "merge",
    with_storage => "storage",
});

impl OpParams {
    /// Restrict to operation types; `None` clears the filter.
    pub fn with_type(self, mode: Option<FilterMode>, types: &[&str]) -> Self {
        let cleared = Params {
            query: self
                .0
                .query
                .into_iter()
                .filter(|(k, _)| k != "type" && !k.starts_with("type."))
                .collect(),
        };
        match mode {
            Some(mode) => Self(cleared.set(format!("type.{}", mode.as_str()), types.join(","))),
            None => Self(cleared),
        }
    }

    pub fn with_block(self, block: impl ToString) -> Self {
        Self(self.0.set("block", block))
    }

    pub fn with_since(self, since: impl ToString) -> Self {
        Self(self.0.set("since", since))
    }
}

/// Parameters for `/explorer/block/...` endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockParams(Params);

flag_params!(BlockParams {
    with_meta => "meta",
    with_rights => "rights",
});

/// A query against the explorer's `/tables/{table}` API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableQuery {
    pub table: String,
    pub columns: Vec<String>,
    pub limit: u32,
    pub cursor: Option<u64>,
    pub order: Order,
    pub filters: Vec<Filter>,
}

impl TableQuery {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            limit: DEFAULT_LIMIT,
            cursor: None,
            order: Order::default(),
            filters: Vec::new(),
        }
    }

    pub fn with_columns<S: AsRef<str>>(mut self, columns: &[S]) -> Self {
        self.columns = columns.iter().map(|c| c.as_ref().to_string()).collect();
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_cursor(mut self, cursor: Option<u64>) -> Self {
        self.cursor = cursor;
        self
    }

    pub fn with_order(mut self, order: Order) -> Self {
        self.order = order;
        self
    }

    pub fn with_filter(mut self, column: impl Into<String>, mode: FilterMode, value: impl ToString) -> Self {
        self.filters.push(Filter {
            column: column.into(),
            mode,
            value: value.to_string(),
        });
        self
    }

    /// Request path including the encoded query.
    pub fn path(&self) -> Result<String, ClientError> {
        let mut pairs: Vec<(String, String)> = Vec::new();
        if !self.columns.is_empty() {
            pairs.push(("columns".to_string(), self.columns.join(",")));
        }
        pairs.push(("limit".to_string(), self.limit.to_string()));
        if let Some(cursor) = self.cursor {
            pairs.push(("cursor".to_string(), cursor.to_string()));
        }
        pairs.push(("order".to_string(), self.order.to_string()));
        for f in &self.filters {
            pairs.push((format!("{}.{}", f.column, f.mode.as_str()), f.value.clone()));
        }
        Ok(format!("/tables/{}?{}", self.table, serde_urlencoded::to_string(&pairs)?))
    }
}
