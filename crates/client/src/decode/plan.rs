use serde_json::Value;

/// A closed set of table columns for one record type.
pub trait Column: Copy + Eq + Sized + 'static {
    const ALL: &'static [Self];

    fn from_name(name: &str) -> Option<Self>;

    fn name(self) -> &'static str;

    /// Notable columns are expensive or nested and left out of default queries.
    fn is_notable(self) -> bool;

    fn default_names() -> Vec<&'static str> {
        Self::ALL
            .iter()
            .filter(|c| !c.is_notable())
            .map(|c| c.name())
            .collect()
    }
}

/// Declare a column enum with its wire names; `@notable` marks columns
/// excluded from default column sets.
macro_rules! columns {
    (@notable) => { false };
    (@notable notable) => { true };
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($variant:ident = $wire:literal $(@ $flag:ident)?),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($variant),*
        }

        impl $crate::decode::Column for $name {
            const ALL: &'static [Self] = &[$(Self::$variant),*];

            fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($wire => Some(Self::$variant),)*
                    _ => None,
                }
            }

            fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $wire,)*
                }
            }

            fn is_notable(self) -> bool {
                match self {
                    $(Self::$variant => $crate::decode::columns!(@notable $($flag)?),)*
                }
            }
        }
    };
}

pub(crate) use columns;

/// A column list resolved against a record's columns, built once per batch.
///
/// Unknown names keep their position but are skipped when rows are walked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnPlan<C> {
    names: Vec<String>,
    slots: Vec<Option<C>>,
}

impl<C: Column> ColumnPlan<C> {
    pub fn new<S: AsRef<str>>(names: &[S]) -> Self {
        let names: Vec<String> = names.iter().map(|n| n.as_ref().to_string()).collect();
        let slots = names.iter().map(|n| C::from_name(n)).collect();
        Self { names, slots }
    }

    /// Plan for the default column set.
    pub fn defaults() -> Self {
        Self::new(&C::default_names())
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn position(&self, column: C) -> Option<usize> {
        self.slots.iter().position(|slot| *slot == Some(column))
    }

    /// The non-null value of `column` in `row`, if present.
    pub fn get<'a>(&self, row: &'a [Value], column: C) -> Option<&'a Value> {
        self.position(column)
            .and_then(|i| row.get(i))
            .filter(|v| !v.is_null())
    }

    /// Known columns paired with their non-null values, in column order.
    ///
    /// Positions past the end of a short row read as null.
    pub fn walk<'a>(&'a self, row: &'a [Value]) -> impl Iterator<Item = (C, &'a Value)> + 'a {
        self.slots
            .iter()
            .zip(row.iter())
            .filter_map(|(slot, value)| match (slot, value) {
                (Some(column), v) if !v.is_null() => Some((*column, v)),
                _ => None,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    columns! {
        enum TestColumn {
            Id = "id",
            Name = "name",
            Nested = "nested" @notable,
        }
    }

    #[test]
    fn test_column_names() {
        assert_eq!(TestColumn::from_name("name"), Some(TestColumn::Name));
        assert_eq!(TestColumn::from_name("bogus"), None);
        assert_eq!(TestColumn::Nested.name(), "nested");
        assert!(TestColumn::Nested.is_notable());
        assert!(!TestColumn::Id.is_notable());
        assert_eq!(TestColumn::default_names(), vec!["id", "name"]);
    }

    #[test]
    fn test_walk_skips_unknown_and_null() {
        let plan = ColumnPlan::<TestColumn>::new(&["id", "extra", "name", "nested"]);
        let row = vec![json!(1), json!("x"), Value::Null];
        let seen: Vec<_> = plan.walk(&row).collect();
        assert_eq!(seen, vec![(TestColumn::Id, &json!(1))]);
        assert_eq!(plan.get(&row, TestColumn::Id), Some(&json!(1)));
        assert_eq!(plan.get(&row, TestColumn::Name), None);
        assert_eq!(plan.get(&row, TestColumn::Nested), None);
        assert_eq!(plan.len(), 4);
    }

    #[test]
    fn test_default_plan() {
        let plan = ColumnPlan::<TestColumn>::defaults();
        assert_eq!(plan.names(), &["id".to_string(), "name".to_string()]);
        assert_eq!(plan.position(TestColumn::Nested), None);
    }
}
