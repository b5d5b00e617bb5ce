//! Column retrofits: declare a new column once, generate the DDL and index rules.
//!
//! The generated rules still operate on raw text. They match the
//! `CREATE TABLE` header, the primary-key line and the column that follows it,
//! so a table whose layout drifted simply yields a no-op rule.

use crate::rule::Rule;

/// Change id used by generated `CREATE TABLE` rules.
pub const SCHEMA_CHANGE: &str = "schema";
/// Change id used by generated `CREATE INDEX` rules.
pub const INDEX_CHANGE: &str = "indexes";

#[derive(Debug, Clone)]
pub struct ColumnRetrofit {
    /// Column name, e.g. `user_id`
    pub column: String,
    /// Full column definition, e.g. `user_id TEXT NOT NULL DEFAULT 'x'`
    pub definition: String,
    /// Indentation of column lines inside `CREATE TABLE`
    pub indent: String,
    /// Indentation of the line that follows an inserted index statement
    pub index_indent: String,
    pub tables: Vec<TableAnchor>,
}

#[derive(Debug, Clone)]
pub struct TableAnchor {
    pub table: String,
    /// Column line directly after `id TEXT PRIMARY KEY,`, without indentation
    pub next_column: String,
    /// Existing index statement the new index is inserted before
    pub index_anchor: Option<String>,
}

impl TableAnchor {
    pub fn new(table: impl Into<String>, next_column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            next_column: next_column.into(),
            index_anchor: None,
        }
    }

    pub fn with_index_anchor(mut self, anchor: impl Into<String>) -> Self {
        self.index_anchor = Some(anchor.into());
        self
    }
}

impl ColumnRetrofit {
    pub fn new(column: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            definition: definition.into(),
            indent: "    ".to_string(),
            index_indent: "  ".to_string(),
            tables: Vec::new(),
        }
    }

    pub fn indent(mut self, indent: impl Into<String>) -> Self {
        self.indent = indent.into();
        self
    }

    pub fn index_indent(mut self, indent: impl Into<String>) -> Self {
        self.index_indent = indent.into();
        self
    }

    pub fn table(mut self, anchor: TableAnchor) -> Self {
        self.tables.push(anchor);
        self
    }

    /// Every generated rule: table DDL first, then indexes.
    pub fn rules(&self) -> Vec<Rule> {
        let mut rules: Vec<Rule> = self.tables.iter().map(|t| self.table_rule(t)).collect();
        rules.extend(self.tables.iter().filter_map(|t| self.index_rule(t)));
        rules
    }

    /// Insert the column right after the primary key of `anchor.table`.
    pub fn table_rule(&self, anchor: &TableAnchor) -> Rule {
        let indent = &self.indent;
        let header = format!(
            "CREATE TABLE IF NOT EXISTS {} (\n{indent}id TEXT PRIMARY KEY,\n",
            anchor.table
        );
        let search = format!("{header}{indent}{},", anchor.next_column);
        let replace = format!(
            "{header}{indent}{},\n{indent}{},",
            self.definition, anchor.next_column
        );

        Rule::literal(format!("{}-table", anchor.table), search, replace).in_change(SCHEMA_CHANGE)
    }

    /// Insert an index on the new column ahead of `anchor.index_anchor`.
    pub fn index_rule(&self, anchor: &TableAnchor) -> Option<Rule> {
        let existing = anchor.index_anchor.as_ref()?;
        let (table, column) = (&anchor.table, &self.column);
        let replace = format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_{column} ON {table}({column});\n{}{existing}",
            self.index_indent
        );

        Some(
            Rule::literal(format!("{table}-index"), existing.clone(), replace)
                .in_change(INDEX_CHANGE),
        )
    }
}
