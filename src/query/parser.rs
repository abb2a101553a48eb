use std::collections::BTreeMap;

use regex::Regex;

use crate::{
    query::{
        statement::{JoinType, OrderByColumn, ShowKind, Statement},
        where_clause::{CompareOp, Predicate, WhereCondition},
    },
    schema::column::ColumnDefinition,
    types::{
        data_type::DataType,
        error::{DatabaseError, Result},
    },
};

/// Regex-driven statement parser. Every statement form is recognized by a
/// single anchored pattern; the patterns are compiled once when the parser
/// is constructed. Keywords are case-insensitive, string literals are
/// single-quoted with `''` as the embedded-quote escape.
pub struct SqlParser {
    select_re: Regex,
    join_re: Regex,
    insert_re: Regex,
    update_re: Regex,
    delete_re: Regex,
    create_table_re: Regex,
    create_index_re: Regex,
    show_indexes_re: Regex,
    is_not_null_re: Regex,
    is_null_re: Regex,
    not_like_re: Regex,
    like_re: Regex,
    not_between_re: Regex,
    between_re: Regex,
    not_in_re: Regex,
    in_re: Regex,
    default_re: Regex,
}

impl Default for SqlParser {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlParser {
    pub fn new() -> Self {
        Self {
            select_re: Regex::new(
                r"(?is)^SELECT\s+(.*?)\s+FROM\s+(\w+)(?:\s+WHERE\s+(.*?))?(?:\s+ORDER\s+BY\s+(.*?))?(?:\s+LIMIT\s+(\d+)(?:\s+OFFSET\s+(\d+))?)?$",
            )
            .expect("select pattern"),
            join_re: Regex::new(
                r"(?is)^SELECT\s+(.*?)\s+FROM\s+(\w+)(?:\s+(\w+))?\s+(?:(INNER|LEFT|RIGHT|FULL)\s+)?JOIN\s+(\w+)(?:\s+(\w+))?\s+ON\s+(\w+)\.(\w+)\s*=\s*(\w+)\.(\w+)(?:\s+WHERE\s+(.*?))?$",
            )
            .expect("join pattern"),
            insert_re: Regex::new(
                r"(?is)^INSERT\s+INTO\s+(\w+)\s*\(([^)]+)\)\s*VALUES\s*\((.+)\)$",
            )
            .expect("insert pattern"),
            update_re: Regex::new(r"(?is)^UPDATE\s+(\w+)\s+SET\s+(.+?)(?:\s+WHERE\s+(.+))?$")
                .expect("update pattern"),
            delete_re: Regex::new(r"(?is)^DELETE\s+FROM\s+(\w+)(?:\s+WHERE\s+(.+))?$")
                .expect("delete pattern"),
            create_table_re: Regex::new(r"(?is)^CREATE\s+TABLE\s+(\w+)\s*\((.+)\)$")
                .expect("create table pattern"),
            create_index_re: Regex::new(
                r"(?i)^CREATE\s+INDEX\s+(\w+)\s+ON\s+(\w+)\s*\(\s*(\w+)\s*\)$",
            )
            .expect("create index pattern"),
            show_indexes_re: Regex::new(r"(?i)^SHOW\s+INDEXES(?:\s+FROM\s+(\w+))?$")
                .expect("show indexes pattern"),
            is_not_null_re: Regex::new(r"(?i)^(.+?)\s+IS\s+NOT\s+NULL$").expect("is not null"),
            is_null_re: Regex::new(r"(?i)^(.+?)\s+IS\s+NULL$").expect("is null"),
            not_like_re: Regex::new(r"(?i)^(.+?)\s+NOT\s+LIKE\s+(.+)$").expect("not like"),
            like_re: Regex::new(r"(?i)^(.+?)\s+LIKE\s+(.+)$").expect("like"),
            not_between_re: Regex::new(r"(?i)^(.+?)\s+NOT\s+BETWEEN\s+(.+?)\s+AND\s+(.+)$")
                .expect("not between"),
            between_re: Regex::new(r"(?i)^(.+?)\s+BETWEEN\s+(.+?)\s+AND\s+(.+)$")
                .expect("between"),
            not_in_re: Regex::new(r"(?i)^(.+?)\s+NOT\s+IN\s*\((.+)\)$").expect("not in"),
            in_re: Regex::new(r"(?i)^(.+?)\s+IN\s*\((.+)\)$").expect("in"),
            default_re: Regex::new(r"(?i)\s+DEFAULT\s+(\S+)").expect("default"),
        }
    }

    pub fn parse(&self, sql: &str) -> Result<Statement> {
        let trimmed = sql.trim().trim_end_matches(';').trim_end();
        if trimmed.is_empty() {
            return Err(DatabaseError::Parse {
                details: "SQL statement cannot be empty".to_string(),
            });
        }

        let upper = trimmed.to_uppercase();
        if upper.starts_with("SELECT") {
            if upper.contains(" JOIN ") {
                self.parse_join(trimmed)
            } else {
                self.parse_select(trimmed)
            }
        } else if upper.starts_with("INSERT") {
            self.parse_insert(trimmed)
        } else if upper.starts_with("UPDATE") {
            self.parse_update(trimmed)
        } else if upper.starts_with("DELETE") {
            self.parse_delete(trimmed)
        } else if upper.starts_with("CREATE TABLE") {
            self.parse_create_table(trimmed)
        } else if upper.starts_with("CREATE INDEX") {
            self.parse_create_index(trimmed)
        } else if upper.starts_with("SHOW") {
            self.parse_show(trimmed)
        } else if upper.starts_with("EXPLAIN") {
            self.parse_explain(trimmed)
        } else if upper.starts_with("VACUUM") {
            self.parse_vacuum(trimmed)
        } else if upper.starts_with("ANALYZE") {
            self.parse_analyze(trimmed)
        } else {
            Err(DatabaseError::UnsupportedStatement {
                sql: trimmed.to_string(),
            })
        }
    }

    fn parse_select(&self, sql: &str) -> Result<Statement> {
        let captures = self.select_re.captures(sql).ok_or_else(|| DatabaseError::Parse {
            details: format!("Invalid SELECT statement: {}", sql),
        })?;

        let columns = parse_column_list(captures.get(1).map_or("", |m| m.as_str()));
        let table = captures[2].trim().to_string();
        let where_clause = match captures.get(3) {
            Some(clause) => Some(self.parse_where_clause(clause.as_str())?),
            None => None,
        };
        let order_by = match captures.get(4) {
            Some(clause) => parse_order_by(clause.as_str()),
            None => Vec::new(),
        };
        let limit = parse_bound(captures.get(5).map(|m| m.as_str()))?;
        let offset = parse_bound(captures.get(6).map(|m| m.as_str()))?;

        Ok(Statement::Select {
            table,
            columns,
            where_clause,
            order_by,
            limit,
            offset,
        })
    }

    fn parse_join(&self, sql: &str) -> Result<Statement> {
        let captures = self.join_re.captures(sql).ok_or_else(|| DatabaseError::Parse {
            details: format!("Invalid JOIN statement: {}", sql),
        })?;

        let columns = parse_column_list(&captures[1]);
        let left_table = captures[2].trim().to_string();

        // Without an alias the greedy alias group swallows the join-type
        // keyword ("FROM users LEFT JOIN ..."), so check both groups.
        let join_keyword = captures
            .get(4)
            .map(|m| m.as_str().to_uppercase())
            .or_else(|| {
                captures
                    .get(3)
                    .map(|m| m.as_str().to_uppercase())
                    .filter(|alias| matches!(alias.as_str(), "INNER" | "LEFT" | "RIGHT" | "FULL"))
            });
        let join_type = match join_keyword.as_deref() {
            Some("LEFT") => JoinType::Left,
            Some("RIGHT") => JoinType::Right,
            Some("FULL") => JoinType::Full,
            _ => JoinType::Inner,
        };
        let right_table = captures[5].trim().to_string();
        let left_column = captures[8].trim().to_string();
        let right_column = captures[10].trim().to_string();
        let where_clause = match captures.get(11) {
            Some(clause) => Some(self.parse_where_clause(clause.as_str())?),
            None => None,
        };

        Ok(Statement::Join {
            columns,
            left_table,
            right_table,
            left_column,
            right_column,
            join_type,
            where_clause,
        })
    }

    fn parse_insert(&self, sql: &str) -> Result<Statement> {
        let captures = self.insert_re.captures(sql).ok_or_else(|| DatabaseError::Parse {
            details: format!("Invalid INSERT statement: {}", sql),
        })?;

        let table = captures[1].trim().to_string();
        let columns = parse_column_list(&captures[2]);
        let values = split_respecting_quotes(&captures[3]);

        if columns.len() != values.len() {
            return Err(DatabaseError::Parse {
                details: "Column count doesn't match value count".to_string(),
            });
        }

        // The NULL literal becomes an absent key.
        let mut column_values = BTreeMap::new();
        for (column, raw) in columns.into_iter().zip(values) {
            if let Some(value) = parse_literal(&raw) {
                column_values.insert(column, value);
            }
        }

        Ok(Statement::Insert {
            table,
            values: column_values,
        })
    }

    fn parse_update(&self, sql: &str) -> Result<Statement> {
        let captures = self.update_re.captures(sql).ok_or_else(|| DatabaseError::Parse {
            details: format!("Invalid UPDATE statement: {}", sql),
        })?;

        let table = captures[1].trim().to_string();
        let updates = self.parse_set_clause(&captures[2])?;
        let where_clause = match captures.get(3) {
            Some(clause) => Some(self.parse_where_clause(clause.as_str())?),
            None => None,
        };

        Ok(Statement::Update {
            table,
            updates,
            where_clause,
        })
    }

    fn parse_set_clause(&self, set_clause: &str) -> Result<BTreeMap<String, Option<String>>> {
        let mut updates = BTreeMap::new();
        for assignment in split_respecting_quotes(set_clause) {
            let Some((column, raw_value)) = assignment.split_once('=') else {
                return Err(DatabaseError::Parse {
                    details: format!("Invalid SET clause: {}", assignment),
                });
            };
            updates.insert(
                column.trim().to_string(),
                parse_literal(raw_value.trim()),
            );
        }
        Ok(updates)
    }

    fn parse_delete(&self, sql: &str) -> Result<Statement> {
        let captures = self.delete_re.captures(sql).ok_or_else(|| DatabaseError::Parse {
            details: format!("Invalid DELETE statement: {}", sql),
        })?;

        let table = captures[1].trim().to_string();
        let where_clause = match captures.get(2) {
            Some(clause) => Some(self.parse_where_clause(clause.as_str())?),
            None => None,
        };

        Ok(Statement::Delete {
            table,
            where_clause,
        })
    }

    fn parse_create_table(&self, sql: &str) -> Result<Statement> {
        let captures = self
            .create_table_re
            .captures(sql)
            .ok_or_else(|| DatabaseError::Parse {
                details: format!("Invalid CREATE TABLE statement: {}", sql),
            })?;

        let table = captures[1].trim().to_string();
        let columns = self.parse_column_definitions(&captures[2])?;
        if columns.is_empty() {
            return Err(DatabaseError::Parse {
                details: format!("CREATE TABLE {} declares no columns", table),
            });
        }

        Ok(Statement::CreateTable { table, columns })
    }

    fn parse_column_definitions(&self, columns_str: &str) -> Result<Vec<ColumnDefinition>> {
        let mut columns = Vec::new();
        for part in split_respecting_quotes(columns_str) {
            let tokens: Vec<&str> = part.split_whitespace().collect();
            if tokens.len() < 2 {
                return Err(DatabaseError::Parse {
                    details: format!("Invalid column definition: {}", part),
                });
            }

            let name = tokens[0].to_string();
            let data_type = DataType::from_type_str(tokens[1])?;
            let upper = part.to_uppercase();

            let mut column = ColumnDefinition::new(name, data_type);
            column.primary_key = upper.contains("PRIMARY KEY");
            column.auto_increment = upper.contains("AUTO_INCREMENT");
            column.unique = upper.contains("UNIQUE") && !column.primary_key;
            column.not_null = upper.contains("NOT NULL") && !column.primary_key;
            if let Some(default) = self.default_re.captures(&part) {
                column.default_value = parse_literal(&default[1]);
            }

            columns.push(column);
        }
        Ok(columns)
    }

    fn parse_create_index(&self, sql: &str) -> Result<Statement> {
        let captures = self
            .create_index_re
            .captures(sql)
            .ok_or_else(|| DatabaseError::Parse {
                details: format!("Invalid CREATE INDEX statement: {}", sql),
            })?;

        Ok(Statement::CreateIndex {
            index_name: captures[1].trim().to_string(),
            table: captures[2].trim().to_string(),
            column: captures[3].trim().to_string(),
        })
    }

    fn parse_show(&self, sql: &str) -> Result<Statement> {
        let upper = sql.to_uppercase();
        if upper == "SHOW TABLES" {
            return Ok(Statement::Show {
                kind: ShowKind::Tables,
                table: None,
            });
        }
        if upper == "SHOW STATS" {
            return Ok(Statement::Show {
                kind: ShowKind::Stats,
                table: None,
            });
        }
        if upper == "SHOW DATABASES" {
            return Ok(Statement::Show {
                kind: ShowKind::Databases,
                table: None,
            });
        }
        if let Some(captures) = self.show_indexes_re.captures(sql) {
            return Ok(Statement::Show {
                kind: ShowKind::Indexes,
                table: captures.get(1).map(|m| m.as_str().to_string()),
            });
        }
        Err(DatabaseError::Parse {
            details: format!("Unsupported SHOW statement: {}", sql),
        })
    }

    fn parse_explain(&self, sql: &str) -> Result<Statement> {
        let inner_sql = sql["EXPLAIN".len()..].trim();
        let inner = self.parse(inner_sql)?;
        Ok(Statement::Explain {
            inner: Box::new(inner),
        })
    }

    fn parse_vacuum(&self, sql: &str) -> Result<Statement> {
        let parts: Vec<&str> = sql.split_whitespace().collect();
        match parts.len() {
            1 => Ok(Statement::Vacuum { table: None }),
            2 => Ok(Statement::Vacuum {
                table: Some(parts[1].to_string()),
            }),
            _ => Err(DatabaseError::Parse {
                details: format!("Invalid VACUUM statement: {}", sql),
            }),
        }
    }

    fn parse_analyze(&self, sql: &str) -> Result<Statement> {
        let parts: Vec<&str> = sql.split_whitespace().collect();
        match parts.len() {
            1 => Ok(Statement::Analyze { table: None }),
            2 => Ok(Statement::Analyze {
                table: Some(parts[1].to_string()),
            }),
            _ => Err(DatabaseError::Parse {
                details: format!("Invalid ANALYZE statement: {}", sql),
            }),
        }
    }

    /// Single-predicate WHERE grammar. Forms are tried most-specific
    /// first; the first pattern that matches wins.
    pub fn parse_where_clause(&self, clause: &str) -> Result<WhereCondition> {
        let clause = clause.trim();

        if let Some(captures) = self.is_not_null_re.captures(clause) {
            return Ok(WhereCondition::new(captures[1].trim(), Predicate::IsNotNull));
        }
        if let Some(captures) = self.is_null_re.captures(clause) {
            return Ok(WhereCondition::new(captures[1].trim(), Predicate::IsNull));
        }
        if let Some(captures) = self.not_like_re.captures(clause) {
            return Ok(WhereCondition::new(
                captures[1].trim(),
                Predicate::Like {
                    pattern: unquote(captures[2].trim()),
                    negated: true,
                },
            ));
        }
        if let Some(captures) = self.like_re.captures(clause) {
            return Ok(WhereCondition::new(
                captures[1].trim(),
                Predicate::Like {
                    pattern: unquote(captures[2].trim()),
                    negated: false,
                },
            ));
        }
        if let Some(captures) = self.not_between_re.captures(clause) {
            return Ok(WhereCondition::new(
                captures[1].trim(),
                Predicate::Between {
                    low: unquote(captures[2].trim()),
                    high: unquote(captures[3].trim()),
                    negated: true,
                },
            ));
        }
        if let Some(captures) = self.between_re.captures(clause) {
            return Ok(WhereCondition::new(
                captures[1].trim(),
                Predicate::Between {
                    low: unquote(captures[2].trim()),
                    high: unquote(captures[3].trim()),
                    negated: false,
                },
            ));
        }
        if let Some(captures) = self.not_in_re.captures(clause) {
            return Ok(WhereCondition::new(
                captures[1].trim(),
                Predicate::InList {
                    values: parse_value_list(&captures[2]),
                    negated: true,
                },
            ));
        }
        if let Some(captures) = self.in_re.captures(clause) {
            return Ok(WhereCondition::new(
                captures[1].trim(),
                Predicate::InList {
                    values: parse_value_list(&captures[2]),
                    negated: false,
                },
            ));
        }

        for (symbol, op) in [
            (">=", CompareOp::GtEq),
            ("<=", CompareOp::LtEq),
            ("!=", CompareOp::NotEq),
            ("<>", CompareOp::NotEq),
            (">", CompareOp::Gt),
            ("<", CompareOp::Lt),
            ("=", CompareOp::Eq),
        ] {
            if let Some((column, value)) = clause.split_once(symbol) {
                return Ok(WhereCondition::new(
                    column.trim(),
                    Predicate::Compare {
                        op,
                        value: unquote(value.trim()),
                    },
                ));
            }
        }

        Err(DatabaseError::Parse {
            details: format!("Unsupported WHERE clause: {}", clause),
        })
    }
}

fn parse_column_list(columns_str: &str) -> Vec<String> {
    let trimmed = columns_str.trim();
    if trimmed == "*" {
        return vec!["*".to_string()];
    }
    trimmed
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_order_by(order_by_clause: &str) -> Vec<OrderByColumn> {
    order_by_clause
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|part| {
            let mut tokens = part.split_whitespace();
            let column = tokens.next().unwrap_or_default().to_string();
            let ascending = !tokens
                .next()
                .map(|direction| direction.eq_ignore_ascii_case("DESC"))
                .unwrap_or(false);
            OrderByColumn { column, ascending }
        })
        .collect()
}

fn parse_bound(value: Option<&str>) -> Result<Option<usize>> {
    match value {
        None => Ok(None),
        Some(raw) => raw
            .parse::<usize>()
            .map(Some)
            .map_err(|_| DatabaseError::Parse {
                details: format!("Invalid numeric bound: {}", raw),
            }),
    }
}

/// Splits a comma-separated list while treating commas inside
/// single-quoted literals as part of the literal. `''` inside a literal is
/// the escaped quote.
fn split_respecting_quotes(input: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                if in_quotes && chars.peek() == Some(&'\'') {
                    current.push('\'');
                    current.push(chars.next().expect("peeked quote"));
                    continue;
                }
                in_quotes = !in_quotes;
                current.push(c);
            }
            ',' if !in_quotes => {
                parts.push(current.trim().to_string());
                current.clear();
            }
            c => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

/// Strips surrounding single quotes and collapses `''` escapes.
fn unquote(value: &str) -> String {
    if value.len() >= 2 && value.starts_with('\'') && value.ends_with('\'') {
        value[1..value.len() - 1].replace("''", "'")
    } else {
        value.to_string()
    }
}

/// A literal from VALUES or SET: quoted text stays text (even 'NULL'),
/// while the bare NULL keyword means absence.
fn parse_literal(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('\'') && trimmed.ends_with('\'') {
        return Some(unquote(trimmed));
    }
    if trimmed.eq_ignore_ascii_case("NULL") {
        return None;
    }
    Some(trimmed.to_string())
}

fn parse_value_list(values_str: &str) -> Vec<String> {
    split_respecting_quotes(values_str)
        .iter()
        .map(|v| unquote(v))
        .collect()
}
