use crate::types::error::{DatabaseError, Result};

/// A SQL statement with positional `?` placeholders. Parameters are
/// 1-indexed; substitution renders each value into SQL text (strings are
/// single-quoted with `''` escaping, null renders as the NULL keyword).
#[derive(Debug, Clone)]
pub struct PreparedStatement {
    sql: String,
    parameters: Vec<Option<String>>,
}

impl PreparedStatement {
    pub fn new(sql: impl Into<String>) -> Self {
        let sql = sql.into();
        let parameter_count = sql.matches('?').count();
        Self {
            sql,
            parameters: vec![None; parameter_count],
        }
    }

    pub fn set_string(&mut self, index: usize, value: &str) -> Result<()> {
        self.set_raw(index, format!("'{}'", value.replace('\'', "''")))
    }

    pub fn set_int(&mut self, index: usize, value: i32) -> Result<()> {
        self.set_raw(index, value.to_string())
    }

    pub fn set_long(&mut self, index: usize, value: i64) -> Result<()> {
        self.set_raw(index, value.to_string())
    }

    pub fn set_boolean(&mut self, index: usize, value: bool) -> Result<()> {
        self.set_raw(index, value.to_string())
    }

    pub fn set_null(&mut self, index: usize) -> Result<()> {
        self.set_raw(index, "NULL".to_string())
    }

    fn set_raw(&mut self, index: usize, rendered: String) -> Result<()> {
        if index < 1 || index > self.parameters.len() {
            return Err(DatabaseError::ParameterOutOfRange { index });
        }
        self.parameters[index - 1] = Some(rendered);
        Ok(())
    }

    /// Substitutes every placeholder. Fails if any parameter is unset.
    pub fn executable_sql(&self) -> Result<String> {
        let mut result = String::with_capacity(self.sql.len());
        let mut next_parameter = 0;

        for c in self.sql.chars() {
            if c == '?' {
                let value = self.parameters[next_parameter].as_ref().ok_or(
                    DatabaseError::ParameterNotSet {
                        index: next_parameter + 1,
                    },
                )?;
                result.push_str(value);
                next_parameter += 1;
            } else {
                result.push(c);
            }
        }

        Ok(result)
    }

    pub fn clear_parameters(&mut self) {
        for parameter in &mut self.parameters {
            *parameter = None;
        }
    }

    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    pub fn original_sql(&self) -> &str {
        &self.sql
    }
}
