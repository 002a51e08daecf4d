//! Conjunctions of field conditions for one host type.

use serde_json::Value;

use crate::finder::FieldCondition;
use crate::sql::{condition_sql, quote_identifier, scoped_cte, Params, Sql, SqlConfig};

/// Every condition must hold for a host to match. An empty query places no
/// restriction on hosts.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldQuery {
    host_type: String,
    conditions: Vec<FieldCondition>,
}

impl FieldQuery {
    pub fn new(host_type: impl Into<String>) -> Self {
        FieldQuery {
            host_type: host_type.into(),
            conditions: Vec::new(),
        }
    }

    pub fn with(mut self, condition: FieldCondition) -> Self {
        self.push(condition);
        self
    }

    pub fn push(&mut self, condition: FieldCondition) {
        self.conditions.push(condition);
    }

    pub fn host_type(&self) -> &str {
        &self.host_type
    }

    pub fn conditions(&self) -> &[FieldCondition] {
        &self.conditions
    }

    pub fn is_unconstrained(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Whether a host's stored values (looked up by field id) satisfy every
    /// condition. A host without a value row for a condition's field does
    /// not match it.
    pub fn matches_host<'v>(&self, mut stored_for: impl FnMut(&str) -> Option<&'v Value>) -> bool {
        self.conditions.iter().all(|c| {
            stored_for(&c.field_id).is_some_and(|stored| c.matches(stored))
        })
    }

    /// Render to a statement selecting matching host ids, or `None` when
    /// the query is unconstrained.
    pub fn to_sql(&self, config: &SqlConfig) -> Option<Sql> {
        if self.conditions.is_empty() {
            return None;
        }
        let mut params = Params::default();
        let mut ctes = Vec::with_capacity(self.conditions.len());
        let mut selects = Vec::with_capacity(self.conditions.len());
        for (i, condition) in self.conditions.iter().enumerate() {
            let name = format!("{}{}", config.cte_prefix, i);
            ctes.push(scoped_cte(
                config,
                &name,
                &condition.field_id,
                &self.host_type,
                &mut params,
            ));
            let predicate = condition_sql(config, condition, &mut params);
            selects.push(format!(
                "SELECT {} FROM {} WHERE {}",
                quote_identifier(&config.host_id_column),
                quote_identifier(&name),
                predicate
            ));
        }
        let sql = Sql {
            text: format!("WITH {}\n{}", ctes.join(",\n"), selects.join("\nINTERSECT\n")),
            params: params.into_values(),
        };
        tracing::debug!(
            host_type = %self.host_type,
            conditions = self.conditions.len(),
            params = sql.params.len(),
            "rendered field query"
        );
        Some(sql)
    }
}
