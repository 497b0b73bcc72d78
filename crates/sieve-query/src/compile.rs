//! Criteria compilation.
//!
//! Resolves each criterion's key path, looks up the declared field type,
//! dispatches to the operator rule and reduces the whole sequence to one
//! backend predicate.

use crate::criteria::{Criterion, DynamicQuery};
use crate::error::{QueryError, QueryResult};
use crate::key_path::resolve;
use crate::predicate::PredicateBuilder;
use crate::reduce::reduce;
use crate::rules::{RuleContext, RuleRegistry};
use crate::schema::FieldTypeLookup;
use crate::value::{StandardDeserializer, ValueDeserializer};
use sieve_config::QueryConfig;
use std::sync::Arc;
use tracing::{debug, trace};

/// Knobs that change compiled output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    pub case_sensitive_text: bool,
    /// Batch size for whole-result consumption
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self::from(&QueryConfig::default())
    }
}

impl From<&QueryConfig> for CompileOptions {
    fn from(config: &QueryConfig) -> Self {
        Self {
            case_sensitive_text: config.case_sensitive_text,
            default_page_size: config.default_page_size,
            max_page_size: config.max_page_size,
        }
    }
}

impl CompileOptions {
    /// Reject page sizes of zero or above the maximum
    pub fn check_page_size(&self, size: u32) -> QueryResult<()> {
        if size == 0 || size > self.max_page_size {
            return Err(QueryError::InvalidPageSize {
                size,
                max: self.max_page_size,
            });
        }
        Ok(())
    }

    /// Validate the envelope's paging, if any
    pub fn check_paging(&self, query: &DynamicQuery) -> QueryResult<()> {
        if let Some(page) = query.page_request_opt()? {
            self.check_page_size(page.size)?;
        }
        Ok(())
    }
}

/// Compiles criteria into predicates of type `P`.
pub struct CriteriaCompiler<P> {
    registry: RuleRegistry<P>,
    fields: Arc<dyn FieldTypeLookup>,
    deserializer: Arc<dyn ValueDeserializer>,
    options: CompileOptions,
}

impl<P> CriteriaCompiler<P> {
    /// Standard rules, standard deserializer, default options
    pub fn new(fields: Arc<dyn FieldTypeLookup>) -> Self {
        Self {
            registry: RuleRegistry::standard(),
            fields,
            deserializer: Arc::new(StandardDeserializer),
            options: CompileOptions::default(),
        }
    }

    pub fn with_registry(mut self, registry: RuleRegistry<P>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_deserializer(mut self, deserializer: Arc<dyn ValueDeserializer>) -> Self {
        self.deserializer = deserializer;
        self
    }

    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    pub fn registry_mut(&mut self) -> &mut RuleRegistry<P> {
        &mut self.registry
    }

    pub fn deserializer(&self) -> &dyn ValueDeserializer {
        self.deserializer.as_ref()
    }

    /// Compile a criteria sequence; `None` means "no filter".
    pub fn compile(
        &self,
        criteria: &[Criterion],
        builder: &mut dyn PredicateBuilder<Predicate = P>,
    ) -> QueryResult<Option<P>> {
        reduce(criteria, builder, |builder, criterion| {
            self.compile_criterion(criterion, builder)
        })
        .map_err(|err| {
            debug!(error = %err, criteria = criteria.len(), "Criteria compilation failed");
            err
        })
    }

    /// Compile one ordinary criterion
    pub fn compile_criterion(
        &self,
        criterion: &Criterion,
        builder: &mut dyn PredicateBuilder<Predicate = P>,
    ) -> QueryResult<P> {
        let path = resolve(&criterion.key)?;
        let field_type = self.fields.type_of(&path)?;
        trace!(
            key = %criterion.key,
            operator = %criterion.operator,
            field_type = %field_type,
            values = criterion.values.len(),
            "Compiling criterion"
        );

        let context = RuleContext {
            field_type: &field_type,
            deserializer: self.deserializer.as_ref(),
            case_sensitive_text: self.options.case_sensitive_text,
        };
        self.registry
            .generate_predicate(&context, &path, builder, criterion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::OperatorKind;
    use crate::schema::fixtures::company;
    use crate::testing::{Expr, ExprBuilder};

    fn compiler() -> CriteriaCompiler<Expr> {
        CriteriaCompiler::new(Arc::new(company()))
    }

    fn compile(criteria: &[Criterion]) -> QueryResult<Option<String>> {
        compiler()
            .compile(criteria, &mut ExprBuilder)
            .map(|expr| expr.map(|e| e.to_string()))
    }

    #[test]
    fn test_compile_with_joins_and_grouping() {
        let criteria = vec![
            Criterion::single("dept.addr<city", OperatorKind::Equal, "Oslo"),
            Criterion::open(),
            Criterion::single("age", OperatorKind::GreaterThanOrEqual, "30"),
            Criterion::or(),
            Criterion::single("status", OperatorKind::Equal, "RETIRED"),
            Criterion::close(),
        ];

        let compiled = compile(&criteria).unwrap().unwrap();

        assert_eq!(
            compiled,
            "(dept.addr<city = Oslo AND (age >= 30 OR status = RETIRED))"
        );
    }

    #[test]
    fn test_equal_pair_with_or() {
        let criteria = vec![
            Criterion::single("id", OperatorKind::Equal, 1),
            Criterion::or(),
            Criterion::single("age", OperatorKind::Equal, 2),
        ];
        assert_eq!(compile(&criteria).unwrap().unwrap(), "(id = 1 OR age = 2)");
    }

    #[test]
    fn test_unknown_field_fails() {
        let criteria = vec![Criterion::single("shoe_size", OperatorKind::Equal, "42")];
        assert!(matches!(compile(&criteria), Err(QueryError::UnknownField { .. })));
    }

    #[test]
    fn test_malformed_key_fails() {
        let criteria = vec![Criterion::single("dept.", OperatorKind::Equal, "x")];
        assert!(matches!(compile(&criteria), Err(QueryError::MalformedKeyPath { .. })));
    }

    #[test]
    fn test_text_rule_type_check_uses_schema() {
        let criteria = vec![Criterion::single("hired", OperatorKind::StartWith, "2024")];
        let err = compile(&criteria).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Operator START_WITH on 'hired' requires a text field, found date"
        );
    }

    #[test]
    fn test_options_from_config() {
        let config = QueryConfig {
            case_sensitive_text: true,
            max_page_size: 50,
            ..Default::default()
        };
        let options = CompileOptions::from(&config);
        assert!(options.case_sensitive_text);
        assert_eq!(options.default_page_size, 20);
        assert!(options.check_page_size(50).is_ok());
        assert!(matches!(
            options.check_page_size(51),
            Err(QueryError::InvalidPageSize { size: 51, max: 50 })
        ));
        assert!(options.check_page_size(0).is_err());
    }

    #[test]
    fn test_check_paging() {
        let options = CompileOptions::default();
        let mut query = DynamicQuery::default();
        assert!(options.check_paging(&query).is_ok());

        query.page_size = Some(10);
        assert!(matches!(options.check_paging(&query), Err(QueryError::MissingPageParameters)));

        query.page_number = Some(0);
        assert!(options.check_paging(&query).is_ok());
    }
}
