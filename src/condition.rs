//! Translate compiled descriptors into Sea-ORM query building blocks.
//!
//! The compiler stays storage-agnostic; this module is the concrete shape of
//! the record-store interface for Sea-ORM backends. Columns are referenced
//! by name through [`Alias`] so the bridge works against any entity without
//! code generation.

use sea_orm::sea_query::{Alias, Expr, SimpleExpr};
use sea_orm::{Condition, Order};

use crate::coerce::Value;
use crate::criteria::{Criterion, FilterExpression, Operator};
use crate::fields::FieldSelection;
use crate::sort::{SortDescriptor, SortDirection};

/// Convert a coerced payload into a database value.
#[must_use]
pub fn db_value(value: &Value) -> sea_orm::Value {
    match value {
        Value::Str(text) => text.clone().into(),
        Value::Number(number) => (*number).into(),
        Value::Bool(flag) => (*flag).into(),
        Value::Null => sea_orm::Value::String(None),
        Value::Date(date) => (*date).into(),
    }
}

fn column(field: &str) -> Expr {
    Expr::col(Alias::new(field))
}

/// Split a value list into its non-null members and a null marker; `IN`
/// lists cannot carry SQL NULL directly.
fn split_nulls(items: &[Value]) -> (Vec<sea_orm::Value>, bool) {
    let mut values = Vec::with_capacity(items.len());
    let mut saw_null = false;
    for item in items {
        if item.is_null() {
            saw_null = true;
        } else {
            values.push(db_value(item));
        }
    }
    (values, saw_null)
}

fn comparison(operator: Operator, field: &str, value: &Value) -> SimpleExpr {
    match operator {
        Operator::Not => {
            if value.is_null() {
                column(field).is_not_null()
            } else {
                column(field).ne(db_value(value))
            }
        }
        Operator::LessThan => column(field).lt(db_value(value)),
        Operator::LessThanOrEqual => column(field).lte(db_value(value)),
        Operator::GreaterThan => column(field).gt(db_value(value)),
        Operator::GreaterThanOrEqual => column(field).gte(db_value(value)),
        Operator::StartsWith => column(field).like(format!("{value}%")),
        Operator::EndsWith => column(field).like(format!("%{value}")),
        Operator::Contains => column(field).like(format!("%{value}%")),
        // The payload already carries its `%` wildcards
        Operator::Like => column(field).like(value.to_string()),
    }
}

/// Build the `WHERE` condition for a filter expression, AND-ing every field.
#[must_use]
pub fn filter_condition(filter: &FilterExpression) -> Condition {
    let mut condition = Condition::all();
    for (field, criterion) in filter.iter() {
        match criterion {
            Criterion::Value(value) => {
                condition = if value.is_null() {
                    condition.add(column(field).is_null())
                } else {
                    condition.add(column(field).eq(db_value(value)))
                };
            }
            Criterion::Values(items) => {
                let (values, saw_null) = split_nulls(items);
                condition = if saw_null {
                    condition.add(
                        Condition::any()
                            .add(column(field).is_in(values))
                            .add(column(field).is_null()),
                    )
                } else {
                    condition.add(column(field).is_in(values));
                };
            }
            Criterion::Where(operator, value) => {
                condition = condition.add(comparison(*operator, field, value));
            }
            Criterion::NotAny(items) => {
                let (values, saw_null) = split_nulls(items);
                condition = condition.add(column(field).is_not_in(values));
                if saw_null {
                    condition = condition.add(column(field).is_not_null());
                }
            }
            Criterion::Between { min, max } => {
                if let Some(min) = min {
                    condition = condition.add(column(field).gte(db_value(min)));
                }
                if let Some(max) = max {
                    condition = condition.add(column(field).lte(db_value(max)));
                }
            }
        }
    }
    condition
}

/// The `ORDER BY` clauses for a sort descriptor, in order.
#[must_use]
pub fn order_by_columns(sort: &SortDescriptor) -> Vec<(Alias, Order)> {
    sort.iter()
        .map(|(field, direction)| {
            let order = match direction {
                SortDirection::Asc => Order::Asc,
                SortDirection::Desc => Order::Desc,
            };
            (Alias::new(field), order)
        })
        .collect()
}

/// The column projection for a field selection; `None` selects everything.
#[must_use]
pub fn select_columns(select: &FieldSelection) -> Option<Vec<Alias>> {
    match select {
        FieldSelection::All => None,
        FieldSelection::Only(fields) => {
            Some(fields.iter().map(|field| Alias::new(field)).collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr(field: &str) -> Expr {
        Expr::col(Alias::new(field))
    }

    #[test]
    fn test_equality_and_null() {
        let mut filter = FilterExpression::default();
        filter.insert("name", Criterion::Value(Value::str("Max")));
        filter.insert("deletedAt", Criterion::Value(Value::Null));

        let expected = Condition::all()
            .add(expr("name").eq("Max"))
            .add(expr("deletedAt").is_null());
        assert_eq!(filter_condition(&filter), expected);
    }

    #[test]
    fn test_value_lists_become_in() {
        let mut filter = FilterExpression::default();
        filter.insert(
            "status",
            Criterion::Values(vec![Value::str("1"), Value::str("2")]),
        );

        let expected = Condition::all().add(expr("status").is_in(["1", "2"]));
        assert_eq!(filter_condition(&filter), expected);
    }

    #[test]
    fn test_null_in_a_list_becomes_an_or() {
        let mut filter = FilterExpression::default();
        filter.insert("status", Criterion::Values(vec![Value::str("1"), Value::Null]));

        let expected = Condition::all().add(
            Condition::any()
                .add(expr("status").is_in(["1"]))
                .add(expr("status").is_null()),
        );
        assert_eq!(filter_condition(&filter), expected);
    }

    #[test]
    fn test_comparisons_and_affixes() {
        let mut filter = FilterExpression::default();
        filter.insert("age", Criterion::Where(Operator::GreaterThanOrEqual, Value::str("18")));
        filter.insert("name", Criterion::Where(Operator::StartsWith, Value::str("Ma")));
        filter.insert("email", Criterion::Where(Operator::Contains, Value::str("domain")));
        filter.insert("title", Criterion::Where(Operator::Like, Value::str("M%x")));

        let expected = Condition::all()
            .add(expr("age").gte("18"))
            .add(expr("name").like("Ma%"))
            .add(expr("email").like("%domain%"))
            .add(expr("title").like("M%x"));
        assert_eq!(filter_condition(&filter), expected);
    }

    #[test]
    fn test_not_over_null_and_lists() {
        let mut filter = FilterExpression::default();
        filter.insert("deletedAt", Criterion::Where(Operator::Not, Value::Null));
        filter.insert("status", Criterion::NotAny(vec![Value::str("1"), Value::str("2")]));

        let expected = Condition::all()
            .add(expr("deletedAt").is_not_null())
            .add(expr("status").is_not_in(["1", "2"]));
        assert_eq!(filter_condition(&filter), expected);
    }

    #[test]
    fn test_between_adds_both_bounds() {
        let mut filter = FilterExpression::default();
        filter.insert(
            "age",
            Criterion::Between {
                min: Some(Value::str("18")),
                max: Some(Value::str("65")),
            },
        );

        let expected = Condition::all()
            .add(expr("age").gte("18"))
            .add(expr("age").lte("65"));
        assert_eq!(filter_condition(&filter), expected);
    }

    #[test]
    fn test_order_by_columns() {
        let mut sort = SortDescriptor::default();
        sort.insert("createdAt", SortDirection::Desc);
        sort.insert("name", SortDirection::Asc);

        let clauses = order_by_columns(&sort);
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0].1, Order::Desc);
        assert_eq!(clauses[1].1, Order::Asc);
    }

    #[test]
    fn test_select_columns() {
        assert!(select_columns(&FieldSelection::All).is_none());
        let columns = select_columns(&FieldSelection::Only(vec!["name".to_string()])).unwrap();
        assert_eq!(columns.len(), 1);
    }
}
