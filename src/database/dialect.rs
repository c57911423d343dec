//! SQL dialect strategy table.
//!
//! Each [`Dialect`] maps to a static [`DialectTemplates`] describing how it
//! quotes identifiers, casts to text, matches regular expressions and pages.
//! Orchestration code only ever talks to [`Dialect`] methods, so supporting a
//! new driver means adding one table entry.

use sea_orm::{
    DatabaseBackend,
    sea_query::{Alias, BinOper, Func, IntoIden, Keyword, SimpleExpr},
};

use crate::config::DEFAULT_NULLS_LAST_SQL;

/// SQL flavour the engine compiles for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    Postgres,
    MySql,
    Sqlite,
    Oracle,
    Firebird,
    /// Unrecognised drivers, compiled with MySQL-family templates.
    Generic,
}

/// How a dialect matches a regular expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegexForm {
    /// Infix operator, `col ~ ?`
    Operator(&'static str),
    /// Function call with an optional flags literal, `REGEXP_LIKE(col, ?, 'i')`
    Function {
        name: &'static str,
        flags: Option<&'static str>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PagingStyle {
    LimitOffset,
    OffsetFetch,
    Rows,
}

/// Per-dialect SQL templates.
#[derive(Debug)]
pub struct DialectTemplates {
    quote: char,
    /// `{}` is replaced by the column expression.
    cast_to_text: Option<&'static str>,
    regex: RegexForm,
    regex_insensitive: RegexForm,
    /// Wrap the column in `LOWER()` for case-insensitive regex.
    regex_lower_column: bool,
    /// Lower-case the keyword for case-insensitive regex.
    regex_lower_keyword: bool,
    paging: PagingStyle,
}

const POSTGRES: DialectTemplates = DialectTemplates {
    quote: '"',
    cast_to_text: Some("CAST({} AS TEXT)"),
    regex: RegexForm::Operator("~"),
    regex_insensitive: RegexForm::Operator("~*"),
    regex_lower_column: false,
    regex_lower_keyword: false,
    paging: PagingStyle::LimitOffset,
};

const MYSQL: DialectTemplates = DialectTemplates {
    quote: '`',
    cast_to_text: None,
    regex: RegexForm::Operator("REGEXP"),
    regex_insensitive: RegexForm::Operator("REGEXP"),
    regex_lower_column: true,
    regex_lower_keyword: true,
    paging: PagingStyle::LimitOffset,
};

const SQLITE: DialectTemplates = DialectTemplates {
    quote: '"',
    ..MYSQL
};

const ORACLE: DialectTemplates = DialectTemplates {
    quote: '"',
    cast_to_text: None,
    regex: RegexForm::Function {
        name: "REGEXP_LIKE",
        flags: None,
    },
    regex_insensitive: RegexForm::Function {
        name: "REGEXP_LIKE",
        flags: Some("i"),
    },
    regex_lower_column: true,
    regex_lower_keyword: false,
    paging: PagingStyle::OffsetFetch,
};

const FIREBIRD: DialectTemplates = DialectTemplates {
    quote: '"',
    cast_to_text: Some("CAST({} AS VARCHAR(255))"),
    paging: PagingStyle::Rows,
    ..MYSQL
};

const GENERIC: DialectTemplates = DialectTemplates {
    quote: '"',
    ..MYSQL
};

/// Already-quoted SQL used as an operand, written out verbatim.
///
/// sea-query parenthesizes `SimpleExpr::Custom` on the left of an operator;
/// a custom keyword is rendered as-is on every backend.
#[must_use]
pub fn sql_operand(sql: impl Into<String>) -> SimpleExpr {
    SimpleExpr::Keyword(Keyword::Custom(Alias::new(sql).into_iden()))
}

/// A compiled regex match, ready to receive its keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegexPredicate {
    /// Left-hand side SQL, already wrapped in `LOWER()` when needed.
    pub column: String,
    pub form: RegexForm,
    /// The keyword must be lower-cased before binding.
    pub lower_keyword: bool,
}

impl RegexPredicate {
    /// Bind the keyword and produce the predicate expression.
    #[must_use]
    pub fn build(&self, keyword: &str) -> SimpleExpr {
        let keyword = if self.lower_keyword {
            keyword.to_lowercase()
        } else {
            keyword.to_string()
        };
        let column = sql_operand(self.column.clone());
        let value = SimpleExpr::Value(keyword.into());

        match self.form {
            RegexForm::Operator(op) => {
                SimpleExpr::Binary(Box::new(column), BinOper::Custom(op), Box::new(value))
            }
            RegexForm::Function { name, flags } => {
                let mut call = Func::cust(Alias::new(name)).arg(column).arg(value);
                if let Some(flags) = flags {
                    call = call.arg(sql_operand(format!("'{flags}'")));
                }
                SimpleExpr::FunctionCall(call)
            }
        }
    }
}

impl From<DatabaseBackend> for Dialect {
    fn from(backend: DatabaseBackend) -> Self {
        match backend {
            DatabaseBackend::Postgres => Self::Postgres,
            DatabaseBackend::MySql => Self::MySql,
            DatabaseBackend::Sqlite => Self::Sqlite,
        }
    }
}

impl Dialect {
    /// Resolve a driver name such as `pgsql` or `oracle`.
    ///
    /// Unknown drivers degrade to [`Dialect::Generic`] instead of failing.
    #[must_use]
    pub fn from_driver_name(driver: &str) -> Self {
        match driver.trim().to_ascii_lowercase().as_str() {
            "pgsql" | "postgres" | "postgresql" => Self::Postgres,
            "mysql" | "mariadb" => Self::MySql,
            "sqlite" | "sqlite3" => Self::Sqlite,
            "oracle" | "oci8" => Self::Oracle,
            "firebird" => Self::Firebird,
            other => {
                tracing::warn!(driver = %other, "Unsupported driver, using generic SQL templates");
                Self::Generic
            }
        }
    }

    #[must_use]
    pub const fn templates(self) -> &'static DialectTemplates {
        match self {
            Self::Postgres => &POSTGRES,
            Self::MySql => &MYSQL,
            Self::Sqlite => &SQLITE,
            Self::Oracle => &ORACLE,
            Self::Firebird => &FIREBIRD,
            Self::Generic => &GENERIC,
        }
    }

    /// Quote a single identifier; `*` is passed through.
    #[must_use]
    pub fn quote_identifier(self, name: &str) -> String {
        if name == "*" {
            return name.to_string();
        }
        let quote = self.templates().quote;
        let escaped = name.replace(quote, &format!("{quote}{quote}"));
        format!("{quote}{escaped}{quote}")
    }

    /// Quote every segment of a dotted path such as `users.name`.
    #[must_use]
    pub fn quote_path(self, path: &str) -> String {
        path.split('.')
            .map(|segment| self.quote_identifier(segment.trim()))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Cast an expression to text where the dialect needs it for `LIKE`.
    #[must_use]
    pub fn cast_to_text(self, expr: &str) -> String {
        self.templates()
            .cast_to_text
            .map_or_else(|| expr.to_string(), |template| template.replace("{}", expr))
    }

    #[must_use]
    pub fn regex_predicate(self, expr: &str, case_insensitive: bool) -> RegexPredicate {
        let templates = self.templates();
        if case_insensitive {
            RegexPredicate {
                column: if templates.regex_lower_column {
                    format!("LOWER({expr})")
                } else {
                    expr.to_string()
                },
                form: templates.regex_insensitive,
                lower_keyword: templates.regex_lower_keyword,
            }
        } else {
            RegexPredicate {
                column: expr.to_string(),
                form: templates.regex,
                lower_keyword: false,
            }
        }
    }

    /// Format a NULLS LAST template: first `%s` is the column, second the direction.
    ///
    /// Templates without two slots degrade to [`DEFAULT_NULLS_LAST_SQL`].
    #[must_use]
    pub fn nulls_last(self, column: &str, direction: &str, template: &str) -> String {
        let template = if template.matches("%s").count() == 2 {
            template
        } else {
            tracing::warn!(template = %template, "Invalid NULLS LAST template, using default");
            DEFAULT_NULLS_LAST_SQL
        };
        template.replacen("%s", column, 1).replacen("%s", direction, 1)
    }

    /// Paging clause appended after ORDER BY.
    #[must_use]
    pub fn limit_clause(self, offset: u64, limit: u64) -> String {
        match self.templates().paging {
            PagingStyle::LimitOffset => format!("LIMIT {limit} OFFSET {offset}"),
            PagingStyle::OffsetFetch => {
                format!("OFFSET {offset} ROWS FETCH NEXT {limit} ROWS ONLY")
            }
            PagingStyle::Rows => format!(
                "ROWS {} TO {}",
                offset.saturating_add(1),
                offset.saturating_add(limit)
            ),
        }
    }
}
