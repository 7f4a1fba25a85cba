// restoretool/src/gateway/mod.rs
use async_trait::async_trait;
use tiberius::{Client, ColumnData, Config};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use crate::errors::GatewayError;

/// One engine-reported value, narrowed at the connection boundary. Planning
/// and execution code only ever sees these, never driver row types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Text(String),
    Int(i64),
    Null,
}

impl SqlValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            SqlValue::Int(n) => Some(*n),
            _ => None,
        }
    }
}

/// A loosely-typed result row that still knows its column names. Consumers
/// must look columns up by name: the engine reorders and extends result sets
/// across versions, so positional access is never safe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlRow {
    columns: Vec<String>,
    values: Vec<SqlValue>,
}

impl SqlRow {
    pub fn new(columns: Vec<String>, values: Vec<SqlValue>) -> Self {
        SqlRow { columns, values }
    }

    /// Case-insensitive column lookup.
    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .and_then(|idx| self.values.get(idx))
    }

    pub fn first_value(&self) -> Option<&SqlValue> {
        self.values.first()
    }
}

/// The administrative connection to the target engine. Each restore
/// invocation owns exactly one gateway; nothing is shared across invocations.
#[async_trait]
pub trait ConnectionGateway: Send {
    /// Runs a command batch, discarding any result sets.
    async fn execute(&mut self, sql: &str) -> Result<(), GatewayError>;

    /// Runs a query and returns the first value of the first row, if any.
    async fn query_scalar(&mut self, sql: &str) -> Result<Option<SqlValue>, GatewayError>;

    /// Runs a query and returns every row of every result set, in order.
    async fn query_rows(&mut self, sql: &str) -> Result<Vec<SqlRow>, GatewayError>;
}

/// Quotes a T-SQL identifier: `[name]`, with `]` doubled.
pub fn quote_ident(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

/// Quotes a T-SQL unicode string literal: `N'value'`, with `'` doubled.
pub fn quote_literal(value: &str) -> String {
    format!("N'{}'", value.replace('\'', "''"))
}

/// Production gateway over a TDS connection.
pub struct TiberiusGateway {
    client: Client<Compat<TcpStream>>,
}

impl TiberiusGateway {
    /// Opens a connection from an ADO-style connection string
    /// (e.g. `server=tcp:localhost,1433;user=sa;password=...`).
    pub async fn connect(connection_string: &str) -> Result<Self, GatewayError> {
        let config = Config::from_ado_string(connection_string)?;
        let tcp = TcpStream::connect(config.get_addr()).await?;
        tcp.set_nodelay(true)?;
        let client = Client::connect(config, tcp.compat_write()).await?;
        Ok(TiberiusGateway { client })
    }
}

#[async_trait]
impl ConnectionGateway for TiberiusGateway {
    async fn execute(&mut self, sql: &str) -> Result<(), GatewayError> {
        // simple_query, not a prepared statement: RESTORE/ALTER/KILL are not
        // valid inside sp_executesql.
        let stream = self.client.simple_query(sql).await?;
        stream.into_results().await?;
        Ok(())
    }

    async fn query_scalar(&mut self, sql: &str) -> Result<Option<SqlValue>, GatewayError> {
        let rows = self.query_rows(sql).await?;
        Ok(rows.first().and_then(|r| r.first_value()).cloned())
    }

    async fn query_rows(&mut self, sql: &str) -> Result<Vec<SqlRow>, GatewayError> {
        let stream = self.client.simple_query(sql).await?;
        let results = stream.into_results().await?;
        let mut rows = Vec::new();
        for result in results {
            for row in result {
                let mut columns = Vec::new();
                let mut values = Vec::new();
                for (column, data) in row.cells() {
                    columns.push(column.name().to_string());
                    values.push(narrow_column(data));
                }
                rows.push(SqlRow::new(columns, values));
            }
        }
        Ok(rows)
    }
}

fn narrow_column(data: &ColumnData<'_>) -> SqlValue {
    match data {
        ColumnData::String(Some(s)) => SqlValue::Text(s.to_string()),
        ColumnData::U8(Some(n)) => SqlValue::Int(i64::from(*n)),
        ColumnData::I16(Some(n)) => SqlValue::Int(i64::from(*n)),
        ColumnData::I32(Some(n)) => SqlValue::Int(i64::from(*n)),
        ColumnData::I64(Some(n)) => SqlValue::Int(*n),
        ColumnData::Bit(Some(b)) => SqlValue::Int(i64::from(*b)),
        _ => SqlValue::Null,
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident_doubles_closing_bracket() {
        assert_eq!(quote_ident("Sample"), "[Sample]");
        assert_eq!(quote_ident("weird]name"), "[weird]]name]");
    }

    #[test]
    fn test_quote_literal_doubles_single_quote() {
        assert_eq!(quote_literal("plain"), "N'plain'");
        assert_eq!(quote_literal("O'Brien"), "N'O''Brien'");
    }

    #[test]
    fn test_row_lookup_is_case_insensitive() {
        let row = SqlRow::new(
            vec!["LogicalName".to_string(), "Type".to_string()],
            vec![SqlValue::Text("sample_data".to_string()), SqlValue::Text("D".to_string())],
        );
        assert_eq!(row.get("logicalname").and_then(SqlValue::as_text), Some("sample_data"));
        assert_eq!(row.get("TYPE").and_then(SqlValue::as_text), Some("D"));
        assert!(row.get("missing").is_none());
    }
}
