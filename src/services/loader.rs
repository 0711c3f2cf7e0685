use crate::config::Config;
use crate::models::table::Table;
use crate::errors::{Result, EtlError};
use crate::util::{csv_utils, year_prefix};
use log::{debug, error, info};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use std::path::PathBuf;
use std::str::FromStr;

// SQLite 单条语句的绑定参数上限（保守取旧版本默认值）
const MAX_BIND_PARAMS: usize = 999;

/// One CSV file appended into one table
#[derive(Debug, Clone)]
pub struct LoadTarget {
    pub table: String,
    pub csv_path: PathBuf,
    pub key_column: String,
    /// Column whose values are cut down to their first four characters
    pub year_column: Option<String>,
}

impl LoadTarget {
    /// Profiles first, then companies
    pub fn from_config(config: &Config) -> Vec<LoadTarget> {
        vec![
            LoadTarget {
                table: "CompanyProfiles".to_string(),
                csv_path: config.profiles_path(),
                key_column: config.profiles_key.clone(),
                year_column: Some(config.profiles_year_column.clone()),
            },
            LoadTarget {
                table: "Companies".to_string(),
                csv_path: config.companies_path(),
                key_column: config.companies_key.clone(),
                year_column: None,
            },
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableLoad {
    pub table: String,
    pub rows_read: usize,
    pub rows_dropped: usize,
    pub rows_appended: u64,
}

#[derive(Debug, Clone, Default)]
pub struct LoadSummary {
    pub tables: Vec<TableLoad>,
}

/// Whether every non-missing cell of `column` reads as a number
fn is_numeric_column(table: &Table, column: usize) -> bool {
    table
        .rows
        .iter()
        .filter_map(|row| row.get(column).and_then(|c| c.as_deref()))
        .all(|v| v.trim().parse::<f64>().is_ok())
}

/// Drop rows with a missing key and truncate the year column.
///
/// Returns the number of dropped rows. A key or year column that is not in
/// the header is a schema error. The year column is only truncated when it
/// holds text; an all-numeric column is left as read.
pub fn prepare_table(table: &mut Table, target: &LoadTarget) -> Result<usize> {
    let key = table.column_index(&target.key_column).ok_or_else(|| {
        EtlError::SchemaError(format!(
            "{}: key column '{}' not found in {}",
            target.table,
            target.key_column,
            target.csv_path.display()
        ))
    })?;

    let year = match &target.year_column {
        Some(year_column) => Some(table.column_index(year_column).ok_or_else(|| {
            EtlError::SchemaError(format!(
                "{}: column '{}' not found in {}",
                target.table,
                year_column,
                target.csv_path.display()
            ))
        })?),
        None => None,
    };
    // 列类型按读入的全部行判断（在删行之前）
    let year = year.filter(|&i| {
        let numeric = is_numeric_column(table, i);
        if numeric {
            debug!("{}: '{}' is numeric, left untruncated", target.table, table.headers[i]);
        }
        !numeric
    });

    let before = table.rows.len();
    table.rows.retain(|row| row.get(key).map_or(false, |c| c.is_some()));
    let dropped = before - table.rows.len();

    if let Some(year) = year {
        for row in table.rows.iter_mut() {
            if let Some(Some(value)) = row.get_mut(year) {
                *value = year_prefix(value);
            }
        }
    }

    Ok(dropped)
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Bulk-appends CSV files into SQLite tables
pub struct Loader {
    pool: SqlitePool,
}

impl Loader {
    /// Open a single-connection pool on `database_url`
    pub async fn connect(database_url: &str) -> Result<Self> {
        info!("Connecting to {}", database_url);

        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Read, clean and append every target inside one transaction.
    ///
    /// All CSV files are read before the database is touched; a failed
    /// append rolls back the appends already made in this call.
    pub async fn load(&self, targets: &[LoadTarget]) -> Result<LoadSummary> {
        let mut prepared = Vec::with_capacity(targets.len());
        for target in targets {
            let mut table = csv_utils::read_table(&target.csv_path)?;
            let rows_read = table.len();
            let rows_dropped = prepare_table(&mut table, target)?;
            info!(
                "{}: read {} rows from {}, dropped {} without '{}'",
                target.table,
                rows_read,
                target.csv_path.display(),
                rows_dropped,
                target.key_column
            );
            prepared.push((target, table, rows_read, rows_dropped));
        }

        let mut tx = self.pool.begin().await?;
        let mut summary = LoadSummary::default();

        for (target, table, rows_read, rows_dropped) in prepared {
            ensure_table(&mut tx, &target.table, &table.headers).await?;
            let rows_appended = match append_rows(&mut tx, &target.table, &table).await {
                Ok(n) => n,
                Err(e) => {
                    error!("Append into {} failed, rolling back: {}", target.table, e);
                    return Err(e);
                }
            };

            info!("{}: appended {} rows", target.table, rows_appended);
            summary.tables.push(TableLoad {
                table: target.table.clone(),
                rows_read,
                rows_dropped,
                rows_appended,
            });
        }

        tx.commit().await?;
        info!("Load completed for {} tables", summary.tables.len());
        Ok(summary)
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

// 表不存在时按CSV表头建表
async fn ensure_table(conn: &mut SqliteConnection, table: &str, headers: &[String]) -> Result<()> {
    if headers.is_empty() {
        return Err(EtlError::LoadError(format!("{}: CSV has no columns", table)));
    }

    let columns = headers
        .iter()
        .map(|h| quote_ident(h))
        .collect::<Vec<_>>()
        .join(", ");

    sqlx::query(&format!("CREATE TABLE IF NOT EXISTS {} ({})", quote_ident(table), columns))
        .execute(&mut *conn)
        .await
        .map_err(|e| EtlError::LoadError(format!("{}: {}", table, e)))?;

    Ok(())
}

async fn append_rows(conn: &mut SqliteConnection, table: &str, data: &Table) -> Result<u64> {
    if data.is_empty() {
        return Ok(0);
    }

    let columns = data
        .headers
        .iter()
        .map(|h| quote_ident(h))
        .collect::<Vec<_>>()
        .join(", ");
    let rows_per_statement = (MAX_BIND_PARAMS / data.headers.len()).max(1);

    let mut appended = 0;
    for chunk in data.rows.chunks(rows_per_statement) {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("INSERT INTO {} ({}) ", quote_ident(table), columns));
        builder.push_values(chunk, |mut b, row| {
            for cell in row {
                b.push_bind(cell.clone());
            }
        });

        let result = builder
            .build()
            .execute(&mut *conn)
            .await
            .map_err(|e| EtlError::LoadError(format!("{}: {}", table, e)))?;
        appended += result.rows_affected();
    }

    Ok(appended)
}
