use crate::model::{
    BenchmarkEntry, CatalogRecord, HistoryEntry, NormalizedFields, StorageError, SubScores,
};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, Transaction, params};

/// Which benchmark table a name/score pair belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BenchmarkKind {
    Cpu,
    Gpu,
}

impl BenchmarkKind {
    fn table(self) -> &'static str {
        match self {
            BenchmarkKind::Cpu => "cpu_benchmarks",
            BenchmarkKind::Gpu => "gpu_benchmarks",
        }
    }
}

/// Durable store for catalog rows, price/stock history and benchmark tables.
/// One connection per sync run, passed in explicitly; no module-level state.
pub struct CatalogStore {
    conn: Connection,
}

const CATALOG_COLUMNS: &str = "sku, name, category, brand, form_factor, price, msrp, stock, \
     cpu, gpu, gpu_memory_mode, ram, storage, os, screen_size, screen_resolution, \
     touchscreen, keyboard_locale, wifi, url, \
     ff_score, cpu_score, gpu_score, ram_score, storage_score, total_score, \
     date_added, date_updated, in_stock, errors";

impl CatalogStore {
    pub fn new(db_path: &str) -> Result<Self, StorageError> {
        let conn = Connection::open(db_path)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS cpu_benchmarks (
                name TEXT PRIMARY KEY,
                score REAL NOT NULL
            );

            CREATE TABLE IF NOT EXISTS gpu_benchmarks (
                name TEXT PRIMARY KEY,
                score REAL NOT NULL
            );
            ",
        )?;
        Ok(Self { conn })
    }

    /// Creates the per-vendor-region catalog and history tables if needed.
    /// Called once at the start of each category sync.
    pub fn ensure_tables(&self, table: &str) -> Result<(), StorageError> {
        let table = sanitize_table(table);
        self.conn.execute_batch(&format!(
            "
            CREATE TABLE IF NOT EXISTS catalog_{table} (
                sku TEXT PRIMARY KEY,
                name TEXT,
                category TEXT,
                brand TEXT,
                form_factor TEXT,
                price REAL NOT NULL DEFAULT 0 CHECK (price >= 0),
                msrp REAL CHECK (msrp IS NULL OR msrp >= 0),
                stock INTEGER NOT NULL DEFAULT 0 CHECK (stock >= 0),
                cpu TEXT,
                gpu TEXT,
                gpu_memory_mode TEXT,
                ram INTEGER CHECK (ram IS NULL OR ram >= 0),
                storage INTEGER CHECK (storage IS NULL OR storage >= 0),
                os TEXT,
                screen_size REAL,
                screen_resolution TEXT,
                touchscreen TEXT,
                keyboard_locale TEXT,
                wifi TEXT,
                url TEXT,
                ff_score REAL NOT NULL DEFAULT 0,
                cpu_score REAL NOT NULL DEFAULT 0,
                gpu_score REAL NOT NULL DEFAULT 0,
                ram_score REAL NOT NULL DEFAULT 0,
                storage_score REAL NOT NULL DEFAULT 0,
                total_score REAL NOT NULL DEFAULT 0,
                date_added TEXT NOT NULL,
                date_updated TEXT NOT NULL,
                in_stock INTEGER NOT NULL DEFAULT 0,
                errors TEXT NOT NULL DEFAULT ''
            );

            CREATE TABLE IF NOT EXISTS history_{table} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                sku TEXT NOT NULL REFERENCES catalog_{table}(sku),
                timestamp TEXT NOT NULL,
                price REAL NOT NULL,
                stock INTEGER NOT NULL
            );
            "
        ))?;
        Ok(())
    }

    /// Upserts one normalized record and appends its history observation in
    /// a single transaction. Non-volatile fields follow the fill-missing
    /// policy: the first stored non-null value is sticky. `price` and
    /// `stock` always adopt the incoming value.
    pub fn upsert(
        &mut self,
        table: &str,
        fields: &NormalizedFields,
        now: DateTime<Utc>,
    ) -> Result<CatalogRecord, StorageError> {
        let table = sanitize_table(table);
        let tx = self.conn.transaction()?;

        let existing = Self::record_in_tx(&tx, &table, &fields.sku)?;
        let record = match existing {
            None => insert_record(fields, now),
            Some(current) => merge_record(current, fields, now),
        };
        Self::write_record(&tx, &table, &record)?;
        Self::append_history(&tx, &table, &record.sku, record.price, record.stock, now)?;

        tx.commit()?;
        Ok(record)
    }

    /// Blind insert into the history table; never reads or updates prior
    /// entries.
    fn append_history(
        tx: &Transaction,
        table: &str,
        sku: &str,
        price: f64,
        stock: i64,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        tx.execute(
            &format!(
                "INSERT INTO history_{table} (sku, timestamp, price, stock)
                 VALUES (?1, ?2, ?3, ?4)"
            ),
            params![sku, now.to_rfc3339(), price, stock],
        )?;
        Ok(())
    }

    fn write_record(
        tx: &Transaction,
        table: &str,
        record: &CatalogRecord,
    ) -> Result<(), StorageError> {
        tx.execute(
            &format!(
                "INSERT OR REPLACE INTO catalog_{table} ({CATALOG_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                         ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20,
                         ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?29, ?30)"
            ),
            params![
                &record.sku,
                &record.name,
                &record.category,
                &record.brand,
                &record.form_factor,
                record.price,
                record.msrp,
                record.stock,
                &record.cpu,
                &record.gpu,
                &record.gpu_memory_mode,
                record.ram,
                record.storage,
                &record.os,
                record.screen_size,
                &record.screen_resolution,
                &record.touchscreen,
                &record.keyboard_locale,
                &record.wifi,
                &record.url,
                record.ff_score,
                record.cpu_score,
                record.gpu_score,
                record.ram_score,
                record.storage_score,
                record.total_score,
                record.date_added.to_rfc3339(),
                record.date_updated.to_rfc3339(),
                record.in_stock,
                record.errors.join("; "),
            ],
        )?;
        Ok(())
    }

    pub fn record(&self, table: &str, sku: &str) -> Result<Option<CatalogRecord>, StorageError> {
        let table = sanitize_table(table);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CATALOG_COLUMNS} FROM catalog_{table} WHERE sku = ?1"
        ))?;
        let mut rows = stmt.query(params![sku])?;
        match rows.next()? {
            Some(row) => Ok(Some(map_record(row)?)),
            None => Ok(None),
        }
    }

    fn record_in_tx(
        tx: &Transaction,
        table: &str,
        sku: &str,
    ) -> Result<Option<CatalogRecord>, StorageError> {
        let mut stmt = tx.prepare(&format!(
            "SELECT {CATALOG_COLUMNS} FROM catalog_{table} WHERE sku = ?1"
        ))?;
        let mut rows = stmt.query(params![sku])?;
        match rows.next()? {
            Some(row) => Ok(Some(map_record(row)?)),
            None => Ok(None),
        }
    }

    pub fn records(&self, table: &str) -> Result<Vec<CatalogRecord>, StorageError> {
        let table = sanitize_table(table);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CATALOG_COLUMNS} FROM catalog_{table} ORDER BY sku"
        ))?;
        let rows = stmt.query_map([], |row| map_record(row))?;
        let mut records = Vec::new();
        for record in rows {
            records.push(record?);
        }
        Ok(records)
    }

    /// History entries for one SKU in insertion order.
    pub fn history_for(&self, table: &str, sku: &str) -> Result<Vec<HistoryEntry>, StorageError> {
        let table = sanitize_table(table);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT sku, timestamp, price, stock FROM history_{table}
             WHERE sku = ?1 ORDER BY id"
        ))?;
        let rows = stmt.query_map(params![sku], |row| {
            let timestamp: String = row.get(1)?;
            let timestamp = timestamp.parse::<DateTime<Utc>>().map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    1,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;
            Ok(HistoryEntry {
                sku: row.get(0)?,
                timestamp,
                price: row.get(2)?,
                stock: row.get(3)?,
            })
        })?;
        let mut entries = Vec::new();
        for entry in rows {
            entries.push(entry?);
        }
        Ok(entries)
    }

    /// Writes the score columns only; content fields are untouched.
    pub fn update_scores(
        &self,
        table: &str,
        sku: &str,
        scores: &SubScores,
    ) -> Result<(), StorageError> {
        let table = sanitize_table(table);
        let changed = self.conn.execute(
            &format!(
                "UPDATE catalog_{table}
                 SET ff_score = ?1, cpu_score = ?2, gpu_score = ?3,
                     ram_score = ?4, storage_score = ?5, total_score = ?6
                 WHERE sku = ?7"
            ),
            params![
                scores.ff,
                scores.cpu,
                scores.gpu,
                scores.ram,
                scores.storage,
                scores.total,
                sku
            ],
        )?;
        if changed == 0 {
            return Err(StorageError::NotFound(sku.to_string()));
        }
        Ok(())
    }

    /// Replaces one benchmark table wholesale. Refresh is out-of-band with
    /// respect to scoring passes.
    pub fn replace_benchmarks(
        &mut self,
        kind: BenchmarkKind,
        entries: &[BenchmarkEntry],
    ) -> Result<(), StorageError> {
        let tx = self.conn.transaction()?;
        tx.execute(&format!("DELETE FROM {}", kind.table()), [])?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT OR REPLACE INTO {} (name, score) VALUES (?1, ?2)",
                kind.table()
            ))?;
            for entry in entries {
                stmt.execute(params![&entry.name, entry.score])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Benchmark entries sorted by name, so matcher iteration order (and its
    /// tie-break) is deterministic.
    pub fn benchmarks(&self, kind: BenchmarkKind) -> Result<Vec<BenchmarkEntry>, StorageError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT name, score FROM {} ORDER BY name", kind.table()))?;
        let rows = stmt.query_map([], |row| {
            Ok(BenchmarkEntry { name: row.get(0)?, score: row.get(1)? })
        })?;
        let mut entries = Vec::new();
        for entry in rows {
            entries.push(entry?);
        }
        Ok(entries)
    }
}

/// Table names are interpolated into SQL, so restrict them to identifier
/// characters.
fn sanitize_table(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

fn insert_record(fields: &NormalizedFields, now: DateTime<Utc>) -> CatalogRecord {
    let stock = fields.stock.unwrap_or(0).max(0);
    CatalogRecord {
        sku: fields.sku.clone(),
        name: fields.name.clone(),
        category: fields.category.clone(),
        brand: fields.brand.clone(),
        form_factor: fields.form_factor.clone(),
        price: fields.price.unwrap_or(0.0).max(0.0),
        msrp: fields.msrp.map(|m| m.max(0.0)),
        stock,
        cpu: fields.cpu.clone(),
        gpu: fields.gpu.clone(),
        gpu_memory_mode: fields.gpu_memory_mode.clone(),
        ram: fields.ram.map(|r| r.max(0)),
        storage: fields.storage.map(|s| s.max(0)),
        os: fields.os.clone(),
        screen_size: fields.screen_size,
        screen_resolution: fields.screen_resolution.clone(),
        touchscreen: fields.touchscreen.clone(),
        keyboard_locale: fields.keyboard_locale.clone(),
        wifi: fields.wifi.clone(),
        url: fields.url.clone(),
        ff_score: 0.0,
        cpu_score: 0.0,
        gpu_score: 0.0,
        ram_score: 0.0,
        storage_score: 0.0,
        total_score: 0.0,
        date_added: now,
        date_updated: now,
        in_stock: stock > 0,
        errors: Vec::new(),
    }
}

/// Fill-missing for everything except the volatile price/stock pair.
/// `date_added` is immutable; `date_updated` advances on every merge even
/// when nothing else changed.
fn merge_record(
    mut current: CatalogRecord,
    incoming: &NormalizedFields,
    now: DateTime<Utc>,
) -> CatalogRecord {
    fn fill<T: Clone>(slot: &mut Option<T>, incoming: &Option<T>) {
        if slot.is_none() {
            *slot = incoming.clone();
        }
    }

    current.price = incoming.price.unwrap_or(0.0).max(0.0);
    current.stock = incoming.stock.unwrap_or(0).max(0);
    current.in_stock = current.stock > 0;

    fill(&mut current.name, &incoming.name);
    fill(&mut current.category, &incoming.category);
    fill(&mut current.brand, &incoming.brand);
    fill(&mut current.form_factor, &incoming.form_factor);
    fill(&mut current.msrp, &incoming.msrp.map(|m| m.max(0.0)));
    fill(&mut current.cpu, &incoming.cpu);
    fill(&mut current.gpu, &incoming.gpu);
    fill(&mut current.gpu_memory_mode, &incoming.gpu_memory_mode);
    fill(&mut current.ram, &incoming.ram.map(|r| r.max(0)));
    fill(&mut current.storage, &incoming.storage.map(|s| s.max(0)));
    fill(&mut current.os, &incoming.os);
    fill(&mut current.screen_size, &incoming.screen_size);
    fill(&mut current.screen_resolution, &incoming.screen_resolution);
    fill(&mut current.touchscreen, &incoming.touchscreen);
    fill(&mut current.keyboard_locale, &incoming.keyboard_locale);
    fill(&mut current.wifi, &incoming.wifi);
    fill(&mut current.url, &incoming.url);

    current.date_updated = now;
    current
}

fn map_record(row: &Row) -> Result<CatalogRecord, rusqlite::Error> {
    let parse_ts = |idx: usize, text: String| {
        text.parse::<DateTime<Utc>>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
    };
    let date_added: String = row.get(26)?;
    let date_updated: String = row.get(27)?;
    let errors: String = row.get(29)?;

    Ok(CatalogRecord {
        sku: row.get(0)?,
        name: row.get(1)?,
        category: row.get(2)?,
        brand: row.get(3)?,
        form_factor: row.get(4)?,
        price: row.get(5)?,
        msrp: row.get(6)?,
        stock: row.get(7)?,
        cpu: row.get(8)?,
        gpu: row.get(9)?,
        gpu_memory_mode: row.get(10)?,
        ram: row.get(11)?,
        storage: row.get(12)?,
        os: row.get(13)?,
        screen_size: row.get(14)?,
        screen_resolution: row.get(15)?,
        touchscreen: row.get(16)?,
        keyboard_locale: row.get(17)?,
        wifi: row.get(18)?,
        url: row.get(19)?,
        ff_score: row.get(20)?,
        cpu_score: row.get(21)?,
        gpu_score: row.get(22)?,
        ram_score: row.get(23)?,
        storage_score: row.get(24)?,
        total_score: row.get(25)?,
        date_added: parse_ts(26, date_added)?,
        date_updated: parse_ts(27, date_updated)?,
        in_stock: row.get(28)?,
        errors: if errors.is_empty() {
            Vec::new()
        } else {
            errors.split("; ").map(str::to_string).collect()
        },
    })
}
