use std::fs;
use std::path::{Path, PathBuf};

use super::types::HistoryRow;
use super::HistoryError;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// File-backed History Store (CSV, UTF-8 with BOM).
///
/// Every append reads the whole table, pushes one row and rewrites the
/// file. There is no lock: two writers racing on the same file lose rows
/// (last writer wins).
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// All rows in file order. An absent store is empty; an unreadable one
    /// is an error.
    pub fn load(&self) -> Result<Vec<HistoryRow>, HistoryError> {
        if !self.exists() {
            return Ok(Vec::new());
        }
        let bytes = fs::read(&self.path)?;
        parse_rows(&bytes)
    }

    /// Rows for read-only consumers: a corrupt store reads as empty.
    pub fn load_lenient(&self) -> Vec<HistoryRow> {
        match self.load() {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "History store unreadable, treating as empty"
                );
                Vec::new()
            }
        }
    }

    /// Append one row and return the new row count. A store that exists
    /// but cannot be parsed is left untouched.
    pub fn append(&self, row: HistoryRow) -> Result<usize, HistoryError> {
        let mut rows = self.load()?;
        rows.push(row);

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let bytes = rows_to_csv(&rows)?;
        let tmp = self.path.with_extension("csv.tmp");
        fs::write(&tmp, &bytes)?;
        fs::rename(&tmp, &self.path)?;

        tracing::info!(path = %self.path.display(), rows = rows.len(), "History store updated");
        Ok(rows.len())
    }

    pub fn row_count(&self) -> Result<usize, HistoryError> {
        Ok(self.load()?.len())
    }
}

fn parse_rows(bytes: &[u8]) -> Result<Vec<HistoryRow>, HistoryError> {
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(body);
    reader
        .deserialize::<HistoryRow>()
        .map(|row| row.map_err(HistoryError::from))
        .collect()
}

/// Serialize rows with header, prefixed by a UTF-8 BOM so spreadsheet tools
/// pick the right encoding.
pub fn rows_to_csv(rows: &[HistoryRow]) -> Result<Vec<u8>, HistoryError> {
    let mut writer = csv::Writer::from_writer(UTF8_BOM.to_vec());
    if rows.is_empty() {
        writer.write_record(HistoryRow::COLUMNS)?;
    }
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| HistoryError::Export(e.to_string()))
}

/// Download name for a single-analysis export.
pub fn csv_file_name(decision_number: &str) -> String {
    format!("phelipe_completo_{}.csv", decision_number.trim().replace('/', "-"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(decision: &str) -> HistoryRow {
        HistoryRow {
            analysis_date: "01/03/2025".into(),
            decision_number: decision.into(),
            recommendation: "Recomendação com vírgula, aspas \"e\" quebra\nde linha".into(),
            manager: "Ana".into(),
            treasury_damage: true,
            ..Default::default()
        }
    }

    #[test]
    fn absent_store_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("memoria/historico.csv"));
        assert!(!store.exists());
        assert!(store.load().unwrap().is_empty());
        assert_eq!(store.row_count().unwrap(), 0);
    }

    #[test]
    fn first_append_creates_directory_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("memoria/historico.csv"));
        assert_eq!(store.append(row("1/2025")).unwrap(), 1);
        assert!(store.exists());

        let bytes = fs::read(store.path()).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        assert!(!dir.path().join("memoria/historico.csv.tmp").exists());
    }

    #[test]
    fn append_preserves_existing_rows_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("historico.csv"));
        store.append(row("1/2025")).unwrap();
        store.append(row("2/2025")).unwrap();
        assert_eq!(store.append(row("3/2025")).unwrap(), 3);

        let rows = store.load().unwrap();
        let decisions: Vec<&str> = rows.iter().map(|r| r.decision_number.as_str()).collect();
        assert_eq!(decisions, vec!["1/2025", "2/2025", "3/2025"]);
        assert_eq!(rows[0], row("1/2025"));
    }

    #[test]
    fn older_rows_without_trailing_columns_load_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("historico.csv");
        let mut legacy = UTF8_BOM.to_vec();
        legacy.extend_from_slice(
            "data_analise,num_decisao,gestor,recomendacao,classificacao_final\n\
             10/10/2024,Acórdão 9/2024,Carlos,Treinar equipe,✅ Compatível\n"
                .as_bytes(),
        );
        fs::write(&path, legacy).unwrap();

        let store = HistoryStore::new(&path);
        let rows = store.load().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].decision_number, "Acórdão 9/2024");
        assert_eq!(rows[0].analysis_date, "10/10/2024");
        assert!(rows[0].memory_remarks.is_empty());
        assert!(!rows[0].treasury_damage);

        assert_eq!(store.append(row("1/2025")).unwrap(), 2);
        assert_eq!(store.load().unwrap()[0].manager, "Carlos");
    }

    #[test]
    fn legacy_capitalized_booleans_parse() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("historico.csv");
        fs::write(&path, "num_decisao,dano_erario\n1/2024,True\n2/2024,False\n3/2024,\n").unwrap();
        let rows = HistoryStore::new(&path).load().unwrap();
        let flags: Vec<bool> = rows.iter().map(|r| r.treasury_damage).collect();
        assert_eq!(flags, vec![true, false, false]);
    }

    #[test]
    fn corrupt_store_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("historico.csv");
        fs::write(&path, b"num_decisao\n\xFF\xFE\xFD\n").unwrap();

        let store = HistoryStore::new(&path);
        assert!(store.load().is_err());
        assert!(store.load_lenient().is_empty());
        assert!(store.append(row("1/2025")).is_err());
        assert_eq!(fs::read(&path).unwrap(), b"num_decisao\n\xFF\xFE\xFD\n");
    }

    #[test]
    fn export_has_bom_header_and_one_row() {
        let bytes = rows_to_csv(&[row("7/2025")]).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        let parsed = parse_rows(&bytes).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].decision_number, "7/2025");

        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        assert!(text.starts_with("data_analise,servidor_uniseci,num_decisao"));
    }

    #[test]
    fn export_name_replaces_slashes() {
        assert_eq!(
            csv_file_name("Acórdão 123/2025/TP"),
            "phelipe_completo_Acórdão 123-2025-TP.csv"
        );
    }
}
