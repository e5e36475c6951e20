use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row, Transaction};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use url::Url;

use crate::error::{Error, Result};
use crate::models::analysis::AnalysisResult;
use crate::models::report::{
    Analysis, AnalysisReport, DashboardStats, Recommendation, Simulation, StoreTotals,
};

const ANALYSIS_COLUMNS: &str = "id, url, title, geo_score, created_at, gap_analysis";

/// SQLite-backed store. The connection sits behind a mutex so the store can be shared
/// across tasks; each method holds the lock only for its own statements.
pub struct Storage {
    conn: Mutex<Connection>,
}

impl Storage {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let storage = Self { conn: Mutex::new(conn) };
        storage.init_db()?;
        Ok(storage)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let storage = Self { conn: Mutex::new(conn) };
        storage.init_db()?;
        Ok(storage)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A panic mid-statement leaves no open transaction behind, so a poisoned lock is still usable
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn init_db(&self) -> Result<()> {
        self.conn().execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS analyses (
                id INTEGER PRIMARY KEY,
                url TEXT NOT NULL CHECK (length(url) > 0),
                title TEXT,
                geo_score INTEGER NOT NULL CHECK (geo_score BETWEEN 0 AND 100),
                created_at TEXT NOT NULL,
                gap_analysis TEXT NOT NULL DEFAULT ''
            );

            CREATE TABLE IF NOT EXISTS simulations (
                id INTEGER PRIMARY KEY,
                analysis_id INTEGER NOT NULL REFERENCES analyses(id) ON DELETE CASCADE,
                engine TEXT NOT NULL,
                query_used TEXT NOT NULL,
                simulation_text TEXT NOT NULL,
                visibility_score INTEGER NOT NULL CHECK (visibility_score BETWEEN 0 AND 100)
            );

            CREATE TABLE IF NOT EXISTS recommendations (
                id INTEGER PRIMARY KEY,
                analysis_id INTEGER NOT NULL REFERENCES analyses(id) ON DELETE CASCADE,
                text TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_analyses_created_at ON analyses(created_at);
            CREATE INDEX IF NOT EXISTS idx_simulations_analysis_id ON simulations(analysis_id);
            CREATE INDEX IF NOT EXISTS idx_recommendations_analysis_id ON recommendations(analysis_id);
            "#,
        )?;

        Ok(())
    }

    /// Store an analysis and all of its children atomically. Returns the new analysis id.
    pub fn save_analysis(&self, url: &str, title: &str, result: &AnalysisResult) -> Result<i64> {
        match Url::parse(url) {
            Ok(parsed) if parsed.has_host() => {}
            _ => return Err(Error::InvalidUrl(format!("'{}' is not an absolute URL", url))),
        }

        let mut conn = self.conn();
        let tx = conn.transaction()?;
        match insert_analysis(&tx, url, title, result) {
            Ok(analysis_id) => {
                tx.commit()?;
                tracing::debug!(
                    "Saved analysis {} with {} simulations and {} recommendations",
                    analysis_id,
                    result.simulations.len(),
                    result.recommendations.len()
                );
                Ok(analysis_id)
            }
            Err(e) => {
                tracing::warn!("Rolling back analysis for {}: {}", url, e);
                if let Err(rollback_err) = tx.rollback() {
                    tracing::error!("Rollback failed for {}: {}", url, rollback_err);
                }
                Err(e.into())
            }
        }
    }

    pub fn get_analysis(&self, analysis_id: i64) -> Result<Option<AnalysisReport>> {
        let conn = self.conn();
        let result = conn.query_row(
            &format!("SELECT {} FROM analyses WHERE id = ?1", ANALYSIS_COLUMNS),
            params![analysis_id],
            analysis_from_row,
        );

        match result {
            Ok(analysis) => Ok(Some(AnalysisReport {
                simulations: query_simulations(&conn, analysis.id)?,
                recommendations: query_recommendations(&conn, analysis.id)?,
                analysis,
            })),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn simulations_for(&self, analysis_id: i64) -> Result<Vec<Simulation>> {
        query_simulations(&self.conn(), analysis_id)
    }

    pub fn recommendations_for(&self, analysis_id: i64) -> Result<Vec<Recommendation>> {
        query_recommendations(&self.conn(), analysis_id)
    }

    /// Newest first.
    pub fn list_recent_analyses(&self, limit: usize) -> Result<Vec<Analysis>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM analyses ORDER BY created_at DESC, id DESC LIMIT ?1",
            ANALYSIS_COLUMNS
        ))?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let analyses = stmt.query_map(params![limit], analysis_from_row)?;
        analyses.collect::<std::result::Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn list_analyses(&self) -> Result<Vec<Analysis>> {
        self.list_recent_analyses(usize::MAX)
    }

    pub fn count_analyses(&self) -> Result<u64> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM analyses", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Mean GEO score across all analyses, 0.0 when there are none.
    pub fn average_score(&self) -> Result<f64> {
        let avg: Option<f64> = self
            .conn()
            .query_row("SELECT AVG(geo_score) FROM analyses", [], |row| row.get(0))?;
        Ok(avg.unwrap_or(0.0))
    }

    pub fn totals(&self) -> Result<StoreTotals> {
        self.conn()
            .query_row(
                r#"
                SELECT (SELECT COUNT(*) FROM analyses),
                       (SELECT COUNT(*) FROM simulations),
                       (SELECT COUNT(*) FROM recommendations)
                "#,
                [],
                |row| {
                    let analyses: i64 = row.get(0)?;
                    let simulations: i64 = row.get(1)?;
                    let recommendations: i64 = row.get(2)?;
                    Ok(StoreTotals {
                        analyses: analyses as u64,
                        simulations: simulations as u64,
                        recommendations: recommendations as u64,
                    })
                },
            )
            .map_err(Into::into)
    }

    pub fn dashboard_stats(&self, recent_limit: usize) -> Result<DashboardStats> {
        let totals = self.totals()?;
        Ok(DashboardStats {
            total_scans: totals.analyses,
            average_score: self.average_score()?,
            totals,
            recent: self.list_recent_analyses(recent_limit)?,
        })
    }

    /// Deletes an analysis; its simulations and recommendations go with it.
    pub fn delete_analysis(&self, analysis_id: i64) -> Result<bool> {
        let deleted = self
            .conn()
            .execute("DELETE FROM analyses WHERE id = ?1", params![analysis_id])?;
        Ok(deleted > 0)
    }
}

fn query_simulations(conn: &Connection, analysis_id: i64) -> Result<Vec<Simulation>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT id, analysis_id, engine, query_used, simulation_text, visibility_score
        FROM simulations
        WHERE analysis_id = ?1
        ORDER BY id
        "#,
    )?;

    let simulations = stmt.query_map(params![analysis_id], |row| {
        Ok(Simulation {
            id: row.get(0)?,
            analysis_id: row.get(1)?,
            engine: row.get(2)?,
            query: row.get(3)?,
            simulation_text: row.get(4)?,
            visibility_score: row.get(5)?,
        })
    })?;

    simulations.collect::<std::result::Result<Vec<_>, _>>().map_err(Into::into)
}

fn query_recommendations(conn: &Connection, analysis_id: i64) -> Result<Vec<Recommendation>> {
    let mut stmt = conn.prepare(
        "SELECT id, analysis_id, text FROM recommendations WHERE analysis_id = ?1 ORDER BY id",
    )?;

    let recommendations = stmt.query_map(params![analysis_id], |row| {
        Ok(Recommendation {
            id: row.get(0)?,
            analysis_id: row.get(1)?,
            text: row.get(2)?,
        })
    })?;

    recommendations.collect::<std::result::Result<Vec<_>, _>>().map_err(Into::into)
}

fn insert_analysis(
    tx: &Transaction,
    url: &str,
    title: &str,
    result: &AnalysisResult,
) -> rusqlite::Result<i64> {
    let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);

    tx.execute(
        r#"
        INSERT INTO analyses (url, title, geo_score, created_at, gap_analysis)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
        params![url, title, result.geo_score, created_at, result.gap_analysis],
    )?;
    let analysis_id = tx.last_insert_rowid();

    {
        let mut stmt = tx.prepare(
            r#"
            INSERT INTO simulations (analysis_id, engine, query_used, simulation_text, visibility_score)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )?;
        for sim in &result.simulations {
            stmt.execute(params![
                analysis_id,
                sim.engine,
                sim.query,
                sim.simulation_text,
                sim.visibility_score,
            ])?;
        }
    }

    {
        let mut stmt =
            tx.prepare("INSERT INTO recommendations (analysis_id, text) VALUES (?1, ?2)")?;
        for rec in &result.recommendations {
            stmt.execute(params![analysis_id, rec])?;
        }
    }

    Ok(analysis_id)
}

fn analysis_from_row(row: &Row) -> rusqlite::Result<Analysis> {
    let created_at_str: String = row.get(4)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;

    Ok(Analysis {
        id: row.get(0)?,
        url: row.get(1)?,
        title: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        geo_score: row.get(3)?,
        created_at,
        gap_analysis: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::analysis::SimulationEntry;

    fn result(geo_score: u8, sims: usize, recs: usize) -> AnalysisResult {
        AnalysisResult {
            geo_score,
            gap_analysis: "<ul><li>gap</li></ul>".to_string(),
            simulations: (0..sims)
                .map(|i| SimulationEntry {
                    engine: format!("Engine {}", i),
                    query: format!("query {}", i),
                    simulation_text: format!("answer {}", i),
                    visibility_score: (i * 10) as u8,
                })
                .collect(),
            recommendations: (0..recs).map(|i| format!("Recommendation {}", i)).collect(),
        }
    }

    #[test]
    fn test_save_creates_one_row_per_child() {
        let storage = Storage::in_memory().unwrap();
        let id = storage
            .save_analysis("https://acme.test", "Acme", &result(64, 3, 4))
            .unwrap();

        let report = storage.get_analysis(id).unwrap().unwrap();
        assert_eq!(report.analysis.url, "https://acme.test");
        assert_eq!(report.analysis.title, "Acme");
        assert_eq!(report.analysis.geo_score, 64);
        assert_eq!(report.analysis.gap_analysis, "<ul><li>gap</li></ul>");
        assert_eq!(report.simulations.len(), 3);
        assert_eq!(report.recommendations.len(), 4);
        assert!(report.simulations.iter().all(|s| s.analysis_id == id));
        assert!(report.recommendations.iter().all(|r| r.analysis_id == id));
        assert_eq!(report.simulations[2].visibility_score, 20);
        assert_eq!(report.recommendations[0].text, "Recommendation 0");

        assert_eq!(
            storage.totals().unwrap(),
            StoreTotals {
                analyses: 1,
                simulations: 3,
                recommendations: 4
            }
        );
    }

    #[test]
    fn test_failed_child_insert_rolls_back_everything() {
        let storage = Storage::in_memory().unwrap();
        let mut bad = result(50, 3, 2);
        bad.simulations[2].visibility_score = 150;

        let err = storage.save_analysis("https://acme.test", "Acme", &bad).unwrap_err();
        assert!(matches!(err, Error::Database(_)));
        assert_eq!(storage.totals().unwrap(), StoreTotals::default());

        // Connection is still usable afterwards
        storage.save_analysis("https://acme.test", "Acme", &result(50, 1, 1)).unwrap();
        assert_eq!(storage.count_analyses().unwrap(), 1);
    }

    #[test]
    fn test_failed_insert_reports_the_constraint_not_the_rollback() {
        let storage = Storage::in_memory().unwrap();
        let mut bad = result(50, 0, 0);
        bad.geo_score = 101;

        match storage.save_analysis("https://acme.test", "Acme", &bad) {
            Err(Error::Database(e)) => assert!(e.to_string().contains("CHECK"), "got {}", e),
            other => panic!("expected constraint failure, got {:?}", other),
        }
        assert_eq!(storage.count_analyses().unwrap(), 0);
    }

    #[test]
    fn test_storage_is_shared_across_threads() {
        let storage = Storage::in_memory().unwrap();

        let ids: Vec<i64> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    s.spawn(|| {
                        storage
                            .save_analysis("https://acme.test", "Acme", &result(40, 2, 1))
                            .unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let mut distinct = ids.clone();
        distinct.sort();
        distinct.dedup();
        assert_eq!(distinct.len(), 4);
        assert_eq!(
            storage.totals().unwrap(),
            StoreTotals {
                analyses: 4,
                simulations: 8,
                recommendations: 4
            }
        );
        for id in ids {
            let report = storage.get_analysis(id).unwrap().unwrap();
            assert_eq!(report.simulations.len(), 2);
        }
    }

    #[test]
    fn test_rejects_relative_url() {
        let storage = Storage::in_memory().unwrap();
        for url in ["", "acme.test", "/relative/path"] {
            let err = storage.save_analysis(url, "t", &result(10, 0, 0)).unwrap_err();
            assert!(matches!(err, Error::InvalidUrl(_)), "url {:?}", url);
        }
        assert_eq!(storage.count_analyses().unwrap(), 0);
    }

    #[test]
    fn test_missing_analysis_is_none() {
        let storage = Storage::in_memory().unwrap();
        assert!(storage.get_analysis(42).unwrap().is_none());
        assert!(storage.simulations_for(42).unwrap().is_empty());
    }

    #[test]
    fn test_aggregates_and_recent_ordering() {
        let storage = Storage::in_memory().unwrap();
        assert_eq!(storage.count_analyses().unwrap(), 0);
        assert_eq!(storage.average_score().unwrap(), 0.0);

        let first = storage.save_analysis("https://a.test", "A", &result(40, 0, 0)).unwrap();
        let second = storage.save_analysis("https://b.test", "B", &result(61, 0, 0)).unwrap();
        let third = storage.save_analysis("https://c.test", "C", &result(90, 0, 0)).unwrap();

        assert_eq!(storage.count_analyses().unwrap(), 3);
        assert!((storage.average_score().unwrap() - 191.0 / 3.0).abs() < 1e-9);

        let recent: Vec<i64> = storage
            .list_recent_analyses(2)
            .unwrap()
            .iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(recent, vec![third, second]);

        let all: Vec<i64> = storage.list_analyses().unwrap().iter().map(|a| a.id).collect();
        assert_eq!(all, vec![third, second, first]);

        let stats = storage.dashboard_stats(5).unwrap();
        assert_eq!(stats.total_scans, 3);
        assert_eq!(stats.recent.len(), 3);
    }

    #[test]
    fn test_same_url_twice_creates_two_records() {
        let storage = Storage::in_memory().unwrap();
        let a = storage.save_analysis("https://acme.test", "Acme", &result(10, 1, 1)).unwrap();
        let b = storage.save_analysis("https://acme.test", "Acme", &result(10, 1, 1)).unwrap();
        assert_ne!(a, b);
        assert_eq!(storage.count_analyses().unwrap(), 2);
    }

    #[test]
    fn test_delete_cascades_to_children() {
        let storage = Storage::in_memory().unwrap();
        let keep = storage.save_analysis("https://a.test", "A", &result(10, 2, 2)).unwrap();
        let gone = storage.save_analysis("https://b.test", "B", &result(20, 3, 1)).unwrap();

        assert!(storage.delete_analysis(gone).unwrap());
        assert!(!storage.delete_analysis(gone).unwrap());

        assert!(storage.get_analysis(gone).unwrap().is_none());
        assert_eq!(storage.simulations_for(keep).unwrap().len(), 2);
        assert_eq!(
            storage.totals().unwrap(),
            StoreTotals {
                analyses: 1,
                simulations: 2,
                recommendations: 2
            }
        );
    }

    #[test]
    fn test_children_require_existing_analysis() {
        let storage = Storage::in_memory().unwrap();
        let err = storage
            .conn()
            .execute("INSERT INTO recommendations (analysis_id, text) VALUES (999, 'orphan')", [])
            .unwrap_err();
        assert!(err.to_string().contains("FOREIGN KEY"));
    }

    #[test]
    fn test_reopening_database_file_keeps_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("geo.db");

        let id = {
            let storage = Storage::new(&path).unwrap();
            storage.save_analysis("https://acme.test", "Acme", &result(77, 3, 3)).unwrap()
        };

        let storage = Storage::new(&path).unwrap();
        let report = storage.get_analysis(id).unwrap().unwrap();
        assert_eq!(report.analysis.geo_score, 77);
        assert_eq!(report.simulations.len(), 3);
        assert_eq!(report.recommendations.len(), 3);
    }
}
