//! Embedded schema migrations, applied in order on [`super::Store::open`].

pub const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS ocean_scores (
        id TEXT PRIMARY KEY,
        report_id TEXT NOT NULL,
        created_at TEXT NOT NULL,
        ocean_raw TEXT NOT NULL,
        ocean_normalized TEXT NOT NULL,
        p_factor REAL NOT NULL,
        last_utterance TEXT,
        last_utterance_retention REAL,
        last_utterance_confidence_score REAL,
        last_utterance_confidence_band TEXT,
        last_utterance_phase TEXT,
        last_utterance_at TEXT
    );
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_ocean_scores_report_id ON ocean_scores(report_id);
    CREATE INDEX IF NOT EXISTS idx_ocean_scores_created_at ON ocean_scores(created_at);
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS tasks (
        task_id TEXT PRIMARY KEY,
        report_id TEXT NOT NULL,
        task_name TEXT NOT NULL,
        importance REAL NOT NULL,
        required_time REAL NOT NULL,
        available_time REAL NOT NULL,
        created_at TEXT NOT NULL
    );
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_tasks_report_id ON tasks(report_id);
    "#,
];
